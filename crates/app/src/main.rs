mod cli;
mod rig;

use clap::Parser;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    match args.command {
        cli::Command::Run(run_args) => {
            let config = run_args.into_config()?;
            rig::run(config)
        }
    }
}
