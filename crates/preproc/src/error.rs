use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreprocError {
    /// Parameter outside its declared bounds. Raised before any frame is
    /// processed; values are never clamped into range.
    #[error("invalid {name} = {value}: must be {range}")]
    Config {
        name: &'static str,
        value: String,
        range: &'static str,
    },
    #[error("unknown background method {0:?} (expected off, running-average, knn or mog2)")]
    UnknownMethod(String),
    #[error("image operation failed")]
    Op(#[from] opencv::Error),
}
