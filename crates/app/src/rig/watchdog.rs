use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
    thread,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use tracing::error;

pub(crate) const WATCHDOG_POLL_INTERVAL_MS: u64 = 500;
pub(crate) const WATCHDOG_STALE_THRESHOLD_MS: u64 = 1_500;
pub(crate) const WATCHDOG_STARTUP_GRACE_MS: u64 = 5_000;

/// Rig stages monitored for liveness. The stage consumer is not listed here:
/// its bounded pop timeout is its own liveness mechanism.
#[derive(Copy, Clone, Debug)]
pub(crate) enum HealthComponent {
    Capture,
    Preproc,
}

impl HealthComponent {
    pub(crate) fn label(self) -> &'static str {
        match self {
            HealthComponent::Capture => "capture",
            HealthComponent::Preproc => "preprocessing",
        }
    }
}

/// Last-heartbeat timestamps for each monitored stage.
pub(crate) struct RigHealth {
    capture: AtomicU64,
    preproc: AtomicU64,
    stale_threshold_ms: u64,
}

impl RigHealth {
    /// `stale_threshold_ms` should comfortably exceed the frame interval so a
    /// slow but healthy acquisition rate is not mistaken for a stall.
    pub(crate) fn new(stale_threshold_ms: u64) -> Self {
        let grace_deadline = current_millis().saturating_add(WATCHDOG_STARTUP_GRACE_MS);
        Self {
            capture: AtomicU64::new(grace_deadline),
            preproc: AtomicU64::new(grace_deadline),
            stale_threshold_ms,
        }
    }

    fn slot(&self, component: HealthComponent) -> &AtomicU64 {
        match component {
            HealthComponent::Capture => &self.capture,
            HealthComponent::Preproc => &self.preproc,
        }
    }

    pub(crate) fn beat(&self, component: HealthComponent) {
        self.slot(component).store(current_millis(), Ordering::Relaxed);
    }

    pub(crate) fn stale_component(&self, now: u64) -> Option<HealthComponent> {
        [HealthComponent::Capture, HealthComponent::Preproc]
            .into_iter()
            .find(|&component| {
                now.saturating_sub(self.slot(component).load(Ordering::Relaxed))
                    > self.stale_threshold_ms
            })
    }
}

pub(crate) struct WatchdogState {
    triggered: AtomicBool,
    reason: Mutex<Option<HealthComponent>>,
}

impl WatchdogState {
    pub(crate) fn new() -> Self {
        Self {
            triggered: AtomicBool::new(false),
            reason: Mutex::new(None),
        }
    }

    pub(crate) fn arm(&self, component: HealthComponent) {
        if let Ok(mut guard) = self.reason.lock() {
            *guard = Some(component);
        }
        self.triggered.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    pub(crate) fn reason(&self) -> Option<HealthComponent> {
        match self.reason.lock() {
            Ok(guard) => *guard,
            Err(_) => None,
        }
    }
}

pub(crate) fn spawn_watchdog(
    health: Arc<RigHealth>,
    running: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    state: Arc<WatchdogState>,
) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name("rig-watchdog".into())
        .spawn(move || {
            while running.load(Ordering::Relaxed) && !shutdown.load(Ordering::Relaxed) {
                thread::sleep(Duration::from_millis(WATCHDOG_POLL_INTERVAL_MS));
                let now = current_millis();
                if let Some(component) = health.stale_component(now) {
                    error!(
                        "Watchdog detected stalled {} stage; requesting rig restart",
                        component.label()
                    );
                    state.arm(component);
                    running.store(false, Ordering::SeqCst);
                    break;
                }
            }
        })
        .expect("failed to spawn watchdog thread")
}

fn current_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
