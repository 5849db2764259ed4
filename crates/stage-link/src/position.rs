use chrono::Utc;

/// Target coordinate handed from acquisition to actuation.
///
/// Passed by value through the stream channel: the producer relinquishes
/// ownership on push, the consumer owns the value on pop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub timestamp_ms: i64,
}

impl Position {
    /// Position stamped with the current wall-clock time.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            timestamp_ms: Utc::now().timestamp_millis(),
        }
    }

    pub fn at(x: f64, y: f64, timestamp_ms: i64) -> Self {
        Self { x, y, timestamp_ms }
    }
}
