//! Actuator boundary consumed by the streaming loop.

use thiserror::Error;

use crate::position::Position;

#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("actuator {name:?} is not open")]
    NotOpen { name: String },
    #[error("actuator fault: {0}")]
    Fault(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Motorized-stage boundary. Hardware drivers implement this; retry policy,
/// if any, belongs to the implementation, not to the streaming loop.
pub trait Actuator: Send {
    /// Identifier used in logs and errors.
    fn name(&self) -> &str;

    fn open(&mut self) -> Result<(), ActuatorError>;

    fn move_to(&mut self, target: Position) -> Result<(), ActuatorError>;

    fn get_position(&mut self) -> Result<Position, ActuatorError>;

    fn close(&mut self) -> Result<(), ActuatorError>;
}

/// Instantly settling in-memory stage for demos and tests.
#[derive(Default)]
pub struct MockStage {
    current: Option<Position>,
    is_open: bool,
    moves: u64,
}

impl MockStage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completed moves since construction.
    pub fn moves(&self) -> u64 {
        self.moves
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    fn require_open(&self) -> Result<(), ActuatorError> {
        if self.is_open {
            Ok(())
        } else {
            Err(ActuatorError::NotOpen {
                name: "mock-stage".to_string(),
            })
        }
    }
}

impl Actuator for MockStage {
    fn name(&self) -> &str {
        "mock-stage"
    }

    fn open(&mut self) -> Result<(), ActuatorError> {
        self.is_open = true;
        Ok(())
    }

    fn move_to(&mut self, target: Position) -> Result<(), ActuatorError> {
        self.require_open()?;
        self.current = Some(target);
        self.moves += 1;
        Ok(())
    }

    fn get_position(&mut self) -> Result<Position, ActuatorError> {
        self.require_open()?;
        Ok(self.current.unwrap_or(Position::at(0.0, 0.0, 0)))
    }

    fn close(&mut self) -> Result<(), ActuatorError> {
        self.is_open = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moves_require_an_open_stage() {
        let mut stage = MockStage::new();
        assert!(matches!(
            stage.move_to(Position::at(1.0, 2.0, 0)),
            Err(ActuatorError::NotOpen { .. })
        ));

        stage.open().unwrap();
        stage.move_to(Position::at(1.0, 2.0, 0)).unwrap();
        assert_eq!(stage.get_position().unwrap(), Position::at(1.0, 2.0, 0));
        assert_eq!(stage.moves(), 1);

        stage.close().unwrap();
        assert!(stage.get_position().is_err());
    }
}
