//! Step Sequencer
//!
//! Tracks which wizard step is visible and the furthest step the user has
//! reached. Moving back never lowers the furthest position, so the stepper
//! can keep already-visited steps clickable.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WizardError};

/// The wizard's steps, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WizardStep {
    OrderInformation,
    ParticipantInformation,
    Review,
}

impl WizardStep {
    pub const ALL: [WizardStep; 3] = [
        WizardStep::OrderInformation,
        WizardStep::ParticipantInformation,
        WizardStep::Review,
    ];

    pub fn from_position(position: usize) -> Option<Self> {
        Self::ALL.get(position).copied()
    }

    pub fn position(self) -> usize {
        match self {
            Self::OrderInformation => 0,
            Self::ParticipantInformation => 1,
            Self::Review => 2,
        }
    }

    /// Stepper label
    pub fn label(self) -> &'static str {
        match self {
            Self::OrderInformation => "Order Information",
            Self::ParticipantInformation => "Participant Information",
            Self::Review => "Review & Submit",
        }
    }

    pub fn is_last(self) -> bool {
        self.position() + 1 == Self::ALL.len()
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OrderInformation => write!(f, "order-information"),
            Self::ParticipantInformation => write!(f, "participant-information"),
            Self::Review => write!(f, "review"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSequencer {
    current_position: usize,
    max_position: usize,
}

impl StepSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_position(&self) -> usize {
        self.current_position
    }

    /// Furthest step reached; never decreases
    pub fn max_position(&self) -> usize {
        self.max_position
    }

    pub fn current_step(&self) -> WizardStep {
        WizardStep::from_position(self.current_position).unwrap_or(WizardStep::Review)
    }

    /// Move forward one step. Returns the new position.
    ///
    /// Already on the last step the position stays put.
    pub fn advance(&mut self) -> usize {
        if !self.current_step().is_last() {
            self.current_position += 1;
        }
        self.max_position = self.max_position.max(self.current_position);
        self.current_position
    }

    /// Move back one step, stopping at the first. `max_position` is untouched.
    pub fn retreat(&mut self) -> usize {
        self.current_position = self.current_position.saturating_sub(1);
        self.current_position
    }

    /// Jump to an already-reached step (stepper click).
    pub fn go_to(&mut self, position: usize) -> Result<WizardStep> {
        if position > self.max_position {
            return Err(WizardError::InvalidStep {
                requested: position,
                max: self.max_position,
            });
        }
        self.current_position = position;
        Ok(self.current_step())
    }

    pub fn is_reached(&self, step: WizardStep) -> bool {
        step.position() <= self.max_position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_tracks_furthest_step() {
        let mut seq = StepSequencer::new();
        assert_eq!(seq.advance(), 1);
        assert_eq!(seq.max_position(), 1);
        assert_eq!(seq.current_step(), WizardStep::ParticipantInformation);
    }

    #[test]
    fn test_retreat_keeps_max_position() {
        let mut seq = StepSequencer::new();
        seq.advance();
        seq.advance();
        assert_eq!(seq.retreat(), 1);
        assert_eq!(seq.retreat(), 0);
        assert_eq!(seq.retreat(), 0);
        assert_eq!(seq.max_position(), 2);
        assert!(seq.is_reached(WizardStep::Review));
    }

    #[test]
    fn test_advance_stops_at_last_step() {
        let mut seq = StepSequencer::new();
        for _ in 0..5 {
            seq.advance();
        }
        assert_eq!(seq.current_step(), WizardStep::Review);
        assert_eq!(seq.current_position(), 2);
        assert_eq!(seq.max_position(), 2);
    }

    #[test]
    fn test_go_to_only_reached_steps() {
        let mut seq = StepSequencer::new();
        seq.advance();
        seq.retreat();

        assert_eq!(seq.go_to(1).unwrap(), WizardStep::ParticipantInformation);
        assert!(matches!(
            seq.go_to(2),
            Err(WizardError::InvalidStep { requested: 2, max: 1 })
        ));
    }

    #[test]
    fn test_current_never_exceeds_max() {
        let mut seq = StepSequencer::new();
        for op in [true, true, false, true, false, false, true] {
            if op {
                seq.advance();
            } else {
                seq.retreat();
            }
            assert!(seq.current_position() <= seq.max_position());
        }
    }
}
