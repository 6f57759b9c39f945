//! Session phases.
//!
//! ```text
//! CredentialEntry -> SettingsSetup -> Playing -> Ended
//!        ^                 ^                        |
//!        +-----------------+                        |
//!                          +-------- reset ---------+
//! ```
//!
//! No transition skips a phase. The only ways back are [`PhaseController::reset`]
//! and, before a story starts, [`PhaseController::require_credential`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which screen of the game is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    CredentialEntry,
    SettingsSetup,
    Playing,
    Ended,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::CredentialEntry => "credential entry",
            Phase::SettingsSetup => "character setup",
            Phase::Playing => "playing",
            Phase::Ended => "ended",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PhaseError {
    #[error("cannot {action} while in {from}")]
    InvalidTransition { from: Phase, action: &'static str },
}

/// Linear state machine over [`Phase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseController {
    phase: Phase,
}

impl PhaseController {
    /// Start at setup when a credential is already known, otherwise at
    /// credential entry.
    pub fn new(has_credential: bool) -> Self {
        let phase = if has_credential {
            Phase::SettingsSetup
        } else {
            Phase::CredentialEntry
        };
        Self { phase }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// CredentialEntry -> SettingsSetup.
    pub fn submit_credential(&mut self) -> Result<Phase, PhaseError> {
        self.transition(Phase::CredentialEntry, Phase::SettingsSetup, "submit a credential")
    }

    /// SettingsSetup -> Playing.
    pub fn complete_setup(&mut self) -> Result<Phase, PhaseError> {
        self.transition(Phase::SettingsSetup, Phase::Playing, "complete setup")
    }

    /// Playing -> Ended.
    pub fn end(&mut self) -> Result<Phase, PhaseError> {
        self.transition(Phase::Playing, Phase::Ended, "end the story")
    }

    /// Back to SettingsSetup. From Playing this passes through Ended.
    pub fn reset(&mut self) -> Result<Phase, PhaseError> {
        if self.phase == Phase::Playing {
            self.end()?;
        }
        self.transition(Phase::Ended, Phase::SettingsSetup, "reset")
    }

    /// SettingsSetup -> CredentialEntry, to replace a rejected key before a
    /// story starts.
    pub fn require_credential(&mut self) -> Result<Phase, PhaseError> {
        self.transition(Phase::SettingsSetup, Phase::CredentialEntry, "change the credential")
    }

    fn transition(&mut self, from: Phase, to: Phase, action: &'static str) -> Result<Phase, PhaseError> {
        if self.phase != from {
            return Err(PhaseError::InvalidTransition {
                from: self.phase,
                action,
            });
        }
        tracing::info!(%from, %to, "phase change");
        self.phase = to;
        Ok(to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_phase() {
        assert_eq!(PhaseController::new(false).phase(), Phase::CredentialEntry);
        assert_eq!(PhaseController::new(true).phase(), Phase::SettingsSetup);
    }

    #[test]
    fn test_full_cycle() {
        let mut phases = PhaseController::new(false);
        assert_eq!(phases.submit_credential(), Ok(Phase::SettingsSetup));
        assert_eq!(phases.complete_setup(), Ok(Phase::Playing));
        assert_eq!(phases.end(), Ok(Phase::Ended));
        assert_eq!(phases.reset(), Ok(Phase::SettingsSetup));
    }

    #[test]
    fn test_no_skipping() {
        let mut phases = PhaseController::new(false);
        assert!(phases.complete_setup().is_err());
        assert!(phases.end().is_err());
        assert_eq!(phases.phase(), Phase::CredentialEntry);

        let mut phases = PhaseController::new(true);
        assert!(phases.submit_credential().is_err());
        assert!(phases.end().is_err());
    }

    #[test]
    fn test_reset_from_playing() {
        let mut phases = PhaseController::new(true);
        phases.complete_setup().unwrap();
        assert_eq!(phases.reset(), Ok(Phase::SettingsSetup));
    }

    #[test]
    fn test_reset_only_from_playing_or_ended() {
        let mut phases = PhaseController::new(true);
        assert_eq!(
            phases.reset(),
            Err(PhaseError::InvalidTransition {
                from: Phase::SettingsSetup,
                action: "reset"
            })
        );
    }

    #[test]
    fn test_require_credential() {
        let mut phases = PhaseController::new(true);
        assert_eq!(phases.require_credential(), Ok(Phase::CredentialEntry));

        let mut phases = PhaseController::new(true);
        phases.complete_setup().unwrap();
        assert!(phases.require_credential().is_err());
        phases.end().unwrap();
        assert!(phases.require_credential().is_err());
    }
}
