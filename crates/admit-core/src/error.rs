//! Error types for the admission core

use crate::types::WizardState;

/// Failure to parse a user-supplied identifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Not a step number or name
    #[error("unknown step: '{0}'")]
    UnknownStep(String),

    /// Not a document kind
    #[error("unknown document kind: '{0}'")]
    UnknownDocument(String),

    /// Not an accepted qualification level
    #[error("unknown qualification: '{0}'")]
    UnknownQualification(String),
}

/// State machine errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// Transition not present in the transition table
    #[error("illegal transition: {from} -> {to}")]
    IllegalTransition {
        /// Current state
        from: WizardState,
        /// Requested state
        to: WizardState,
    },
}
