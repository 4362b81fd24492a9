//! State machine trait for lifecycle enums.
//!
//! Provides a consistent interface for validating and performing state
//! transitions for connection lifecycles (server-side stream sessions and
//! client-side stream consumers).

use super::ValidationError;

/// Trait for status enums that represent state machines.
///
/// Implementors define valid state transitions and get validated
/// transition methods for free.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for StreamState {
///     fn can_transition_to(&self, target: &Self) -> bool {
///         matches!((self, target), (Opening, Streaming) | (Streaming, Closed(_)))
///     }
///
///     fn is_terminal(&self) -> bool {
///         matches!(self, Closed(_))
///     }
/// }
///
/// let next = state.transition_to(StreamState::Streaming)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns true if no transition leaves this state.
    fn is_terminal(&self) -> bool;

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }
}
