//! Failure taxonomy for the walk session and tracker
//!
//! Every variant recovers at the state-machine boundary: a user-visible
//! message is set and the machine returns to its pre-call state. Nothing
//! here is fatal to the process.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalkError {
    /// Client-enforced deadline exceeded; the in-flight call was cancelled
    #[error("resolution deadline exceeded")]
    Timeout,

    /// Transport failure reaching the backend
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// The backend answered with a shape the client cannot use
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A resolved start point falls outside the service area
    #[error("start point outside the service area")]
    OutOfBounds,

    /// A state transition was refused (advisory only, e.g. too far from start)
    #[error("transition refused: {0}")]
    RefusedTransition(String),
}

impl WalkError {
    /// The message shown to the user. Timeout gets a distinct "took too
    /// long" wording so it is never confused with a transport failure.
    pub fn user_message(&self) -> String {
        match self {
            WalkError::Timeout => "That took too long — please try again.".to_string(),
            WalkError::NetworkFailure(_) | WalkError::MalformedResponse(_) => {
                "Couldn't plan that walk right now. Please try again.".to_string()
            }
            WalkError::OutOfBounds => {
                "That spot is outside the service area — pick a point in the city.".to_string()
            }
            WalkError::RefusedTransition(msg) => msg.clone(),
        }
    }
}

pub type WalkResult<T> = Result<T, WalkError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_is_distinct() {
        let timeout = WalkError::Timeout.user_message();
        let network = WalkError::NetworkFailure("refused".into()).user_message();
        assert!(timeout.contains("too long"));
        assert_ne!(timeout, network);
    }
}
