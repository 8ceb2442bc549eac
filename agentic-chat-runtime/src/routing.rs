//! Routing policy evaluated after the responder node.

use crate::types::ConversationState;

/// Next move after the responder has appended its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Run the tool-runner node, then loop back to the responder.
    Continue,
    /// End the run.
    Terminate,
}

/// Decides where the graph goes after the responder.
///
/// Implementations must be pure functions of the state.
pub trait RoutingPolicy: Send + Sync {
    fn decide(&self, state: &ConversationState) -> Route;
}

/// Policy for agents without tool-call detection. Always terminates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoToolsPolicy;

impl RoutingPolicy for NoToolsPolicy {
    fn decide(&self, _state: &ConversationState) -> Route {
        Route::Terminate
    }
}

impl<F> RoutingPolicy for F
where
    F: Fn(&ConversationState) -> Route + Send + Sync,
{
    fn decide(&self, state: &ConversationState) -> Route {
        self(state)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::types::Message;

    #[test]
    fn test_no_tools_policy_terminates() {
        let empty = ConversationState::default();
        let answered = ConversationState::new(vec![
            Message::user("hi"),
            Message::assistant("hello"),
        ]);
        assert_eq!(NoToolsPolicy.decide(&empty), Route::Terminate);
        assert_eq!(NoToolsPolicy.decide(&answered), Route::Terminate);
    }

    #[test]
    fn test_closure_policy() {
        let policy = |state: &ConversationState| {
            if state.len() < 3 {
                Route::Continue
            } else {
                Route::Terminate
            }
        };
        assert_eq!(policy.decide(&ConversationState::default()), Route::Continue);
        let long = ConversationState::new(vec![Message::user("a"); 3]);
        assert_eq!(policy.decide(&long), Route::Terminate);
    }
}
