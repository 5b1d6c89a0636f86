//! Dispatcher lifecycle states and the transitions allowed between them.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Created,
    ConfigResolved,
    TopologyLoaded,
    BindAddressResolved,
    TransportReady,
    ScopeResolved,
    DryRunReported,
    Executing,
    Succeeded,
    Failed,
}

#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Invalid transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: DispatchState,
        to: DispatchState,
    },
    #[error("Cannot transition from terminal state {state:?}")]
    FromTerminalState { state: DispatchState },
}

pub struct StateTransition;

impl StateTransition {
    pub fn validate(from: DispatchState, to: DispatchState) -> Result<(), TransitionError> {
        use DispatchState::*;

        if Self::is_terminal(from) {
            return Err(TransitionError::FromTerminalState { state: from });
        }

        let is_valid = match (from, to) {
            (Created, ConfigResolved) => true,
            (ConfigResolved, TopologyLoaded) => true,

            // Bind address only for transfers; transport skipped on dry runs.
            (TopologyLoaded, BindAddressResolved) => true,
            (TopologyLoaded, TransportReady) => true,
            (TopologyLoaded, ScopeResolved) => true,
            (BindAddressResolved, TransportReady) => true,
            (BindAddressResolved, ScopeResolved) => true,

            (TransportReady, ScopeResolved) => true,
            (ScopeResolved, DryRunReported) => true,
            (ScopeResolved, Executing) => true,
            (DryRunReported, Succeeded) => true,
            (Executing, Succeeded) => true,

            (_, Failed) => true,
            _ => false,
        };

        if is_valid {
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition { from, to })
        }
    }

    pub fn is_terminal(state: DispatchState) -> bool {
        matches!(state, DispatchState::Succeeded | DispatchState::Failed)
    }

    pub fn describe(state: DispatchState) -> &'static str {
        match state {
            DispatchState::Created => "created",
            DispatchState::ConfigResolved => "transport config resolved",
            DispatchState::TopologyLoaded => "topology loaded",
            DispatchState::BindAddressResolved => "bind address resolved",
            DispatchState::TransportReady => "transport ready",
            DispatchState::ScopeResolved => "scope resolved",
            DispatchState::DryRunReported => "dry run reported",
            DispatchState::Executing => "executing",
            DispatchState::Succeeded => "succeeded",
            DispatchState::Failed => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DispatchState::*;

    #[test]
    fn test_valid_transitions() {
        assert!(StateTransition::validate(Created, ConfigResolved).is_ok());
        assert!(StateTransition::validate(TopologyLoaded, BindAddressResolved).is_ok());
        assert!(StateTransition::validate(TopologyLoaded, ScopeResolved).is_ok());
        assert!(StateTransition::validate(ScopeResolved, Executing).is_ok());
        assert!(StateTransition::validate(Executing, Succeeded).is_ok());
    }

    #[test]
    fn test_any_live_state_can_fail() {
        for state in [Created, ConfigResolved, TopologyLoaded, TransportReady, Executing] {
            assert!(StateTransition::validate(state, Failed).is_ok());
        }
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(StateTransition::validate(Created, TopologyLoaded).is_err());
        assert!(StateTransition::validate(ScopeResolved, Succeeded).is_err());
        assert!(StateTransition::validate(TransportReady, BindAddressResolved).is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(StateTransition::validate(Succeeded, Failed).is_err());
        assert!(StateTransition::validate(Failed, Created).is_err());
        assert!(StateTransition::is_terminal(Failed));
        assert!(!StateTransition::is_terminal(Executing));
    }
}
