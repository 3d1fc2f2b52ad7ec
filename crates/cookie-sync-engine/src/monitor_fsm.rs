//! Synchronization monitor state machine using rust-fsm.
//!
//! ```text
//! ┌────────┐  Start   ┌────────────┐
//! │  Idle  │ ───────► │ Monitoring │
//! │        │ ◄─────── │            │
//! └────────┘   Stop   └────────────┘
//! ```
//!
//! Repeated `Start` / `Stop` inputs are rejected by the machine; the monitor
//! treats a rejection as a no-op.

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub monitor_machine(Idle)

    Idle => {
        Start => Monitoring
    },
    Monitoring => {
        Stop => Idle
    }
}

pub use monitor_machine::Input as MonitorMachineInput;
pub use monitor_machine::State as MonitorMachineState;
pub use monitor_machine::StateMachine as MonitorMachine;

/// Externally visible monitor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    Idle,
    Monitoring,
}

impl From<&MonitorMachineState> for MonitorState {
    fn from(state: &MonitorMachineState) -> Self {
        match state {
            MonitorMachineState::Idle => MonitorState::Idle,
            MonitorMachineState::Monitoring => MonitorState::Monitoring,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_stop_cycle() {
        let mut machine = MonitorMachine::new();
        assert_eq!(MonitorState::from(machine.state()), MonitorState::Idle);

        machine.consume(&MonitorMachineInput::Start).unwrap();
        assert_eq!(MonitorState::from(machine.state()), MonitorState::Monitoring);

        machine.consume(&MonitorMachineInput::Stop).unwrap();
        assert_eq!(MonitorState::from(machine.state()), MonitorState::Idle);
    }

    #[test]
    fn test_repeated_inputs_are_rejected() {
        let mut machine = MonitorMachine::new();
        assert!(machine.consume(&MonitorMachineInput::Stop).is_err());

        machine.consume(&MonitorMachineInput::Start).unwrap();
        assert!(machine.consume(&MonitorMachineInput::Start).is_err());
        assert_eq!(MonitorState::from(machine.state()), MonitorState::Monitoring);
    }

    #[test]
    fn test_state_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&MonitorState::Monitoring).unwrap(),
            "\"monitoring\""
        );
    }
}
