//! Error Types
//!
//! The engine's error taxonomy. Validation errors reject input before it
//! touches state; text-generation and capacity errors are recovered inside
//! the decision pipeline; invariant errors are fatal to the run.

use thiserror::Error;

/// Malformed configuration or injected input.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid {field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failure of the external text-generation capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextGenError {
    #[error("text generation timed out")]
    Timeout,
    #[error("text generation rate limited")]
    RateLimited,
    #[error("malformed text generation output: {0}")]
    MalformedOutput(String),
}

/// An agent's workload would exceed its capacity.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("agent {agent_id} at workload {workload:.3} cannot absorb load {load:.3}")]
pub struct CapacityError {
    pub agent_id: String,
    pub workload: f32,
    pub load: f32,
}

/// An internal modeling invariant would be violated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateInvariantError {
    #[error("{owner}: {field} = {value} outside [{min}, {max}]")]
    OutOfBounds {
        owner: String,
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    #[error("task {task_id}: illegal transition from {from} on {event}")]
    IllegalTransition {
        task_id: String,
        from: String,
        event: String,
    },
    #[error("task {task_id} still {status} at end of day {day}")]
    NonTerminalTask {
        task_id: String,
        status: String,
        day: u64,
    },
    #[error("unknown agent {0}")]
    UnknownAgent(String),
}

/// Failure writing a snapshot to its sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced by the run-control surface.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("state invariant violated: {0}")]
    StateInvariant(#[from] StateInvariantError),
    #[error("snapshot sink failed: {0}")]
    Sink(#[from] SinkError),
    #[error("simulation is not running")]
    NotRunning,
    #[error("simulation halted after an unrecoverable error")]
    Halted,
}
