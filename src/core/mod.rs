//! Orchestration: stage contracts, error taxonomy, and the run state machine.

pub mod error;
pub mod orchestrator;
pub mod stage;

pub use error::{StageError, TransportError, ValidationError};
pub use orchestrator::Orchestrator;
pub use stage::{OutboundMessage, PlannerStage, SearchStage, Stage, Transport, WriterInput, WriterStage};
