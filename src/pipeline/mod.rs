//! Assignment pipeline — shared types, orchestrator, poll loop.

pub mod orchestrator;
pub mod poller;
pub mod types;

pub use orchestrator::AssignmentOrchestrator;
pub use types::{
    AssignmentCommand, AssignmentSink, BatchOutcome, Conversation, ExtractedName, MessageSource,
    RawMessage, ReviewItem,
};
