//! Intake Assist — inbox triage and auto-assignment for a legal team inbox.

pub mod archive;
pub mod channels;
pub mod config;
pub mod error;
pub mod extract;
pub mod grouping;
pub mod matching;
pub mod pipeline;
pub mod roster;
