//! Platform adapters. One concrete client today; everything upstream of
//! the collaborator traits stays platform-agnostic.

pub mod missive;

pub use missive::MissiveClient;
