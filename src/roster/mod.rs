//! Client roster — CSV loading, record model, lookup index.

pub mod index;
pub mod loader;
pub mod model;

pub use index::RosterIndex;
pub use loader::load_roster;
pub use model::{ClientRecord, RosterRow};
