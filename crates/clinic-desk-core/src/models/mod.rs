//! Domain models for the clinic desk.

mod actor;
mod patient;
mod queue_state;
mod token;

pub use actor::*;
pub use patient::*;
pub use queue_state::*;
pub use token::*;
