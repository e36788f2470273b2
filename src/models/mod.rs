//! Data Models
//!
//! Configuration, queue envelopes and API payloads.

pub mod queue;
pub mod response;
pub mod settings;

pub use queue::*;
pub use response::*;
pub use settings::*;
