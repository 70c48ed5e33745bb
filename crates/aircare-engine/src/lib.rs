pub mod abuse;
pub mod answer;
pub mod buffer;
pub mod classify;
pub mod engine;
pub mod sop;
pub mod sop_walk;

pub use engine::{Engine, HandleResult, NextAction};
pub use sop::SopCatalog;
