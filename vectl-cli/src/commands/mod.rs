//! Command implementations for the vectl CLI

pub mod compose;
pub mod health;

pub use compose::run_compose;
pub use health::run_health;
