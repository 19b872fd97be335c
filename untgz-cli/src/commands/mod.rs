//! Command implementations for the untgz CLI.

pub mod detect;
pub mod extract;

pub use detect::cmd_detect;
pub use extract::cmd_extract;
