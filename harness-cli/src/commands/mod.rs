//! CLI command implementations.

pub mod info;
pub mod lookup;
pub mod resolve;
pub mod watch;
