//! packetflow CLI library, split from the binary so subcommands are testable.

pub mod app;
pub mod commands;
pub mod logging;
