pub mod cli;
pub mod merge;
pub mod plan;
pub mod run_all;
pub mod run_track;
pub mod status;
