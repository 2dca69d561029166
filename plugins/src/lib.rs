pub mod command;
pub mod decisions;
pub mod factory;
pub mod gates;
pub mod git;
pub mod knowledge;
pub mod renderers;
pub mod retry;
pub mod services;
pub mod task_executor;
