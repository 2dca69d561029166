pub mod code;
#[allow(clippy::module_inception)]
pub mod error;
pub mod manifest;
pub mod merge;
pub mod run;
pub mod store;
pub mod track;

pub use code::ExitCode;
pub use error::CliError;
pub use manifest::{CycleError, ManifestError, ScheduleError};
pub use merge::MergeError;
pub use run::RunError;
pub use store::StoreError;
pub use track::TrackError;
