use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Jsonl,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Jsonl => "jsonl",
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDependencyTimeout {
    /// Keep waiting, up to `scheduler.max_wait_extensions` more windows.
    Wait,
    Abort,
}

#[derive(Parser, Debug)]
#[command(name = "packetflow", version, about = "Run work packets in dependency order and merge them round by round")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    /// What to do when dependencies are still missing after the wait window.
    #[arg(long, value_enum, default_value_t = OnDependencyTimeout::Abort, global = true)]
    pub on_dependency_timeout: OnDependencyTimeout,

    /// Overrides `scheduler.max_parallel`.
    #[arg(long, global = true)]
    pub max_parallel: Option<usize>,

    /// Config file to use instead of the default lookup.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Show a progress bar on stderr during run-all.
    #[arg(long, global = true)]
    pub progress: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunTrackArgs {
    /// Packet file of the track to run.
    pub packet: PathBuf,

    /// Directory holding manifest.json; searched upwards from the packet when omitted.
    #[arg(long)]
    pub manifest_dir: Option<PathBuf>,

    /// Continue from an existing checkpoint.
    #[arg(long)]
    pub resume: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ManifestDirArgs {
    pub manifest_dir: PathBuf,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct MergeArgs {
    pub manifest_dir: PathBuf,

    /// Resume a merge suspended on a conflict or a failed gate.
    #[arg(long = "continue")]
    pub continue_merge: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute one track's packet in its worktree.
    RunTrack(RunTrackArgs),
    /// Execute every pending track, round by round.
    RunAll(ManifestDirArgs),
    /// Integrate completed tracks into the base worktree with gates between rounds.
    Merge(MergeArgs),
    /// Print the rounds without running anything.
    Plan(ManifestDirArgs),
    /// Report per-track progress and merge state.
    Status(ManifestDirArgs),
}
