use clap::Parser;
use packetflow_cli::commands::{self, cli};
use packetflow_cli::{app, logging};
use packetflow_core::api::CliError;

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            if let Some(next) = e.remediation() {
                eprintln!("  next: {next}");
            }
            e.exit_code().as_i32()
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, CliError> {
    let args = cli::Args::parse();
    let cfg = app::load_config(&args)?;
    logging::init(&cfg.logging).map_err(CliError::Config)?;

    match &args.command {
        cli::Commands::RunTrack(rt) => commands::run_track::handle(&args, rt, cfg).await,
        cli::Commands::RunAll(ra) => commands::run_all::handle(&args, ra, cfg).await,
        cli::Commands::Merge(m) => commands::merge::handle(&args, m, cfg).await,
        cli::Commands::Plan(p) => commands::plan::handle(&args, p),
        cli::Commands::Status(s) => commands::status::handle(&args, s, cfg),
    }
}
