use brrtkit::telemetry::{init_logging, LogConfig};

fn main() -> anyhow::Result<()> {
    // Keep the guard alive so async log lines are flushed on exit.
    let _guard = init_logging(&LogConfig::from_env())?;
    brrtkit::cli::run_cli()
}
