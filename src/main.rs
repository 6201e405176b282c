// src/main.rs

use devloop::errors::DevloopError;
use devloop::{cli, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        report_fatal(&err);
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await?;
    Ok(())
}

/// Log the error once, with the stack of the place that raised it when one
/// was recorded.
fn report_fatal(err: &anyhow::Error) {
    let trace = err
        .downcast_ref::<DevloopError>()
        .and_then(DevloopError::backtrace);

    match trace {
        Some(trace) => tracing::error!("devloop terminated: {err:#}\n{trace}"),
        None => tracing::error!("devloop terminated: {err:?}"),
    }
}
