// src/main.rs

use buildweave::graph::ExecutionResult;
use buildweave::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(ExecutionResult::Success) => {}
        Ok(ExecutionResult::Failure(failure)) => {
            eprintln!("buildweave: {failure}");
            std::process::exit(1);
        }
        Err(err) => {
            eprintln!("buildweave error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<ExecutionResult> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
