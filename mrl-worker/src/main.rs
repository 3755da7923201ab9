use std::process::ExitCode;
use std::time::Duration;

use bytes::Bytes;
use clap::Parser;
use tracing::{error, info};

use common::rpc::default_socket_path;
use mrl_worker::{MRWorker, WorkerConfig};

mod args;
use args::Args;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let workload = match workload::try_named(&args.workload) {
        Some(workload) => workload,
        None => {
            error!(
                "The workload `{}` is not a known workload (expected one of {:?})",
                args.workload,
                workload::NAMES
            );
            return ExitCode::FAILURE;
        }
    };

    let config = WorkerConfig {
        work_dir: args.work_dir,
        backoff: Duration::from_millis(args.backoff_ms),
        aux: Bytes::from(args.aux.join(" ")),
    };
    let socket = args.socket.unwrap_or_else(default_socket_path);

    let result = match MRWorker::connect(&socket, workload, config).await {
        Ok(mut worker) => worker.run().await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            info!("Worker exited...");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Fatal error encountered {}", e);
            ExitCode::FAILURE
        }
    }
}
