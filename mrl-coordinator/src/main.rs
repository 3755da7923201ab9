mod args;

use std::time::Duration;

use args::Args;
use clap::Parser;
use tracing::{error, info};

use common::rpc::default_socket_path;
use mrl_coordinator::monitor::{spawn_timeout_sweep, wait_for_completion};
use mrl_coordinator::{CoordinatorConfig, CoordinatorSocket, MRCoordinator};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Retrieve server configuration from command line.
    // Note: There are default values for every argument except the inputs.
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let config = CoordinatorConfig {
        n_reduce: args.n_reduce,
        task_timeout: Duration::from_secs(args.timeout),
        sweep_interval: Duration::from_millis(args.sweep_interval_ms),
    };
    let socket_path = args.socket.unwrap_or_else(default_socket_path);

    let coordinator = MRCoordinator::new(&args.inputs, config.n_reduce);
    let socket = CoordinatorSocket::bind(&socket_path)?;

    let mut sweep = spawn_timeout_sweep(
        coordinator.registry(),
        config.task_timeout,
        config.sweep_interval,
    );
    let mut server = tokio::spawn(socket.serve(coordinator.clone()));

    let poll_interval = Duration::from_millis(args.poll_interval_ms);
    let outcome = wait_for_completion(&coordinator, &mut sweep, &mut server, poll_interval).await;
    if let Err(e) = outcome {
        error!("{e:#}");
        sweep.abort();
        server.abort();
        return Err(e.into());
    }

    info!("all tasks finished, shutting down");

    // Give workers a moment to hear that there is no more work.
    tokio::time::sleep(poll_interval).await;

    sweep.abort();
    server.abort();
    let _ = server.await;

    Ok(())
}
