use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Input files, one map task each.
    #[arg(required = true)]
    pub inputs: Vec<String>,

    /// Number of reduce tasks.
    #[arg(short, long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..))]
    pub n_reduce: u32,

    /// Seconds a task may stay claimed before it is reassigned.
    #[arg(short, long, default_value = "10", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// How often to look for timed out tasks, in milliseconds.
    #[arg(long, default_value = "1000", value_parser = clap::value_parser!(u64).range(1..))]
    pub sweep_interval_ms: u64,

    /// How often to check whether the job is done, in milliseconds.
    #[arg(long, default_value = "1000", value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval_ms: u64,

    /// Unix socket to listen on. Defaults to a per-user path in /var/tmp.
    #[arg(short, long, env = "MRL_SOCKET")]
    pub socket: Option<PathBuf>,
}
