use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Name of the workload to run.
    #[arg(short, long)]
    pub workload: String,

    /// Directory holding the inputs, and where intermediate and output files go.
    #[arg(short = 'd', long, default_value = ".")]
    pub work_dir: PathBuf,

    /// Pause before asking again when no task is assignable, in milliseconds.
    #[arg(short, long, default_value = "2000")]
    pub backoff_ms: u64,

    /// Unix socket of the coordinator. Defaults to a per-user path in /var/tmp.
    #[arg(short, long, env = "MRL_SOCKET")]
    pub socket: Option<PathBuf>,

    /// Auxiliary arguments to pass to the MapReduce application.
    #[clap(value_parser, last = true)]
    pub aux: Vec<String>,
}
