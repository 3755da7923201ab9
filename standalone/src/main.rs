use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::anyhow;
use bytes::Bytes;
use clap::Parser;

use standalone::{expand_inputs, run_sequential};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Name of the workload
    #[arg(short, long)]
    workload: String,

    /// Output file
    #[arg(short, long, default_value = "mr-out-0")]
    output: PathBuf,

    /// Directory the input patterns are resolved against
    #[arg(short = 'd', long, default_value = ".")]
    work_dir: PathBuf,

    /// Glob patterns for the input files
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Auxiliary arguments to pass to the MapReduce application.
    #[clap(value_parser, last = true)]
    aux: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let workload = workload::try_named(&args.workload)
        .ok_or_else(|| anyhow!("The workload `{}` is not a known workload", args.workload))?;

    let inputs = expand_inputs(&args.work_dir, &args.inputs)?;
    let aux = Bytes::from(args.aux.join(" "));

    let mut out = BufWriter::new(File::create(&args.output)?);
    let keys = run_sequential(&args.work_dir, &inputs, &workload, &aux, &mut out)?;

    println!("wrote {} keys to {}", keys, args.output.display());
    Ok(())
}
