use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::{glob, Pattern};
use tracing::{debug, info, warn};

use common::codec::read_records;
use common::files::{intermediate_glob, output_file_name, parse_intermediate_name};
use common::reduce::reduce_sorted;
use common::rpc::ReduceAssignment;
use common::Workload;

use crate::core::WorkerConfig;

/// Every intermediate file in `work_dir` written by any map task for
/// `bucket`, in name order.
pub fn intermediate_files(work_dir: &Path, bucket: u32) -> Result<Vec<PathBuf>> {
    let dir = Pattern::escape(&work_dir.to_string_lossy());
    let pattern = format!("{}/{}", dir, intermediate_glob(bucket));

    let mut files = Vec::new();
    for entry in glob(&pattern)? {
        let path = entry?;
        let for_bucket = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(parse_intermediate_name)
            .is_some_and(|(_, b)| b == bucket);

        if for_bucket && path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    Ok(files)
}

/// Run one reduce task: gather this partition's intermediate records, sort
/// them by key and write one output line per distinct key.
///
/// No intermediate files at all is not an error; the output file is simply
/// empty. Returns the output path.
pub fn perform_reduce(
    task: &ReduceAssignment,
    workload: &Workload,
    config: &WorkerConfig,
) -> Result<PathBuf> {
    let inputs = intermediate_files(&config.work_dir, task.partition)?;
    debug!("reduce find intermediate files {:?}", inputs);

    if inputs.is_empty() {
        warn!(
            "can't find any intermediate files for partition {}, reduce output is empty",
            task.partition
        );
    }

    let mut pairs = Vec::new();
    for path in &inputs {
        let file = File::open(path)?;
        let records = read_records(BufReader::new(file))
            .with_context(|| format!("can't decode intermediate file {}", path.display()))?;
        pairs.extend(records);
    }

    let output_path = config.work_dir.join(output_file_name(task.partition));
    let output = File::create(&output_path)
        .with_context(|| format!("can't create output file {}", output_path.display()))?;
    let keys = reduce_sorted(pairs, workload, &config.aux, &mut BufWriter::new(output))?;

    info!(
        "reduce task {} wrote {} keys from {} files",
        task.id,
        keys,
        inputs.len()
    );

    Ok(output_path)
}
