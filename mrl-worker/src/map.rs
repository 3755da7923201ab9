use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use bytes::Bytes;
use tracing::info;

use common::codec::write_records;
use common::files::intermediate_file_name;
use common::rpc::MapAssignment;
use common::{KeyValue, Partitioner, Workload};

use crate::core::WorkerConfig;

/// Run one map task: read the input, call the workload's map function and
/// write one intermediate file per non-empty bucket.
///
/// Records keep the order the map function produced them in. Returns the
/// paths written.
pub fn perform_map(
    task: &MapAssignment,
    workload: &Workload,
    config: &WorkerConfig,
) -> Result<Vec<PathBuf>> {
    let partitioner = Partitioner::new(task.split_count)?;

    let input_path = config.work_dir.join(&task.input);
    let content = fs::read(&input_path)
        .with_context(|| format!("can't read input {}", input_path.display()))?;

    info!("Starting map task {} over `{}`", task.id, task.input);

    let input = KeyValue::new(Bytes::from(task.input.clone()), Bytes::from(content));
    let pairs = (workload.map_fn)(input, config.aux.clone())?;

    let mut buckets: Vec<Vec<KeyValue>> = vec![Vec::new(); partitioner.split_count() as usize];
    for pair in pairs {
        let pair = pair?;
        buckets[partitioner.bucket(&pair.key) as usize].push(pair);
    }

    let mut written = Vec::new();
    for (bucket, records) in buckets.iter().enumerate() {
        if records.is_empty() {
            continue;
        }

        let path = config
            .work_dir
            .join(intermediate_file_name(&task.id, bucket as u32));
        let file = File::create(&path)
            .with_context(|| format!("can't create intermediate file {}", path.display()))?;
        write_records(&mut BufWriter::new(file), records)?;

        written.push(path);
    }

    Ok(written)
}
