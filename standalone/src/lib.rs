//! Sequential MapReduce, for checking what the distributed system produces.
//!
//! Every input is mapped in this process, all pairs are sorted together and
//! each key is reduced once, exactly like a single reduce partition would.
//! Inputs are named the way the coordinator names them: relative to the
//! working directory the workers resolve them against.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use glob::Pattern;

use common::reduce::reduce_sorted;
use common::{KeyValue, Workload};

/// Expand glob patterns under `work_dir` into input names, keeping the order
/// of the patterns.
///
/// Names are relative to `work_dir` unless the pattern itself is absolute.
pub fn expand_inputs(work_dir: &Path, patterns: &[String]) -> Result<Vec<String>> {
    let dir = Pattern::escape(&work_dir.to_string_lossy());

    let mut inputs = Vec::new();
    for pattern in patterns {
        let full = if Path::new(pattern).is_absolute() {
            pattern.clone()
        } else {
            format!("{}/{}", dir, pattern)
        };

        let before = inputs.len();
        for entry in glob::glob(&full)? {
            let path = entry?;
            let name = path.strip_prefix(work_dir).unwrap_or(&path);
            inputs.push(name.to_string_lossy().into_owned());
        }
        if inputs.len() == before {
            return Err(anyhow!("`{}` matched no input files", pattern));
        }
    }
    Ok(inputs)
}

/// Map every input, then reduce all pairs into `out`. Returns the number of
/// distinct keys written.
///
/// Each input is read from `work_dir` and handed to the map function under
/// its name as given, the same key a distributed map task would use.
pub fn run_sequential<W: Write>(
    work_dir: &Path,
    inputs: &[String],
    workload: &Workload,
    aux: &Bytes,
    out: &mut W,
) -> Result<usize> {
    let mut intermediate = Vec::new();

    for name in inputs {
        let path = work_dir.join(name);
        let content =
            fs::read(&path).with_context(|| format!("can't open file {}", path.display()))?;
        let input = KeyValue::new(name.clone(), Bytes::from(content));

        for pair in (workload.map_fn)(input, aux.clone())? {
            intermediate.push(pair?);
        }
    }

    reduce_sorted(intermediate, workload, aux, out)
}
