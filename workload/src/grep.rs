//! Count the lines of each input that contain a pattern.
//!
//! The pattern is the auxiliary argument. Keys are input names.

use anyhow::{ensure, Result};
use bytes::Bytes;

use common::utils::string_from_bytes;
use common::{KeyValue, MapOutput, Workload};

pub const WORKLOAD: Workload = Workload {
    map_fn: map,
    reduce_fn: reduce,
};

pub fn map(kv: KeyValue, aux: Bytes) -> MapOutput {
    let pattern = string_from_bytes(aux)?;
    ensure!(!pattern.is_empty(), "grep needs a pattern");

    let contents = string_from_bytes(kv.value)?;
    let name = kv.key;

    let matches = contents
        .lines()
        .filter(|line| line.contains(pattern.as_str()))
        .map(|line| Ok(KeyValue::new(name.clone(), line.to_string())))
        .collect::<Vec<Result<KeyValue>>>();

    Ok(Box::new(matches.into_iter()))
}

pub fn reduce(
    _key: Bytes,
    values: Box<dyn Iterator<Item = Bytes> + '_>,
    _aux: Bytes,
) -> Result<Bytes> {
    Ok(Bytes::from(values.count().to_string()))
}
