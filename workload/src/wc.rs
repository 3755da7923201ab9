//! Word count. A word is a maximal run of letters.

use anyhow::Result;
use bytes::Bytes;

use common::utils::string_from_bytes;
use common::{KeyValue, MapOutput, Workload};

pub const WORKLOAD: Workload = Workload {
    map_fn: map,
    reduce_fn: reduce,
};

pub fn map(kv: KeyValue, _aux: Bytes) -> MapOutput {
    let contents = string_from_bytes(kv.value)?;

    let words = contents
        .split(|c: char| !c.is_alphabetic())
        .filter(|word| !word.is_empty())
        .map(|word| Ok(KeyValue::new(word.to_string(), "1")))
        .collect::<Vec<Result<KeyValue>>>();

    Ok(Box::new(words.into_iter()))
}

pub fn reduce(
    _key: Bytes,
    values: Box<dyn Iterator<Item = Bytes> + '_>,
    _aux: Bytes,
) -> Result<Bytes> {
    Ok(Bytes::from(values.count().to_string()))
}
