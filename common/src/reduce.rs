//! Grouping of intermediate records into reduce calls.

use std::io::Write;

use anyhow::Result;
use bytes::Bytes;
use itertools::Itertools;

use crate::{KeyValue, Workload};

/// Sort `pairs` by key and feed every run of equal keys to the workload's
/// reduce function, writing one `"<key> <result>\n"` line per run in
/// ascending key order.
///
/// The sort is stable, so values reach the reduce function in the order they
/// were collected. Returns the number of distinct keys written.
pub fn reduce_sorted<W: Write>(
    mut pairs: Vec<KeyValue>,
    workload: &Workload,
    aux: &Bytes,
    out: &mut W,
) -> Result<usize> {
    pairs.sort_by(|a, b| a.key.cmp(&b.key));

    let mut written = 0;
    let runs = pairs.into_iter().chunk_by(KeyValue::key);
    for (key, run) in &runs {
        let values = run.map(KeyValue::into_value);
        let result = (workload.reduce_fn)(key.clone(), Box::new(values), aux.clone())?;

        out.write_all(&key)?;
        out.write_all(b" ")?;
        out.write_all(&result)?;
        out.write_all(b"\n")?;
        written += 1;
    }
    out.flush()?;

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MapOutput;

    fn no_map(_kv: KeyValue, _aux: Bytes) -> MapOutput {
        Ok(Box::new(std::iter::empty::<Result<KeyValue>>()))
    }

    fn join(
        _key: Bytes,
        values: Box<dyn Iterator<Item = Bytes> + '_>,
        _aux: Bytes,
    ) -> Result<Bytes> {
        let parts = values
            .map(|v| String::from_utf8_lossy(&v).into_owned())
            .collect::<Vec<_>>();
        Ok(Bytes::from(parts.join(",")))
    }

    fn fail(
        _key: Bytes,
        _values: Box<dyn Iterator<Item = Bytes> + '_>,
        _aux: Bytes,
    ) -> Result<Bytes> {
        anyhow::bail!("reduce exploded")
    }

    #[test]
    fn runs_are_sorted_and_values_keep_order() {
        let workload = Workload { map_fn: no_map, reduce_fn: join };
        let pairs = vec![
            KeyValue::new("b", "1"),
            KeyValue::new("a", "x"),
            KeyValue::new("b", "2"),
            KeyValue::new("a", "y"),
            KeyValue::new("c", "z"),
        ];

        let mut out = Vec::new();
        let written = reduce_sorted(pairs, &workload, &Bytes::new(), &mut out).unwrap();

        assert_eq!(written, 3);
        assert_eq!(String::from_utf8(out).unwrap(), "a x,y\nb 1,2\nc z\n");
    }

    #[test]
    fn empty_input_writes_nothing() {
        let workload = Workload { map_fn: no_map, reduce_fn: join };
        let mut out = Vec::new();
        assert_eq!(reduce_sorted(vec![], &workload, &Bytes::new(), &mut out).unwrap(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn reduce_failure_propagates() {
        let workload = Workload { map_fn: no_map, reduce_fn: fail };
        let mut out = Vec::new();
        let pairs = vec![KeyValue::new("a", "1")];
        assert!(reduce_sorted(pairs, &workload, &Bytes::new(), &mut out).is_err());
    }
}
