//! Line-oriented encoding of intermediate key-value records.
//!
//! Each record is `base64(key) base64(value)` on its own line. The URL-safe
//! alphabet never produces a space or a newline, so a record is
//! self-delimiting whatever bytes the key and value hold.

use std::io::{BufRead, Write};

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use bytes::Bytes;

use crate::KeyValue;

/// Encode a single record, without the trailing newline.
pub fn encode_record(kv: &KeyValue) -> String {
    format!("{} {}", URL_SAFE.encode(&kv.key), URL_SAFE.encode(&kv.value))
}

/// Decode a single record line as written by [`encode_record`].
pub fn decode_record(line: &str) -> Result<KeyValue> {
    let (key, value) = line
        .split_once(' ')
        .ok_or_else(|| anyhow!("record has no separator: {line:?}"))?;

    let key = URL_SAFE
        .decode(key)
        .with_context(|| format!("failed decode key: {key}"))?;
    let value = URL_SAFE
        .decode(value)
        .with_context(|| format!("failed decode value: {value}"))?;

    Ok(KeyValue::new(Bytes::from(key), Bytes::from(value)))
}

/// Write records one per line, in the order given.
pub fn write_records<'a, W, I>(writer: &mut W, records: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a KeyValue>,
{
    for kv in records {
        writer.write_all(encode_record(kv).as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Read every record from `reader`. Blank lines are skipped; any other
/// malformed line fails the whole read.
pub fn read_records<R: BufRead>(reader: R) -> Result<Vec<KeyValue>> {
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        records.push(decode_record(&line)?);
    }
    Ok(records)
}
