use anyhow::Result;
use bytes::Bytes;

/// Interpret workload input or output bytes as UTF-8 text.
pub fn string_from_bytes(bytes: Bytes) -> Result<String> {
    Ok(String::from_utf8(bytes.to_vec())?)
}
