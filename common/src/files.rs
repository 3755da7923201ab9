//! File naming shared by map and reduce workers.
//!
//! A reduce worker never asks which map tasks ran. It finds its inputs by
//! matching `mr-<map task id>-<bucket>` against its own bucket number, so
//! these names are part of the protocol.

/// Prefix of every map task id handed out by the coordinator.
pub const MAP_TASK_PREFIX: &str = "map-";

/// Prefix of every reduce task id handed out by the coordinator.
pub const REDUCE_TASK_PREFIX: &str = "reduce-";

pub fn map_task_id(index: usize) -> String {
    format!("{MAP_TASK_PREFIX}{index}")
}

pub fn reduce_task_id(partition: u32) -> String {
    format!("{REDUCE_TASK_PREFIX}{partition}")
}

/// Name of the file holding what map task `task_id` routed to `bucket`.
pub fn intermediate_file_name(task_id: &str, bucket: u32) -> String {
    format!("mr-{task_id}-{bucket}")
}

/// Name of the final output file of a reduce partition.
pub fn output_file_name(partition: u32) -> String {
    format!("mr-out-{partition}")
}

/// A glob matching every intermediate file destined for `bucket`.
///
/// Callers still need [`parse_intermediate_name`] to reject near misses.
pub fn intermediate_glob(bucket: u32) -> String {
    format!("mr-{MAP_TASK_PREFIX}*-{bucket}")
}

/// Split an intermediate file name into `(map task id, bucket)`.
pub fn parse_intermediate_name(name: &str) -> Option<(&str, u32)> {
    let rest = name.strip_prefix("mr-")?;
    let (task_id, bucket) = rest.rsplit_once('-')?;
    let index = task_id.strip_prefix(MAP_TASK_PREFIX)?;

    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if bucket.is_empty() || !bucket.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some((task_id, bucket.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        let name = intermediate_file_name(&map_task_id(3), 7);
        assert_eq!(name, "mr-map-3-7");
        assert_eq!(parse_intermediate_name(&name), Some(("map-3", 7)));
        assert_eq!(output_file_name(7), "mr-out-7");
        assert_eq!(reduce_task_id(7), "reduce-7");
    }

    #[test]
    fn foreign_names_rejected() {
        for name in [
            "mr-out-1",
            "mr-map--1",
            "mr-map-1-",
            "mr-map-x-1",
            "mr-reduce-1-1",
            "mr-map-1-1.tmp",
            "map-1-1",
        ] {
            assert_eq!(parse_intermediate_name(name), None, "{name}");
        }
    }

    #[test]
    fn glob_matches_own_bucket_only() {
        let pattern = glob::Pattern::new(&intermediate_glob(1)).unwrap();
        assert!(pattern.matches("mr-map-0-1"));
        assert!(pattern.matches("mr-map-12-1"));
        assert!(!pattern.matches("mr-map-0-11"));
        assert!(!pattern.matches("mr-map-0-2"));
        assert!(!pattern.matches("mr-out-1"));
    }
}
