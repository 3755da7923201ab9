//! Built-in MapReduce applications, selectable by name.

use common::Workload;

pub mod grep;
pub mod vertex_degree;
pub mod wc;

/// Names accepted by [`try_named`].
pub const NAMES: [&str; 3] = ["wc", "vertex-degree", "grep"];

/// Look up a workload by name.
pub fn try_named(name: &str) -> Option<Workload> {
    match name {
        "wc" => Some(wc::WORKLOAD),
        "vertex-degree" => Some(vertex_degree::WORKLOAD),
        "grep" => Some(grep::WORKLOAD),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_name_resolves() {
        for name in NAMES {
            assert!(try_named(name).is_some(), "{name}");
        }
        assert!(try_named("matrix-multiply").is_none());
    }
}
