//! A MapReduce worker: pulls tasks from the coordinator until the job is
//! done, running the injected workload for each one.

pub mod core;
pub mod error;
pub mod map;
pub mod reduce;

pub use crate::core::{MRWorker, WorkerConfig};
pub use crate::error::WorkerError;
