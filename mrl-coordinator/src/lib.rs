//! The MapReduce coordinator: sole authority on task assignment and
//! completion.

pub mod core;
pub mod monitor;
pub mod server;
pub mod tasks;

pub use crate::core::{CoordinatorConfig, MRCoordinator};
pub use crate::server::CoordinatorSocket;
