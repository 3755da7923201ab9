//! Coordinator RPC definitions and Unix socket plumbing.
//!
//! Coordinator and workers find each other without any discovery service:
//! both derive the same socket path from the invoking user's id.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::net::UnixStream;
use tonic::transport::{Channel, Endpoint, Uri};
use tower::service_fn;

use crate::TaskKind;

//
// Import gRPC stubs/definitions.
//
pub mod coordinator {
    tonic::include_proto!("coordinator");
}

pub use coordinator::coordinator_client::CoordinatorClient;
pub use coordinator::coordinator_server::{Coordinator, CoordinatorServer};
pub use coordinator::{ReportReply, ReportRequest, TaskReply, TaskRequest};

use coordinator::TaskKind as WireKind;

/// Replies a well-behaved coordinator never sends.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("task kind is unset")]
    UnsetKind,

    #[error("unknown task kind value {0}")]
    UnknownKind(i32),

    #[error("task kind value {0} is not a map or reduce kind")]
    NotWorkKind(i32),

    #[error("reduce task `{id}` has non-numeric partition `{key}`")]
    BadPartition { id: String, key: String },
}

/// The socket path used when none is configured:
/// `/var/tmp/mrl-coordinator-<uid>.sock`.
pub fn default_socket_path() -> PathBuf {
    let uid = nix::unistd::getuid();
    PathBuf::from(format!("/var/tmp/mrl-coordinator-{uid}.sock"))
}

/// Connect to a coordinator listening on the Unix socket at `path`.
///
/// Fails straight away when nothing is listening there.
pub async fn connect(
    path: impl AsRef<Path>,
) -> Result<CoordinatorClient<Channel>, tonic::transport::Error> {
    let path = path.as_ref().to_path_buf();

    // The URI is required by the builder but ignored by the connector.
    let channel = Endpoint::from_static("http://[::]:50051")
        .connect_with_connector(service_fn(move |_: Uri| UnixStream::connect(path.clone())))
        .await?;

    Ok(CoordinatorClient::new(channel))
}

/////////////////////////////////////////////////////////////////////////////
// Domain <-> wire conversions
/////////////////////////////////////////////////////////////////////////////

impl From<TaskKind> for WireKind {
    fn from(kind: TaskKind) -> Self {
        match kind {
            TaskKind::Map => WireKind::Map,
            TaskKind::Reduce => WireKind::Reduce,
        }
    }
}

impl TryFrom<i32> for TaskKind {
    type Error = ProtocolError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match WireKind::try_from(value) {
            Ok(WireKind::Map) => Ok(TaskKind::Map),
            Ok(WireKind::Reduce) => Ok(TaskKind::Reduce),
            Ok(WireKind::Done | WireKind::Retry) => Err(ProtocolError::NotWorkKind(value)),
            Ok(WireKind::Unspecified) => Err(ProtocolError::UnsetKind),
            Err(_) => Err(ProtocolError::UnknownKind(value)),
        }
    }
}

/// A map task as a worker sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapAssignment {
    pub id: String,
    /// Input file name.
    pub input: String,
    pub split_count: u32,
}

/// A reduce task as a worker sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReduceAssignment {
    pub id: String,
    pub partition: u32,
    pub split_count: u32,
}

/// Decoded answer to `RequestTask`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    Map(MapAssignment),
    Reduce(ReduceAssignment),
    /// Work exists but none is assignable right now.
    Retry,
    /// The job is complete.
    Done,
}

impl Assignment {
    /// Encode for the wire. Sentinels carry no id, key or split count.
    pub fn into_reply(self) -> TaskReply {
        match self {
            Assignment::Map(task) => TaskReply {
                id: task.id,
                key: task.input,
                kind: WireKind::Map.into(),
                split_count: task.split_count,
            },
            Assignment::Reduce(task) => TaskReply {
                id: task.id,
                key: task.partition.to_string(),
                kind: WireKind::Reduce.into(),
                split_count: task.split_count,
            },
            Assignment::Retry => TaskReply {
                kind: WireKind::Retry.into(),
                ..Default::default()
            },
            Assignment::Done => TaskReply {
                kind: WireKind::Done.into(),
                ..Default::default()
            },
        }
    }
}

impl TryFrom<TaskReply> for Assignment {
    type Error = ProtocolError;

    fn try_from(reply: TaskReply) -> Result<Self, Self::Error> {
        match WireKind::try_from(reply.kind) {
            Ok(WireKind::Map) => Ok(Assignment::Map(MapAssignment {
                id: reply.id,
                input: reply.key,
                split_count: reply.split_count,
            })),
            Ok(WireKind::Reduce) => {
                let partition = reply.key.parse().map_err(|_| ProtocolError::BadPartition {
                    id: reply.id.clone(),
                    key: reply.key.clone(),
                })?;
                Ok(Assignment::Reduce(ReduceAssignment {
                    id: reply.id,
                    partition,
                    split_count: reply.split_count,
                }))
            }
            Ok(WireKind::Retry) => Ok(Assignment::Retry),
            Ok(WireKind::Done) => Ok(Assignment::Done),
            Ok(WireKind::Unspecified) => Err(ProtocolError::UnsetKind),
            Err(_) => Err(ProtocolError::UnknownKind(reply.kind)),
        }
    }
}
