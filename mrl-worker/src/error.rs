use thiserror::Error;

use common::rpc::ProtocolError;

/// Failures that end a worker.
///
/// Problems with a single task never show up here; those attempts are
/// abandoned and left for the coordinator's timeout to reclaim.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("unable to reach coordinator: {0}")]
    Connect(#[from] tonic::transport::Error),

    #[error("coordinator call failed: {0}")]
    Rpc(#[from] tonic::Status),

    #[error("coordinator broke protocol: {0}")]
    Protocol(#[from] ProtocolError),
}
