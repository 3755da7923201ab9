use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::net::UnixListener;
use tokio_stream::wrappers::UnixListenerStream;
use tonic::transport::Server;
use tracing::info;

use common::rpc::CoordinatorServer;

use crate::core::MRCoordinator;

/// A bound but not yet serving coordinator socket.
///
/// The socket file is removed again when this is dropped.
#[derive(Debug)]
pub struct CoordinatorSocket {
    path: PathBuf,
    listener: Option<UnixListener>,
}

impl CoordinatorSocket {
    /// Bind the Unix socket at `path`, replacing a stale socket file left
    /// behind by an earlier run.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        match std::fs::remove_file(&path) {
            Ok(()) => info!("removed stale socket {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e).with_context(|| format!("removing {}", path.display())),
        }

        let listener = UnixListener::bind(&path)
            .with_context(|| format!("binding coordinator socket {}", path.display()))?;
        info!("CoordinatorServer listening on {}", path.display());

        Ok(Self {
            path,
            listener: Some(listener),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serve the RPC protocol until the task is dropped or the listener
    /// fails.
    pub async fn serve(mut self, coordinator: MRCoordinator) -> Result<()> {
        let listener = self
            .listener
            .take()
            .context("coordinator socket already served")?;

        Server::builder()
            .add_service(CoordinatorServer::new(coordinator))
            .serve_with_incoming(UnixListenerStream::new(listener))
            .await?;

        Ok(())
    }
}

impl Drop for CoordinatorSocket {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
