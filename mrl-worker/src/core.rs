use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use tonic::transport::Channel;
use tonic::Request;
use tracing::{debug, info, warn};

use common::rpc::coordinator::TaskKind as WireKind;
use common::rpc::{connect, Assignment, CoordinatorClient, ReportRequest, TaskRequest};
use common::{TaskKind, Workload};

use crate::error::WorkerError;
use crate::{map, reduce};

/// Where and how a worker runs its tasks.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Map inputs are resolved against this directory, and every
    /// intermediate and output file is written into it.
    pub work_dir: PathBuf,

    /// Pause between requests while nothing is assignable.
    pub backoff: Duration,

    /// Auxiliary argument handed to every map and reduce call.
    pub aux: Bytes,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            backoff: Duration::from_secs(2),
            aux: Bytes::new(),
        }
    }
}

/// A worker bound to one coordinator and one workload.
#[derive(Debug)]
pub struct MRWorker {
    client: CoordinatorClient<Channel>,
    workload: Workload,
    config: WorkerConfig,
}

impl MRWorker {
    pub fn new(
        client: CoordinatorClient<Channel>,
        workload: Workload,
        config: WorkerConfig,
    ) -> Self {
        Self {
            client,
            workload,
            config,
        }
    }

    /// Connect to the coordinator listening at `socket`.
    pub async fn connect(
        socket: impl AsRef<Path>,
        workload: Workload,
        config: WorkerConfig,
    ) -> Result<Self, WorkerError> {
        let client = connect(socket).await?;
        Ok(Self::new(client, workload, config))
    }

    /// Pull and run tasks until the coordinator says the job is done.
    ///
    /// Returns an error as soon as the coordinator cannot be reached or
    /// replies with something unintelligible; nothing is retried.
    pub async fn run(&mut self) -> Result<(), WorkerError> {
        loop {
            let reply = self
                .client
                .request_task(Request::new(TaskRequest {}))
                .await?
                .into_inner();

            match Assignment::try_from(reply)? {
                Assignment::Done => {
                    info!("all tasks finished, exit");
                    return Ok(());
                }
                Assignment::Retry => {
                    debug!("no task to assign, retrying in {:?}", self.config.backoff);
                    tokio::time::sleep(self.config.backoff).await;
                }
                Assignment::Map(task) => {
                    info!("get map task id[{}] input `{}`", task.id, task.input);
                    let id = task.id.clone();
                    let workload = self.workload;
                    let config = self.config.clone();

                    let outcome =
                        execute(move || map::perform_map(&task, &workload, &config)).await;
                    match outcome {
                        Ok(files) => {
                            debug!("map task id[{}] wrote {} files", id, files.len());
                            self.report(&id, TaskKind::Map).await?;
                        }
                        Err(e) => warn!("abandoning map task id[{}]: {:#}", id, e),
                    }
                }
                Assignment::Reduce(task) => {
                    info!("get reduce task id[{}] partition {}", task.id, task.partition);
                    let id = task.id.clone();
                    let workload = self.workload;
                    let config = self.config.clone();

                    let outcome =
                        execute(move || reduce::perform_reduce(&task, &workload, &config)).await;
                    match outcome {
                        Ok(output) => {
                            debug!("reduce task id[{}] wrote {}", id, output.display());
                            self.report(&id, TaskKind::Reduce).await?;
                        }
                        Err(e) => warn!("abandoning reduce task id[{}]: {:#}", id, e),
                    }
                }
            }
        }
    }

    /// Tell the coordinator a task is done. A rejected report is only
    /// logged; the coordinator has already given the task to someone else.
    async fn report(&mut self, id: &str, kind: TaskKind) -> Result<(), WorkerError> {
        let request = ReportRequest {
            task_id: id.to_string(),
            kind: WireKind::from(kind).into(),
        };
        let message = self
            .client
            .report_done(Request::new(request))
            .await?
            .into_inner()
            .message;

        if message.is_empty() {
            info!("notified {} task id[{}] finished", kind, id);
        } else {
            warn!("coordinator replied [{}], discard", message);
        }

        Ok(())
    }
}

/// Run task work on the blocking pool. A panicking workload counts as a
/// failed attempt.
async fn execute<T, F>(work: F) -> anyhow::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}
