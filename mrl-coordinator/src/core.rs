use std::sync::Arc;
use std::time::Duration;

use tonic::{Request, Response, Status};
use tracing::{info, warn};

use common::rpc::{Coordinator, ReportReply, ReportRequest, TaskReply, TaskRequest};
use common::TaskKind;

use crate::tasks::TaskRegistry;

/// Tunables of a coordinator process.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Number of reduce partitions.
    pub n_reduce: u32,

    /// How long a task may stay claimed before it is handed to someone else.
    pub task_timeout: Duration,

    /// Period of the timeout sweep.
    pub sweep_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            n_reduce: 10,
            task_timeout: Duration::from_secs(10),
            sweep_interval: Duration::from_secs(1),
        }
    }
}

/// The RPC face of the task registry.
///
/// Cloning is cheap; clones share the same registry.
#[derive(Debug, Clone)]
pub struct MRCoordinator {
    registry: Arc<TaskRegistry>,
}

impl MRCoordinator {
    pub fn new(input_files: &[String], n_reduce: u32) -> Self {
        let registry = TaskRegistry::new(input_files, n_reduce);
        info!(
            "coordinator initialized with {} map tasks and {} reduce tasks",
            registry.len(TaskKind::Map),
            registry.len(TaskKind::Reduce)
        );

        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> Arc<TaskRegistry> {
        self.registry.clone()
    }

    /// Whether the whole job is done. Meant to be polled.
    pub async fn is_complete(&self) -> bool {
        self.registry.is_complete().await
    }
}

#[tonic::async_trait]
impl Coordinator for MRCoordinator {
    /// Worker asks for something to do.
    async fn request_task(&self, _: Request<TaskRequest>) -> Result<Response<TaskReply>, Status> {
        let assignment = self.registry.claim_next().await;
        Ok(Response::new(assignment.into_reply()))
    }

    /// Worker says it finished a task.
    ///
    /// Rejections are not RPC errors: the worker gets a non-empty message and
    /// carries on.
    async fn report_done(
        &self,
        request: Request<ReportRequest>,
    ) -> Result<Response<ReportReply>, Status> {
        let request = request.into_inner();

        let message = match TaskKind::try_from(request.kind) {
            Ok(kind) => match self.registry.finish_if_running(&request.task_id, kind).await {
                Ok(()) => String::new(),
                Err(rejection) => {
                    warn!("discarding report for `{}`: {}", request.task_id, rejection);
                    rejection.to_string()
                }
            },
            Err(e) => {
                warn!("discarding report for `{}`: {}", request.task_id, e);
                e.to_string()
            }
        };

        Ok(Response::new(ReportReply { message }))
    }
}
