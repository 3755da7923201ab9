use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use common::files::{map_task_id, reduce_task_id};
use common::rpc::{Assignment, MapAssignment, ReduceAssignment};
use common::TaskKind;

/// State of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Not assigned to anyone.
    Waiting,

    /// Claimed by a worker that has not reported back yet.
    Running,

    /// Reported done. Terminal.
    Finished,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskState::Waiting => "waiting",
            TaskState::Running => "running",
            TaskState::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// One unit of map or reduce work.
#[derive(Debug, Clone)]
pub struct Task {
    /// Stable unique id, e.g. `map-3` or `reduce-0`.
    pub id: String,

    /// Input file name of a map task, partition index of a reduce task.
    pub key: String,

    pub kind: TaskKind,

    pub state: TaskState,

    /// Number of reduce partitions in the job.
    pub split_count: u32,

    /// When the current claim was made. Only set while running.
    pub claimed_at: Option<Instant>,

    /// Number of successful claims so far.
    pub attempts: u32,
}

impl Task {
    fn new(id: String, key: String, kind: TaskKind, split_count: u32) -> Self {
        Self {
            id,
            key,
            kind,
            state: TaskState::Waiting,
            split_count,
            claimed_at: None,
            attempts: 0,
        }
    }

    /// Move to `to` if and only if the task is currently in `from`.
    ///
    /// Every state change goes through here while the entry's lock is held,
    /// so racing claims, reports and demotions get exactly one winner.
    fn transition(&mut self, from: TaskState, to: TaskState) -> bool {
        if self.state != from {
            return false;
        }
        self.state = to;
        self.claimed_at = match to {
            TaskState::Running => Some(Instant::now()),
            TaskState::Waiting | TaskState::Finished => None,
        };
        true
    }

    fn to_assignment(&self) -> Assignment {
        match self.kind {
            TaskKind::Map => Assignment::Map(MapAssignment {
                id: self.id.clone(),
                input: self.key.clone(),
                split_count: self.split_count,
            }),
            TaskKind::Reduce => Assignment::Reduce(ReduceAssignment {
                id: self.id.clone(),
                // Reduce keys are created from the partition index.
                partition: self.key.parse().unwrap_or_default(),
                split_count: self.split_count,
            }),
        }
    }
}

/// Why a completion report was discarded.
///
/// The display text is sent back to the worker as the advisory message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportRejection {
    #[error("no {kind} task with id `{id}`")]
    UnknownTask { id: String, kind: TaskKind },

    #[error("task `{id}` is {state}, not running; report discarded")]
    NotRunning { id: String, state: TaskState },
}

/// Outcome of scanning one phase for claimable work.
enum Scan {
    Claimed(Assignment),
    /// Nothing claimable. `true` when every task of the phase is finished.
    Exhausted(bool),
}

/// The coordinator's authoritative set of tasks.
///
/// Map and reduce tasks live in two separate maps keyed by id, each entry
/// behind its own lock. Callers only get state-checked operations; raw
/// entries never leave the registry.
#[derive(Debug)]
pub struct TaskRegistry {
    map_tasks: BTreeMap<String, Mutex<Task>>,
    reduce_tasks: BTreeMap<String, Mutex<Task>>,
}

impl TaskRegistry {
    /// One waiting map task per input file and one waiting reduce task per
    /// partition.
    pub fn new(input_files: &[String], n_reduce: u32) -> Self {
        let map_tasks = input_files
            .iter()
            .enumerate()
            .map(|(index, file)| {
                let id = map_task_id(index);
                let task = Task::new(id.clone(), file.clone(), TaskKind::Map, n_reduce);
                (id, Mutex::new(task))
            })
            .collect();

        let reduce_tasks = (0..n_reduce)
            .map(|partition| {
                let id = reduce_task_id(partition);
                let task = Task::new(id.clone(), partition.to_string(), TaskKind::Reduce, n_reduce);
                (id, Mutex::new(task))
            })
            .collect();

        Self {
            map_tasks,
            reduce_tasks,
        }
    }

    fn tasks(&self, kind: TaskKind) -> &BTreeMap<String, Mutex<Task>> {
        match kind {
            TaskKind::Map => &self.map_tasks,
            TaskKind::Reduce => &self.reduce_tasks,
        }
    }

    pub fn len(&self, kind: TaskKind) -> usize {
        self.tasks(kind).len()
    }

    /// Claim the first waiting task of a phase.
    async fn scan(&self, kind: TaskKind) -> Scan {
        let mut all_finished = true;

        for entry in self.tasks(kind).values() {
            let mut task = entry.lock().await;
            if task.transition(TaskState::Waiting, TaskState::Running) {
                task.attempts += 1;
                info!(
                    id = %task.id,
                    key = %task.key,
                    attempt = task.attempts,
                    "assigned {} task",
                    kind
                );
                return Scan::Claimed(task.to_assignment());
            }
            if task.state != TaskState::Finished {
                all_finished = false;
            }
        }

        Scan::Exhausted(all_finished)
    }

    /// Hand out the next piece of work.
    ///
    /// Reduce tasks are only considered once every map task has finished.
    pub async fn claim_next(&self) -> Assignment {
        match self.scan(TaskKind::Map).await {
            Scan::Claimed(assignment) => return assignment,
            Scan::Exhausted(false) => {
                debug!("map phase still running, worker should retry");
                return Assignment::Retry;
            }
            Scan::Exhausted(true) => {}
        }

        match self.scan(TaskKind::Reduce).await {
            Scan::Claimed(assignment) => assignment,
            Scan::Exhausted(true) => {
                debug!("all tasks finished");
                Assignment::Done
            }
            Scan::Exhausted(false) => {
                debug!("reduce phase still running, worker should retry");
                Assignment::Retry
            }
        }
    }

    /// Accept a completion report if the task is still running.
    pub async fn finish_if_running(&self, id: &str, kind: TaskKind) -> Result<(), ReportRejection> {
        let entry = self
            .tasks(kind)
            .get(id)
            .ok_or_else(|| ReportRejection::UnknownTask {
                id: id.to_string(),
                kind,
            })?;

        let mut task = entry.lock().await;
        if task.transition(TaskState::Running, TaskState::Finished) {
            info!(id = %task.id, "{} task finished", kind);
            Ok(())
        } else {
            Err(ReportRejection::NotRunning {
                id: task.id.clone(),
                state: task.state,
            })
        }
    }

    /// Return every task whose claim is older than `timeout` at `now` to
    /// waiting. Returns the ids of the demoted tasks.
    pub async fn demote_expired(&self, now: Instant, timeout: Duration) -> Vec<String> {
        let mut demoted = Vec::new();

        for entry in self.map_tasks.values().chain(self.reduce_tasks.values()) {
            let mut task = entry.lock().await;
            let expired = task
                .claimed_at
                .is_some_and(|claimed_at| now.saturating_duration_since(claimed_at) > timeout);

            if expired && task.transition(TaskState::Running, TaskState::Waiting) {
                info!(id = %task.id, attempt = task.attempts, "task timed out, reset to waiting");
                demoted.push(task.id.clone());
            }
        }

        demoted
    }

    /// Whether every reduce task has finished.
    pub async fn is_complete(&self) -> bool {
        for entry in self.reduce_tasks.values() {
            if entry.lock().await.state != TaskState::Finished {
                return false;
            }
        }
        true
    }

    /// Current state of one task.
    pub async fn state_of(&self, id: &str, kind: TaskKind) -> Option<TaskState> {
        match self.tasks(kind).get(id) {
            Some(entry) => Some(entry.lock().await.state),
            None => None,
        }
    }

    /// A copy of every task, map tasks first.
    pub async fn snapshot(&self) -> Vec<Task> {
        let mut tasks = Vec::with_capacity(self.map_tasks.len() + self.reduce_tasks.len());
        for entry in self.map_tasks.values().chain(self.reduce_tasks.values()) {
            tasks.push(entry.lock().await.clone());
        }
        tasks
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn inputs(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("pg-{i}.txt")).collect()
    }

    fn task_id(assignment: &Assignment) -> &str {
        match assignment {
            Assignment::Map(task) => &task.id,
            Assignment::Reduce(task) => &task.id,
            other => panic!("expected a task, got {other:?}"),
        }
    }

    fn far_future() -> Instant {
        Instant::now() + Duration::from_secs(3600)
    }

    #[tokio::test]
    async fn registry_starts_waiting() {
        let registry = TaskRegistry::new(&inputs(3), 2);

        assert_eq!(registry.len(TaskKind::Map), 3);
        assert_eq!(registry.len(TaskKind::Reduce), 2);
        for task in registry.snapshot().await {
            assert_eq!(task.state, TaskState::Waiting);
            assert_eq!(task.split_count, 2);
            assert!(task.claimed_at.is_none());
        }
        assert_eq!(registry.state_of("reduce-1", TaskKind::Reduce).await, Some(TaskState::Waiting));
        assert_eq!(registry.state_of("reduce-1", TaskKind::Map).await, None);
    }

    #[tokio::test]
    async fn map_tasks_are_handed_out_first() {
        let registry = TaskRegistry::new(&inputs(2), 1);

        let first = registry.claim_next().await;
        assert_eq!(
            first,
            Assignment::Map(MapAssignment {
                id: "map-0".into(),
                input: "pg-0.txt".into(),
                split_count: 1,
            })
        );
        assert_eq!(task_id(&registry.claim_next().await), "map-1");
        assert_eq!(registry.state_of("map-0", TaskKind::Map).await, Some(TaskState::Running));
    }

    #[tokio::test]
    async fn no_reduce_while_maps_are_running() {
        let registry = TaskRegistry::new(&inputs(2), 3);
        registry.claim_next().await;
        registry.claim_next().await;

        // Every map task is running, none waiting, none finished.
        assert_eq!(registry.claim_next().await, Assignment::Retry);

        registry.finish_if_running("map-0", TaskKind::Map).await.unwrap();
        assert_eq!(registry.claim_next().await, Assignment::Retry);

        registry.finish_if_running("map-1", TaskKind::Map).await.unwrap();
        assert_eq!(
            registry.claim_next().await,
            Assignment::Reduce(ReduceAssignment {
                id: "reduce-0".into(),
                partition: 0,
                split_count: 3,
            })
        );
    }

    #[tokio::test]
    async fn no_reduce_while_a_map_is_waiting_again() {
        let registry = TaskRegistry::new(&inputs(2), 1);
        registry.claim_next().await;
        registry.claim_next().await;
        registry.finish_if_running("map-1", TaskKind::Map).await.unwrap();

        let demoted = registry.demote_expired(far_future(), Duration::from_secs(10)).await;
        assert_eq!(demoted, vec!["map-0".to_string()]);

        // The demoted map is reassigned before any reduce task.
        assert_eq!(task_id(&registry.claim_next().await), "map-0");
        assert_eq!(registry.claim_next().await, Assignment::Retry);
    }

    #[tokio::test]
    async fn done_once_every_reduce_finished() {
        let registry = TaskRegistry::new(&inputs(1), 2);
        assert!(!registry.is_complete().await);

        let map = registry.claim_next().await;
        registry.finish_if_running(task_id(&map), TaskKind::Map).await.unwrap();

        let r0 = registry.claim_next().await;
        let r1 = registry.claim_next().await;
        assert_eq!(registry.claim_next().await, Assignment::Retry);

        registry.finish_if_running(task_id(&r0), TaskKind::Reduce).await.unwrap();
        assert!(!registry.is_complete().await);

        registry.finish_if_running(task_id(&r1), TaskKind::Reduce).await.unwrap();
        assert!(registry.is_complete().await);
        assert_eq!(registry.claim_next().await, Assignment::Done);

        // Nothing can pull a finished task back.
        assert!(registry.demote_expired(far_future(), Duration::ZERO).await.is_empty());
        assert!(registry.is_complete().await);
    }

    #[tokio::test]
    async fn reports_for_tasks_not_running_change_nothing() {
        let registry = TaskRegistry::new(&inputs(1), 1);

        let waiting = registry.finish_if_running("map-0", TaskKind::Map).await;
        assert_eq!(
            waiting,
            Err(ReportRejection::NotRunning {
                id: "map-0".into(),
                state: TaskState::Waiting,
            })
        );
        assert_eq!(registry.state_of("map-0", TaskKind::Map).await, Some(TaskState::Waiting));

        registry.claim_next().await;
        registry.finish_if_running("map-0", TaskKind::Map).await.unwrap();

        let duplicate = registry.finish_if_running("map-0", TaskKind::Map).await;
        assert!(matches!(
            duplicate,
            Err(ReportRejection::NotRunning {
                state: TaskState::Finished,
                ..
            })
        ));

        let unknown = registry.finish_if_running("map-7", TaskKind::Map).await;
        assert!(matches!(unknown, Err(ReportRejection::UnknownTask { .. })));

        // Right id, wrong kind.
        let wrong_kind = registry.finish_if_running("map-0", TaskKind::Reduce).await;
        assert!(matches!(wrong_kind, Err(ReportRejection::UnknownTask { .. })));
    }

    #[tokio::test]
    async fn only_expired_claims_are_demoted() {
        let registry = TaskRegistry::new(&inputs(1), 1);
        registry.claim_next().await;

        let fresh = registry.demote_expired(Instant::now(), Duration::from_secs(10)).await;
        assert!(fresh.is_empty());
        assert_eq!(registry.state_of("map-0", TaskKind::Map).await, Some(TaskState::Running));

        let stale = registry.demote_expired(far_future(), Duration::from_secs(10)).await;
        assert_eq!(stale, vec!["map-0".to_string()]);

        let task = registry.snapshot().await.remove(0);
        assert_eq!(task.state, TaskState::Waiting);
        assert!(task.claimed_at.is_none());
        assert_eq!(task.attempts, 1);

        // A second sweep finds nothing left to demote.
        assert!(registry.demote_expired(far_future(), Duration::from_secs(10)).await.is_empty());
    }

    #[tokio::test]
    async fn late_report_after_reclaim_is_rejected() {
        let registry = TaskRegistry::new(&inputs(1), 1);

        registry.claim_next().await;
        registry.demote_expired(far_future(), Duration::from_secs(10)).await;

        // Second worker picks it up and finishes first.
        assert_eq!(task_id(&registry.claim_next().await), "map-0");
        registry.finish_if_running("map-0", TaskKind::Map).await.unwrap();

        // The straggler's report is discarded.
        assert!(registry.finish_if_running("map-0", TaskKind::Map).await.is_err());
        let task = registry.snapshot().await.remove(0);
        assert_eq!(task.state, TaskState::Finished);
        assert_eq!(task.attempts, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_claims_have_one_winner() {
        for _ in 0..20 {
            let registry = Arc::new(TaskRegistry::new(&inputs(1), 1));

            let claimers = (0..16)
                .map(|_| {
                    let registry = registry.clone();
                    tokio::spawn(async move { registry.claim_next().await })
                })
                .collect::<Vec<_>>();

            let mut winners = 0;
            for claimer in claimers {
                match claimer.await.unwrap() {
                    Assignment::Map(task) => {
                        assert_eq!(task.id, "map-0");
                        winners += 1;
                    }
                    other => assert_eq!(other, Assignment::Retry),
                }
            }
            assert_eq!(winners, 1);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn report_racing_demotion_has_one_winner() {
        for _ in 0..20 {
            let registry = Arc::new(TaskRegistry::new(&inputs(1), 1));
            registry.claim_next().await;

            let reporter = {
                let registry = registry.clone();
                tokio::spawn(
                    async move { registry.finish_if_running("map-0", TaskKind::Map).await },
                )
            };
            let sweeper = {
                let registry = registry.clone();
                tokio::spawn(
                    async move { registry.demote_expired(far_future(), Duration::ZERO).await },
                )
            };

            let reported = reporter.await.unwrap().is_ok();
            let demoted = !sweeper.await.unwrap().is_empty();
            assert!(reported ^ demoted);

            let expected = if reported { TaskState::Finished } else { TaskState::Waiting };
            assert_eq!(registry.state_of("map-0", TaskKind::Map).await, Some(expected));
        }
    }
}
