use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock, Timer, TokioTimer};
use crate::engine::{StartOptions, WorkflowEngine, WorkflowIdReusePolicy};
use crate::error::EngineError;
use crate::workflow::{
    RunDescription, RunStatus, Workflow, WorkflowContext, WorkflowHandle, WorkflowRunError,
};

struct RunState {
    status: RunStatus,
    start_time: DateTime<Utc>,
    close_time: Option<DateTime<Utc>>,
    error: Option<String>,
}

struct RunEntry {
    run_id: String,
    kind: String,
    state: Arc<Mutex<RunState>>,
    cancel: CancellationToken,
    task: Mutex<Option<tokio::task::JoinHandle<()>>>,
    queries: Arc<DashMap<String, serde_json::Value>>,
}

impl RunEntry {
    fn handle(&self, workflow_id: &str) -> WorkflowHandle {
        WorkflowHandle {
            workflow_id: workflow_id.to_owned(),
            run_id: self.run_id.clone(),
        }
    }

    fn is_running(&self) -> bool {
        self.state.lock().expect("run state poisoned").status == RunStatus::Running
    }
}

/// In-process engine: one tracked run per workflow id, cooperative
/// cancellation, force-termination via task abort.
pub struct LocalEngine {
    workflows: HashMap<String, Arc<dyn Workflow>>,
    runs: DashMap<String, RunEntry>,
    clock: Arc<dyn Clock>,
    timer: Arc<dyn Timer>,
}

/// Builder for [`LocalEngine`].
pub struct LocalEngineBuilder {
    workflows: HashMap<String, Arc<dyn Workflow>>,
    clock: Arc<dyn Clock>,
    timer: Arc<dyn Timer>,
}

impl LocalEngineBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            workflows: HashMap::new(),
            clock: Arc::new(SystemClock),
            timer: Arc::new(TokioTimer),
        }
    }

    /// Register a workflow definition under its kind.
    #[must_use]
    pub fn register(mut self, workflow: Arc<dyn Workflow>) -> Self {
        self.workflows.insert(workflow.kind().to_owned(), workflow);
        self
    }

    /// Substitute the clock (tests).
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Substitute the timer (tests).
    #[must_use]
    pub fn timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = timer;
        self
    }

    #[must_use]
    pub fn build(self) -> LocalEngine {
        LocalEngine {
            workflows: self.workflows,
            runs: DashMap::new(),
            clock: self.clock,
            timer: self.timer,
        }
    }
}

impl Default for LocalEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalEngine {
    /// Start building an engine.
    #[must_use]
    pub fn builder() -> LocalEngineBuilder {
        LocalEngineBuilder::new()
    }

    fn spawn_run(
        &self,
        workflow: Arc<dyn Workflow>,
        workflow_id: &str,
        input: serde_json::Value,
    ) -> RunEntry {
        let run_id = Uuid::new_v4().to_string();
        let kind = workflow.kind().to_owned();
        let state = Arc::new(Mutex::new(RunState {
            status: RunStatus::Running,
            start_time: self.clock.now(),
            close_time: None,
            error: None,
        }));
        let cancel = CancellationToken::new();
        let queries: Arc<DashMap<String, serde_json::Value>> = Arc::new(DashMap::new());

        let ctx = WorkflowContext::new(
            workflow_id,
            &run_id,
            self.clock.clone(),
            self.timer.clone(),
            cancel.clone(),
            queries.clone(),
        );

        let task_state = state.clone();
        let task_clock = self.clock.clone();
        let task_workflow_id = workflow_id.to_owned();
        let task_run_id = run_id.clone();

        let task = tokio::spawn(async move {
            let result = workflow.run(ctx, input).await;
            let mut state = task_state.lock().expect("run state poisoned");
            // Force termination may have closed the run already.
            if state.status != RunStatus::Running {
                return;
            }
            state.close_time = Some(task_clock.now());
            match result {
                Ok(_) => {
                    state.status = RunStatus::Completed;
                    debug!(workflow_id = %task_workflow_id, run_id = %task_run_id, "run completed");
                }
                Err(WorkflowRunError::Cancelled) => {
                    state.status = RunStatus::Cancelled;
                    info!(workflow_id = %task_workflow_id, run_id = %task_run_id, "run cancelled");
                }
                Err(WorkflowRunError::Failed(message)) => {
                    state.status = RunStatus::Failed;
                    warn!(
                        workflow_id = %task_workflow_id,
                        run_id = %task_run_id,
                        error = %message,
                        "run failed"
                    );
                    state.error = Some(message);
                }
            }
        });

        RunEntry {
            run_id,
            kind,
            state,
            cancel,
            task: Mutex::new(Some(task)),
            queries,
        }
    }
}

#[async_trait]
impl WorkflowEngine for LocalEngine {
    async fn start_workflow(
        &self,
        kind: &str,
        workflow_id: &str,
        input: serde_json::Value,
        options: StartOptions,
    ) -> Result<WorkflowHandle, EngineError> {
        let workflow = self
            .workflows
            .get(kind)
            .cloned()
            .ok_or_else(|| EngineError::UnknownWorkflowKind(kind.to_owned()))?;

        // The map entry is held across the running check and the insert so
        // concurrent duplicate starts resolve to one run.
        match self.runs.entry(workflow_id.to_owned()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_running() {
                    debug!(workflow_id, "start while running, returning existing handle");
                    return Ok(occupied.get().handle(workflow_id));
                }
                if options.reuse_policy == WorkflowIdReusePolicy::RejectDuplicate {
                    return Err(EngineError::DuplicateWorkflow {
                        workflow_id: workflow_id.to_owned(),
                        run_id: occupied.get().run_id.clone(),
                    });
                }
                let entry = self.spawn_run(workflow, workflow_id, input);
                let handle = entry.handle(workflow_id);
                occupied.insert(entry);
                info!(workflow_id, run_id = %handle.run_id, task_queue = %options.task_queue, "run started");
                Ok(handle)
            }
            Entry::Vacant(vacant) => {
                let entry = self.spawn_run(workflow, workflow_id, input);
                let handle = entry.handle(workflow_id);
                vacant.insert(entry);
                info!(workflow_id, run_id = %handle.run_id, task_queue = %options.task_queue, "run started");
                Ok(handle)
            }
        }
    }

    async fn get_handle(&self, workflow_id: &str) -> Option<WorkflowHandle> {
        self.runs.get(workflow_id).map(|e| e.handle(workflow_id))
    }

    async fn describe(&self, workflow_id: &str) -> Result<RunDescription, EngineError> {
        let entry = self
            .runs
            .get(workflow_id)
            .ok_or_else(|| EngineError::NotFound(workflow_id.to_owned()))?;
        let state = entry.state.lock().expect("run state poisoned");
        Ok(RunDescription {
            workflow_id: workflow_id.to_owned(),
            run_id: entry.run_id.clone(),
            kind: entry.kind.clone(),
            status: state.status,
            start_time: state.start_time,
            close_time: state.close_time,
            error: state.error.clone(),
        })
    }

    async fn query(
        &self,
        workflow_id: &str,
        name: &str,
    ) -> Result<serde_json::Value, EngineError> {
        let entry = self
            .runs
            .get(workflow_id)
            .ok_or_else(|| EngineError::NotFound(workflow_id.to_owned()))?;
        entry
            .queries
            .get(name)
            .map(|v| v.clone())
            .ok_or_else(|| EngineError::UnknownQuery(name.to_owned()))
    }

    async fn cancel(&self, workflow_id: &str) -> Result<(), EngineError> {
        let entry = self
            .runs
            .get(workflow_id)
            .ok_or_else(|| EngineError::NotFound(workflow_id.to_owned()))?;
        info!(workflow_id, "cancellation requested");
        entry.cancel.cancel();
        Ok(())
    }

    async fn terminate(&self, workflow_id: &str, reason: &str) -> Result<(), EngineError> {
        let entry = self
            .runs
            .get(workflow_id)
            .ok_or_else(|| EngineError::NotFound(workflow_id.to_owned()))?;
        entry.cancel.cancel();
        let task = entry.task.lock().expect("task slot poisoned").take();
        {
            let mut state = entry.state.lock().expect("run state poisoned");
            if state.status == RunStatus::Running {
                state.status = RunStatus::Cancelled;
                state.error = Some(reason.to_owned());
                state.close_time = Some(self.clock.now());
            }
        }
        if let Some(task) = task {
            task.abort();
        }
        warn!(workflow_id, reason, "run terminated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::workflow::SleepOutcome;

    /// Test workflow: loops `iterations` times, sleeping between loops and
    /// honouring cancellation.
    struct LoopingWorkflow {
        iterations: u32,
        sleep: Duration,
        executed: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Workflow for LoopingWorkflow {
        fn kind(&self) -> &str {
            "looping"
        }

        async fn run(
            &self,
            ctx: WorkflowContext,
            _input: serde_json::Value,
        ) -> Result<serde_json::Value, WorkflowRunError> {
            for i in 0..self.iterations {
                if ctx.is_cancelled() {
                    return Err(WorkflowRunError::Cancelled);
                }
                self.executed.fetch_add(1, Ordering::SeqCst);
                ctx.set_query_state("iterations", serde_json::json!(i + 1));
                if ctx.sleep(self.sleep).await == SleepOutcome::Cancelled {
                    return Err(WorkflowRunError::Cancelled);
                }
            }
            Ok(serde_json::json!({ "iterations": self.iterations }))
        }
    }

    struct FailingWorkflow;

    #[async_trait]
    impl Workflow for FailingWorkflow {
        fn kind(&self) -> &str {
            "failing"
        }

        async fn run(
            &self,
            _ctx: WorkflowContext,
            _input: serde_json::Value,
        ) -> Result<serde_json::Value, WorkflowRunError> {
            Err(WorkflowRunError::Failed("boom".into()))
        }
    }

    async fn wait_terminal(engine: &LocalEngine, workflow_id: &str) -> RunDescription {
        for _ in 0..500 {
            let desc = engine.describe(workflow_id).await.unwrap();
            if desc.status.is_terminal() {
                return desc;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("workflow {workflow_id} did not reach a terminal status");
    }

    fn engine_with(executed: Arc<AtomicU32>, iterations: u32, sleep: Duration) -> LocalEngine {
        LocalEngine::builder()
            .register(Arc::new(LoopingWorkflow {
                iterations,
                sleep,
                executed,
            }))
            .register(Arc::new(FailingWorkflow))
            .build()
    }

    fn options() -> StartOptions {
        StartOptions::new("freight-delay-queue")
    }

    #[tokio::test]
    async fn unknown_kind_is_rejected() {
        let engine = engine_with(Arc::new(AtomicU32::new(0)), 1, Duration::ZERO);
        let err = engine
            .start_workflow("nope", "wf-1", serde_json::Value::Null, options())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownWorkflowKind(_)));
    }

    #[tokio::test]
    async fn start_while_running_returns_existing_handle() {
        let engine = engine_with(Arc::new(AtomicU32::new(0)), 100, Duration::from_secs(60));
        let first = engine
            .start_workflow("looping", "wf-1", serde_json::Value::Null, options())
            .await
            .unwrap();
        let second = engine
            .start_workflow("looping", "wf-1", serde_json::Value::Null, options())
            .await
            .unwrap();
        assert_eq!(first.run_id, second.run_id);

        engine.terminate("wf-1", "test cleanup").await.unwrap();
    }

    #[tokio::test]
    async fn completed_run_allows_a_new_run() {
        let executed = Arc::new(AtomicU32::new(0));
        let engine = engine_with(executed.clone(), 1, Duration::ZERO);
        let first = engine
            .start_workflow("looping", "wf-1", serde_json::Value::Null, options())
            .await
            .unwrap();
        let desc = wait_terminal(&engine, "wf-1").await;
        assert_eq!(desc.status, RunStatus::Completed);

        let second = engine
            .start_workflow("looping", "wf-1", serde_json::Value::Null, options())
            .await
            .unwrap();
        assert_ne!(first.run_id, second.run_id);
        wait_terminal(&engine, "wf-1").await;
        assert_eq!(executed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn reject_duplicate_policy_rejects_closed_runs() {
        let engine = engine_with(Arc::new(AtomicU32::new(0)), 1, Duration::ZERO);
        engine
            .start_workflow("looping", "wf-1", serde_json::Value::Null, options())
            .await
            .unwrap();
        wait_terminal(&engine, "wf-1").await;

        let err = engine
            .start_workflow(
                "looping",
                "wf-1",
                serde_json::Value::Null,
                options().with_reuse_policy(WorkflowIdReusePolicy::RejectDuplicate),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateWorkflow { .. }));
    }

    #[tokio::test]
    async fn cancel_wakes_sleeping_run() {
        let executed = Arc::new(AtomicU32::new(0));
        let engine = engine_with(executed.clone(), 100, Duration::from_secs(3600));
        engine
            .start_workflow("looping", "wf-1", serde_json::Value::Null, options())
            .await
            .unwrap();

        // Let the first iteration land before cancelling.
        tokio::time::sleep(Duration::from_millis(20)).await;
        engine.cancel("wf-1").await.unwrap();

        let desc = wait_terminal(&engine, "wf-1").await;
        assert_eq!(desc.status, RunStatus::Cancelled);
        assert_eq!(executed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn terminate_closes_run_with_reason() {
        let engine = engine_with(Arc::new(AtomicU32::new(0)), 100, Duration::from_secs(3600));
        engine
            .start_workflow("looping", "wf-1", serde_json::Value::Null, options())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        engine.terminate("wf-1", "force").await.unwrap();

        let desc = engine.describe("wf-1").await.unwrap();
        assert_eq!(desc.status, RunStatus::Cancelled);
        assert_eq!(desc.error.as_deref(), Some("force"));
        assert!(desc.close_time.is_some());
    }

    #[tokio::test]
    async fn failed_run_records_error() {
        let engine = engine_with(Arc::new(AtomicU32::new(0)), 1, Duration::ZERO);
        engine
            .start_workflow("failing", "wf-f", serde_json::Value::Null, options())
            .await
            .unwrap();
        let desc = wait_terminal(&engine, "wf-f").await;
        assert_eq!(desc.status, RunStatus::Failed);
        assert_eq!(desc.error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn query_returns_published_state() {
        let engine = engine_with(Arc::new(AtomicU32::new(0)), 1, Duration::ZERO);
        engine
            .start_workflow("looping", "wf-1", serde_json::Value::Null, options())
            .await
            .unwrap();
        wait_terminal(&engine, "wf-1").await;

        let value = engine.query("wf-1", "iterations").await.unwrap();
        assert_eq!(value, serde_json::json!(1));
        assert!(matches!(
            engine.query("wf-1", "missing").await.unwrap_err(),
            EngineError::UnknownQuery(_)
        ));
    }

    #[tokio::test]
    async fn describe_unknown_id_is_not_found() {
        let engine = engine_with(Arc::new(AtomicU32::new(0)), 1, Duration::ZERO);
        assert!(matches!(
            engine.describe("missing").await.unwrap_err(),
            EngineError::NotFound(_)
        ));
        assert!(engine.get_handle("missing").await.is_none());
    }
}
