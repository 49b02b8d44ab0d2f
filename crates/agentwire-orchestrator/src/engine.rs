use crate::config::OrchestratorConfig;
use crate::monitor::AgentMonitor;
use crate::retry::call_with_retry;
use crate::types::{
    ChainError, ChainOutcome, ItemResult, JobReport, OrchestrationJob, ProgressEvent,
    StageOutput, Strategy, TaskRequest,
};
use agentwire_a2a::{AgentCaller, DescriptorResolver};
use agentwire_core::{AgentDescriptor, AgentwireError, AgentwireResult, ErrorInfo};
use futures_util::future::join_all;
use futures_util::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Prompt sent for one perspective of a multi-perspective query.
pub fn perspective_prompt(perspective: &str, query: &str) -> String {
    format!("From a {perspective} perspective: {query}")
}

/// Composes agent calls into chains, fan-outs and bounded batches.
///
/// Cloning is cheap and clones share the monitor and descriptor cache.
#[derive(Clone)]
pub struct Orchestrator {
    caller: Arc<dyn AgentCaller>,
    resolver: Option<Arc<dyn DescriptorResolver>>,
    config: OrchestratorConfig,
    monitor: AgentMonitor,
    descriptors: Arc<RwLock<HashMap<String, AgentDescriptor>>>,
}

impl Orchestrator {
    /// Orchestrator without a resolver.
    pub fn new(caller: Arc<dyn AgentCaller>, config: OrchestratorConfig) -> Self {
        Self {
            caller,
            resolver: None,
            config,
            monitor: AgentMonitor::new(),
            descriptors: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Resolver used by [`descriptor`](Self::descriptor).
    pub fn with_resolver(mut self, resolver: Arc<dyn DescriptorResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Call monitor shared by clones.
    pub fn monitor(&self) -> &AgentMonitor {
        &self.monitor
    }

    /// Resolves `name` once and serves it from cache afterwards.
    pub async fn descriptor(&self, name: &str) -> AgentwireResult<AgentDescriptor> {
        if let Some(descriptor) = self.descriptors.read().await.get(name) {
            return Ok(descriptor.clone());
        }

        let resolver = self.resolver.as_ref().ok_or_else(|| {
            AgentwireError::Config(format!("no descriptor resolver configured to look up '{name}'"))
        })?;
        let descriptor = resolver.resolve(name).await?;
        debug!(agent = %name, endpoint = %descriptor.endpoint, "Descriptor cached");
        self.descriptors
            .write()
            .await
            .insert(name.to_string(), descriptor.clone());
        Ok(descriptor)
    }

    /// Forgets every cached descriptor.
    pub async fn clear_cache(&self) {
        self.descriptors.write().await.clear();
    }

    /// One monitored call, retried per the configured policy.
    pub async fn call(&self, agent: &AgentDescriptor, input: &str) -> AgentwireResult<String> {
        let guard = self.monitor.start_call(&agent.name);

        let result = call_with_retry(self.caller.as_ref(), &self.config.retry, agent, input).await;

        guard.finish(match &result {
            Ok(_) => Ok(()),
            Err(e) => Err(ErrorInfo::from(e)),
        });
        result
    }

    /// Feeds `input` through `agents` in order, each output becoming the next
    /// input. Stops at the first failure; later stages are never called.
    pub async fn chain(
        &self,
        agents: &[AgentDescriptor],
        input: &str,
    ) -> Result<ChainOutcome, ChainError> {
        let mut stages = Vec::with_capacity(agents.len());
        let mut current = input.to_string();

        for (stage_index, agent) in agents.iter().enumerate() {
            info!(stage = stage_index, agent = %agent.name, "Chain stage starting");
            match self.call(agent, &current).await {
                Ok(output) => {
                    stages.push(StageOutput {
                        agent: agent.name.clone(),
                        input: current,
                        output: output.clone(),
                    });
                    current = output;
                }
                Err(source) => {
                    warn!(stage = stage_index, agent = %agent.name, error = %source, "Chain stage failed");
                    return Err(ChainError {
                        stage_index,
                        agent: agent.name.clone(),
                        source,
                        completed: stages,
                    });
                }
            }
        }

        info!(stages = stages.len(), "Chain complete");
        Ok(ChainOutcome {
            input: input.to_string(),
            stages,
        })
    }

    /// Runs a job to completion under its strategy.
    pub async fn run_job(&self, job: OrchestrationJob) -> JobReport {
        self.execute(job, None).await
    }

    /// Starts every item at once.
    pub async fn fan_out(&self, items: Vec<TaskRequest>) -> JobReport {
        self.run_job(OrchestrationJob::new(items, Strategy::ConcurrentFanOut))
            .await
    }

    /// Runs items in batches sized by `max_concurrent`, pausing between batches.
    pub async fn bounded_batch(&self, items: Vec<TaskRequest>) -> JobReport {
        self.run_job(OrchestrationJob::new(items, self.config.batch_strategy()))
            .await
    }

    /// Runs `job` in the background, reporting each item as it finishes.
    ///
    /// Events arrive in completion order; the report from the handle is
    /// index-aligned with the job's items.
    pub fn stream(
        &self,
        job: OrchestrationJob,
    ) -> (mpsc::Receiver<ProgressEvent>, JoinHandle<JobReport>) {
        let (tx, rx) = mpsc::channel(job.items.len().max(1));
        let this = self.clone();
        let handle = tokio::spawn(async move { this.execute(job, Some(tx)).await });
        (rx, handle)
    }

    /// Asks one agent the same query from several perspectives concurrently.
    ///
    /// Returns `(perspective, result)` pairs in the order given.
    pub async fn multi_perspective<S: AsRef<str>>(
        &self,
        agent: &AgentDescriptor,
        query: &str,
        perspectives: &[S],
    ) -> Vec<(String, ItemResult)> {
        let prompts = perspectives
            .iter()
            .map(|p| perspective_prompt(p.as_ref(), query));
        let job = OrchestrationJob::for_agent(agent, prompts, Strategy::ConcurrentFanOut);
        let report = self.run_job(job).await;

        perspectives
            .iter()
            .map(|p| p.as_ref().to_string())
            .zip(report.results)
            .collect()
    }

    /// Runs the two-stage chain `first -> second` for every input concurrently.
    ///
    /// An input's second stage starts as soon as its own first stage is done.
    pub async fn pipelined<S: AsRef<str>>(
        &self,
        first: &AgentDescriptor,
        second: &AgentDescriptor,
        inputs: &[S],
    ) -> JobReport {
        let started = Instant::now();
        let stages = [first.clone(), second.clone()];
        let stages = &stages;

        let results = join_all(inputs.iter().map(|input| async move {
            self.chain(stages, input.as_ref())
                .await
                .map(|outcome| outcome.output().to_string())
                .map_err(|e| ErrorInfo::from(&e))
        }))
        .await;

        let report = JobReport::new(results, started.elapsed());
        info!(summary = %report.summary(), "Pipelined chains finished");
        report
    }

    async fn execute(
        &self,
        job: OrchestrationJob,
        progress: Option<mpsc::Sender<ProgressEvent>>,
    ) -> JobReport {
        let started = Instant::now();
        let total = job.items.len();
        let (batch_size, delay) = match job.strategy {
            Strategy::Sequential => (1, Duration::ZERO),
            Strategy::ConcurrentFanOut => (total.max(1), Duration::ZERO),
            Strategy::BoundedBatch {
                max_concurrent,
                inter_batch_delay,
            } => (max_concurrent.max(1), inter_batch_delay),
        };

        info!(strategy = %job.strategy, items = total, "Job starting");

        let items = &job.items;
        let mut slots: Vec<Option<ItemResult>> = vec![None; total];
        let mut completed = 0;

        for (batch_index, batch) in items.chunks(batch_size).enumerate() {
            if batch_index > 0 && !delay.is_zero() {
                debug!(batch = batch_index, delay_ms = delay.as_millis() as u64, "Pausing between batches");
                tokio::time::sleep(delay).await;
            }

            let offset = batch_index * batch_size;
            let mut pending: FuturesUnordered<_> = batch
                .iter()
                .enumerate()
                .map(|(i, item)| async move {
                    let result = self
                        .call(&item.agent, &item.input)
                        .await
                        .map_err(|e| ErrorInfo::from(&e));
                    (offset + i, result)
                })
                .collect();

            while let Some((index, result)) = pending.next().await {
                completed += 1;
                let item = &items[index];
                if let Err(e) = &result {
                    warn!(
                        index,
                        request_id = %item.request_id,
                        agent = %item.agent.name,
                        error = %e,
                        "Job item failed"
                    );
                }
                if let Some(tx) = &progress {
                    let event = ProgressEvent {
                        index,
                        request_id: item.request_id,
                        agent: item.agent.name.clone(),
                        result: result.clone(),
                        completed,
                        total,
                    };
                    if tx.send(event).await.is_err() {
                        debug!("Progress receiver dropped");
                    }
                }
                slots[index] = Some(result);
            }
        }

        let results = slots
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| Err(ErrorInfo::new("internal", "item produced no result")))
            })
            .collect();
        let report = JobReport::new(results, started.elapsed());
        info!(strategy = %job.strategy, summary = %report.summary(), "Job finished");
        report
    }
}
