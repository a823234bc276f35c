//! End-to-end entry point: text -> intent -> plan -> execution -> summary

use crate::controller::{ControllerFactory, ControllerRegistry, DefaultControllerFactory};
use crate::core::config::AgentConfig;
use crate::core::types::RequestId;
use crate::engine::{CancellationToken, ExecutionEngine, ExecutionSummary};
use crate::intent::{self, Intent};
use crate::llm::{CompletionService, LlmClient};
use crate::plan::ActionPlanner;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Reply when the text names no known application
pub const NEED_APPLICATION: &str =
    "I need to know which app to use. Try something like: use terminal to check disk space";

/// The agent: one planner and one execution engine with its controller cache
pub struct Agent {
    planner: ActionPlanner,
    engine: ExecutionEngine,
}

impl Agent {
    /// Build the stock agent from configuration
    ///
    /// With `use_llm` off, or when the completion client cannot be built,
    /// the planner works from templates alone.
    pub fn new(config: &AgentConfig, use_llm: bool) -> Self {
        let planner = if use_llm {
            match LlmClient::from_config(&config.llm) {
                Ok(Some(client)) => {
                    let service: Arc<dyn CompletionService> = Arc::new(client);
                    ActionPlanner::new(service, config.llm.timeout())
                }
                Ok(None) => {
                    tracing::info!("No completion provider configured, planning from templates only");
                    ActionPlanner::templates_only()
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Completion client unavailable, planning from templates only");
                    ActionPlanner::templates_only()
                }
            }
        } else {
            ActionPlanner::templates_only()
        };

        let factory = Arc::new(DefaultControllerFactory::new(config.execution.clone()));
        Self::with_parts(planner, factory, config.execution.step_timeout())
    }

    /// Assemble an agent from explicit parts
    pub fn with_parts(
        planner: ActionPlanner,
        factory: Arc<dyn ControllerFactory>,
        step_timeout: Duration,
    ) -> Self {
        let registry = Arc::new(ControllerRegistry::new(factory));
        Self {
            planner,
            engine: ExecutionEngine::new(registry, step_timeout),
        }
    }

    pub fn planner(&self) -> &ActionPlanner {
        &self.planner
    }

    pub fn registry(&self) -> &Arc<ControllerRegistry> {
        self.engine.registry()
    }

    /// Handle one instruction and describe what happened
    ///
    /// Never fails; every problem ends up in the returned text.
    pub async fn handle(&self, text: &str) -> String {
        self.handle_cancellable(text, &CancellationToken::new()).await
    }

    /// `handle`, stopping undispatched steps once `cancel` fires
    pub async fn handle_cancellable(&self, text: &str, cancel: &CancellationToken) -> String {
        let span = tracing::info_span!("request", id = %RequestId::new());
        async {
            let intent = intent::extract(text);
            if intent.application().is_none() {
                tracing::info!("No application named in request");
                return NEED_APPLICATION.to_string();
            }
            self.execute_intent(&intent, cancel).await.render()
        }
        .instrument(span)
        .await
    }

    /// Plan and execute an already extracted intent
    pub async fn execute_intent(&self, intent: &Intent, cancel: &CancellationToken) -> ExecutionSummary {
        let Some(application) = intent.application() else {
            return ExecutionSummary::default();
        };

        let plan = self.planner.plan(intent).await;
        tracing::info!(app = %application, steps = plan.len(), "Plan ready");
        self.engine.execute(application, &plan, cancel).await
    }

    /// Close every cached controller
    pub async fn shutdown(&self) {
        self.engine.registry().shutdown().await;
    }
}
