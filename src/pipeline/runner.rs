//! Flow execution engine
//!
//! Runs the steps of a flow strictly in ascending order. Each step resolves
//! its request against the stored environment and collection with the flow's
//! [`VariableOverlay`] merged in, executes it, and folds extracted values back
//! into the overlay for later steps. Stored entities are never modified.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::executor::ExecutorFactory;
use crate::extract::apply_extractions;
use crate::models::{
    Collection, Environment, Flow, FlowExecutionResult, FlowStatus, FlowStep, FlowStepResult,
    Request, RequestResponse, StepStatus,
};
use crate::request::resolve_request;
use crate::store::Store;
use super::overlay::VariableOverlay;

/// Executes flows against a store
pub struct FlowRunner {
    store: Store,
    factory: Arc<ExecutorFactory>,
}

/// How a step ended, before the continue-on-error policy is applied
enum StepOutcome {
    Success(RequestResponse),
    Failure(Option<RequestResponse>, String),
    Cancelled,
}

impl FlowRunner {
    pub fn new(store: Store, factory: Arc<ExecutorFactory>) -> Self {
        Self { store, factory }
    }

    /// Load a flow, an environment and the flow's collection, then run it
    ///
    /// Never fails: load errors become a `Failed` result with no steps.
    pub async fn execute(
        &self,
        flow_id: &str,
        environment_id: &str,
        cancel: &CancellationToken,
    ) -> FlowExecutionResult {
        let flow = match self.store.get_flow(flow_id).await {
            Ok(flow) => flow,
            Err(e) => {
                return FlowExecutionResult::start(flow_id, "")
                    .finish(FlowStatus::Failed, Some(e.to_string()));
            }
        };

        let environment = match self.store.load_environment(environment_id).await {
            Ok(environment) => environment,
            Err(e) => {
                return FlowExecutionResult::start(&flow.id, &flow.name)
                    .finish(FlowStatus::Failed, Some(e.to_string()));
            }
        };

        let collection = match flow.collection_id.as_deref() {
            Some(id) => match self.store.load_collection_chain(id).await {
                Ok(collection) => Some(collection),
                Err(e) => {
                    return FlowExecutionResult::start(&flow.id, &flow.name)
                        .finish(FlowStatus::Failed, Some(e.to_string()));
                }
            },
            None => None,
        };

        self.run(&flow, &environment, collection.as_ref(), cancel).await
    }

    /// Run an already loaded flow
    pub async fn run(
        &self,
        flow: &Flow,
        environment: &Environment,
        collection: Option<&Collection>,
        cancel: &CancellationToken,
    ) -> FlowExecutionResult {
        let mut result = FlowExecutionResult::start(&flow.id, &flow.name);
        let mut overlay = VariableOverlay::new(environment, collection);

        info!(
            flow = %flow.id,
            environment = %environment.id,
            steps = flow.steps.len(),
            "starting flow"
        );

        for step in flow.ordered_steps() {
            if cancel.is_cancelled() {
                info!(flow = %flow.id, completed = result.steps.len(), "flow cancelled");
                return result.finish(FlowStatus::Cancelled, None);
            }

            if !step.is_enabled {
                debug!(order = step.order, request = %step.request_id, "step disabled, skipping");
                result
                    .steps
                    .push(step_result(step, String::new(), StepStatus::Skipped, None, None));
                continue;
            }

            if let Some(delay) = step.delay_before_execution_ms.filter(|ms| *ms > 0) {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        info!(flow = %flow.id, order = step.order, "flow cancelled during delay");
                        return result.finish(FlowStatus::Cancelled, None);
                    }
                    _ = tokio::time::sleep(Duration::from_millis(delay)) => {}
                }
            }

            let (request_name, outcome) = self
                .run_step(step, environment, collection, &mut overlay, cancel)
                .await;

            match outcome {
                StepOutcome::Success(response) => {
                    debug!(
                        order = step.order,
                        request = %request_name,
                        status = response.status_code,
                        "step succeeded"
                    );
                    result.steps.push(step_result(
                        step,
                        request_name,
                        StepStatus::Success,
                        Some(response),
                        None,
                    ));
                }
                StepOutcome::Failure(response, message) if step.continue_on_error => {
                    warn!(
                        order = step.order,
                        request = %request_name,
                        error = %message,
                        "step failed, continuing"
                    );
                    result.steps.push(step_result(
                        step,
                        request_name,
                        StepStatus::FailedContinued,
                        response,
                        Some(message),
                    ));
                }
                StepOutcome::Failure(response, message) => {
                    warn!(
                        order = step.order,
                        request = %request_name,
                        error = %message,
                        "step failed, stopping flow"
                    );
                    let flow_message = format!(
                        "Step {} ({}) failed: {}",
                        step.order,
                        display_name(&request_name, step),
                        message
                    );
                    result.steps.push(step_result(
                        step,
                        request_name,
                        StepStatus::Failed,
                        response,
                        Some(message),
                    ));
                    return result.finish(FlowStatus::Failed, Some(flow_message));
                }
                StepOutcome::Cancelled => {
                    info!(flow = %flow.id, order = step.order, "flow cancelled during step");
                    return result.finish(FlowStatus::Cancelled, None);
                }
            }
        }

        info!(
            flow = %flow.id,
            succeeded = result.count(StepStatus::Success),
            failed = result.count(StepStatus::FailedContinued),
            "flow completed"
        );
        result.finish(FlowStatus::Completed, None)
    }

    async fn run_step(
        &self,
        step: &FlowStep,
        environment: &Environment,
        collection: Option<&Collection>,
        overlay: &mut VariableOverlay,
        cancel: &CancellationToken,
    ) -> (String, StepOutcome) {
        let request = match self.store.get_request(&step.request_id).await {
            Ok(request) => request,
            Err(e) => return (String::new(), StepOutcome::Failure(None, e.to_string())),
        };
        let name = request.name().to_string();

        let outcome = match self
            .execute_request(&request, environment, collection, overlay, cancel)
            .await
        {
            Ok(response) => match classify(&response) {
                None => StepOutcome::Success(response),
                Some(message) => StepOutcome::Failure(Some(response), message),
            },
            Err(e) if e.is_cancelled() => StepOutcome::Cancelled,
            Err(e) => StepOutcome::Failure(None, e.to_string()),
        };
        (name, outcome)
    }

    async fn execute_request(
        &self,
        request: &Request,
        environment: &Environment,
        collection: Option<&Collection>,
        overlay: &mut VariableOverlay,
        cancel: &CancellationToken,
    ) -> Result<RequestResponse> {
        let before = overlay.scope(environment, collection);
        let resolved = resolve_request(request, &before.environment, before.collection.as_ref());
        let executor = self.factory.get_executor(&resolved)?;
        let response = executor.execute(&resolved, cancel).await?;

        let mut after = before.snapshot();
        let written = apply_extractions(
            &request.common().extractions,
            &response,
            &mut after.environment,
            after.collection.as_mut(),
        );
        if !written.is_empty() {
            let changed = overlay.fold(&before, &after);
            debug!(
                request = %request.id(),
                variables = ?changed,
                "extracted values added to flow overlay"
            );
        }

        Ok(response)
    }

    /// Non-blocking checks: duplicate step orders and unknown request ids
    pub async fn validate(&self, flow: &Flow) -> Vec<String> {
        let mut warnings = Vec::new();

        if flow.steps.is_empty() {
            warnings.push("Flow has no steps".to_string());
        }

        let mut orders: BTreeMap<i32, usize> = BTreeMap::new();
        for step in &flow.steps {
            *orders.entry(step.order).or_default() += 1;
        }
        for (order, count) in orders.into_iter().filter(|(_, c)| *c > 1) {
            warnings.push(format!("{} steps share order {}; they run in list order", count, order));
        }

        for step in flow.ordered_steps() {
            match self.store.requests.get_by_id(&step.request_id).await {
                Ok(Some(_)) => {}
                Ok(None) => warnings.push(format!(
                    "Step {}: request '{}' not found",
                    step.order, step.request_id
                )),
                Err(e) => warnings.push(format!("Step {}: {}", step.order, e)),
            }
        }

        if let Some(ref id) = flow.collection_id {
            if let Ok(None) = self.store.collections.get_by_id(id).await {
                warnings.push(format!("Collection '{}' not found", id));
            }
        }

        warnings
    }
}

/// `None` for 2xx; otherwise the failure message
///
/// Status 0 means nothing usable came back and always fails, reported with
/// the response's own status message.
pub fn classify(response: &RequestResponse) -> Option<String> {
    if response.status_code == 0 {
        return Some(if response.status_message.is_empty() {
            "No response received".to_string()
        } else {
            response.status_message.clone()
        });
    }
    if response.is_success() {
        return None;
    }
    Some(
        format!("HTTP {} {}", response.status_code, response.status_message)
            .trim_end()
            .to_string(),
    )
}

fn display_name<'a>(request_name: &'a str, step: &'a FlowStep) -> &'a str {
    if request_name.is_empty() {
        &step.request_id
    } else {
        request_name
    }
}

fn step_result(
    step: &FlowStep,
    request_name: String,
    status: StepStatus,
    response: Option<RequestResponse>,
    error_message: Option<String>,
) -> FlowStepResult {
    FlowStepResult {
        order: step.order,
        request_id: step.request_id.clone(),
        request_name,
        status,
        response,
        error_message,
    }
}
