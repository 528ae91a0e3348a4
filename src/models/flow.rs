//! Flows and their execution results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::response::RequestResponse;

/// One step of a flow, referencing a request by id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStep {
    pub request_id: String,
    #[serde(default = "default_enabled")]
    pub is_enabled: bool,
    #[serde(default)]
    pub continue_on_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_before_execution_ms: Option<u64>,
    pub order: i32,
}

fn default_enabled() -> bool {
    true
}

impl FlowStep {
    pub fn new(request_id: impl Into<String>, order: i32) -> Self {
        Self {
            request_id: request_id.into(),
            is_enabled: true,
            continue_on_error: false,
            delay_before_execution_ms: None,
            order,
        }
    }
}

/// Ordered sequence of request executions sharing transient variables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flow {
    pub id: String,
    pub name: String,
    /// Collection used for variable scoping; the environment is chosen per run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
    #[serde(default)]
    pub steps: Vec<FlowStep>,
}

impl Flow {
    /// Steps sorted by ascending order; ties keep their list position
    pub fn ordered_steps(&self) -> Vec<&FlowStep> {
        let mut steps: Vec<&FlowStep> = self.steps.iter().collect();
        steps.sort_by_key(|s| s.order);
        steps
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Running,
    Success,
    Failed,
    FailedContinued,
    Skipped,
}

impl StepStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, StepStatus::Failed | StepStatus::FailedContinued)
    }
}

/// Outcome of one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowStepResult {
    pub order: i32,
    pub request_id: String,
    /// Empty when the request could not be loaded
    pub request_name: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<RequestResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Outcome of a whole flow run; built per call and never persisted here
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowExecutionResult {
    pub flow_id: String,
    pub flow_name: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub status: FlowStatus,
    pub steps: Vec<FlowStepResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl FlowExecutionResult {
    pub fn start(flow_id: impl Into<String>, flow_name: impl Into<String>) -> Self {
        Self {
            flow_id: flow_id.into(),
            flow_name: flow_name.into(),
            started_at: Utc::now(),
            finished_at: None,
            status: FlowStatus::Running,
            steps: Vec::new(),
            error_message: None,
        }
    }

    /// Close the run with a terminal status
    pub fn finish(mut self, status: FlowStatus, error_message: Option<String>) -> Self {
        self.status = status;
        self.error_message = error_message;
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }

    pub fn count(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }
}
