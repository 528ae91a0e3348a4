//! Rendering flow results for the terminal and for machines

use crate::models::{FlowExecutionResult, FlowStatus, StepStatus};

/// Human-readable summary of a flow run
pub fn format_flow_result(result: &FlowExecutionResult) -> String {
    let mut output = String::new();
    output.push_str("\n═══════════════════════════════════════════════════════════════════\n");
    output.push_str(&format!("  FLOW: {}\n", result.flow_name));
    output.push_str("═══════════════════════════════════════════════════════════════════\n\n");

    for step in &result.steps {
        let icon = match step.status {
            StepStatus::Success => "✓",
            StepStatus::Skipped => "⊘",
            StepStatus::FailedContinued => "!",
            StepStatus::Failed => "✗",
            StepStatus::Running => "…",
        };
        let name = if step.request_name.is_empty() {
            step.request_id.as_str()
        } else {
            step.request_name.as_str()
        };

        let status = match step.response {
            Some(ref r) if step.status != StepStatus::Skipped => r.status_code.to_string(),
            _ if step.status == StepStatus::Skipped => "SKIPPED".to_string(),
            _ => "---".to_string(),
        };
        output.push_str(&format!("  {} Step {}: {} ({})\n", icon, step.order, name, status));

        if let Some(ref response) = step.response {
            if let Some(ref sent) = response.sent_request {
                output.push_str(&format!("      {} {}\n", sent.method, sent.url));
            }
            output.push_str(&format!("      Time: {}ms\n", response.elapsed_ms));
        }
        if let Some(ref error) = step.error_message {
            output.push_str(&format!("      Error: {}\n", error));
        }
        output.push('\n');
    }

    let failed = result.steps.iter().filter(|s| s.status.is_failure()).count();
    output.push_str("───────────────────────────────────────────────────────────────────\n");
    output.push_str(&format!(
        "  Status: {} | Steps: {} | Passed: {} | Failed: {} | Skipped: {}",
        status_label(result.status),
        result.steps.len(),
        result.count(StepStatus::Success),
        failed,
        result.count(StepStatus::Skipped),
    ));
    if let Some(ms) = result.duration_ms() {
        output.push_str(&format!(" | {}ms", ms));
    }
    output.push('\n');
    if let Some(ref message) = result.error_message {
        output.push_str(&format!("  {}\n", message));
    }
    output.push_str("═══════════════════════════════════════════════════════════════════\n");

    output
}

/// The full result as pretty-printed JSON
pub fn format_flow_result_json(result: &FlowExecutionResult) -> String {
    serde_json::to_string_pretty(result).unwrap_or_default()
}

fn status_label(status: FlowStatus) -> &'static str {
    match status {
        FlowStatus::Running => "RUNNING",
        FlowStatus::Completed => "COMPLETED",
        FlowStatus::Failed => "FAILED",
        FlowStatus::Cancelled => "CANCELLED",
    }
}
