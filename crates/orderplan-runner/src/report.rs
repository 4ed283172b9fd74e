//! Human-readable replay reports.

use std::fmt::Write;

use orderplan_core::{StepResult, StepStatus};
use orderplan_engine::ReplayReport;
use orderplan_planner::PlanCheck;

/// Render a replay report as plain text.
pub fn render_text(report: &ReplayReport, check: &PlanCheck) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Plan: {} steps", report.steps);
    if !check.is_clean() {
        let _ = writeln!(out, "Pre-flight: {} issue(s)", check.issues.len());
        for issue in &check.issues {
            let _ = writeln!(
                out,
                "  [{}] {}: {}",
                issue.step_id, issue.operation, issue.error.message
            );
        }
    }
    if !check.ends_with_completion && report.steps > 0 {
        let _ = writeln!(out, "Pre-flight: plan does not end with instructionsComplete");
    }

    for run in &report.runs {
        let outcome = &run.outcome;
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Context {}: {} ({}/{} succeeded) digest {}",
            run.context,
            outcome.state,
            outcome.trace.succeeded().len(),
            report.steps,
            &outcome.trace_digest[..12]
        );
        for result in outcome.trace.iter() {
            let _ = writeln!(out, "  {}", step_line(result));
        }
    }

    let _ = writeln!(out);
    let divergence = report.divergence();
    if divergence.is_empty() {
        let _ = writeln!(out, "No divergent steps");
    } else {
        let ids: Vec<String> = divergence.iter().map(|d| d.step_id.to_string()).collect();
        let _ = writeln!(out, "Divergent steps: {}", ids.join(", "));
    }
    let _ = write!(
        out,
        "Generalizes: {}",
        if report.generalizes() { "yes" } else { "no" }
    );
    out
}

fn step_line(result: &StepResult) -> String {
    let head = format!("[{}] {}", result.step_id, result.operation);
    match result.status {
        StepStatus::Succeeded => format!("{head} succeeded"),
        StepStatus::Failed => {
            let message = result
                .error
                .as_ref()
                .map(|e| e.message.as_str())
                .unwrap_or("unknown error");
            format!("{head} failed: {message}")
        }
        StepStatus::Skipped => match result.blocked_by {
            Some(id) => format!("{head} skipped (blocked by step {id})"),
            None => format!("{head} skipped"),
        },
    }
}
