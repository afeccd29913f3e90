//! Human-readable rendering for listings and status.

use crate::job::{Job, JobState, QueueStatus};
use crate::timestamps;
use std::fmt::Write;

const RULE_WIDTH: usize = 40;

/// Tabular job listing: id, state, attempts, creation time, command.
pub fn render_job_table(jobs: &[Job]) -> String {
    if jobs.is_empty() {
        return "No jobs found.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<20} {:<10} {:>8}  {:<27} {}",
        "ID", "STATE", "ATTEMPTS", "CREATED", "COMMAND"
    );
    for job in jobs {
        let _ = writeln!(
            out,
            "{:<20} {:<10} {:>8}  {:<27} {}",
            job.id,
            job.state,
            format!("{}/{}", job.attempts, job.max_retries),
            timestamps::to_canonical(job.created_at),
            job.command
        );
    }
    out
}

/// Dead-letter listing: id, attempts, last update, diagnostic.
pub fn render_dlq_table(jobs: &[Job]) -> String {
    if jobs.is_empty() {
        return "Dead-letter queue is empty.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<20} {:>8}  {:<27} {}",
        "ID", "ATTEMPTS", "UPDATED", "ERROR"
    );
    for job in jobs {
        let _ = writeln!(
            out,
            "{:<20} {:>8}  {:<27} {}",
            job.id,
            job.attempts,
            timestamps::to_canonical(job.updated_at),
            job.error_message.as_deref().unwrap_or("-")
        );
    }
    out
}

/// Per-state counts with a total, in enum order.
pub fn render_status(status: &QueueStatus) -> String {
    let mut out = String::new();
    out.push_str("Queue Status:\n");
    let _ = writeln!(out, "{}", "─".repeat(RULE_WIDTH));
    for state in JobState::ALL {
        let _ = writeln!(
            out,
            "  {:<12}: {:>5}",
            capitalize(state.as_str()),
            status.get(state)
        );
    }
    let _ = writeln!(out, "{}", "─".repeat(RULE_WIDTH));
    let _ = writeln!(out, "  {:<12}: {:>5}", "Total", status.total());
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
