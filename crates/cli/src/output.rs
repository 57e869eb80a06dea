// SPDX-License-Identifier: MIT

//! Text vs JSON dual-mode printing (§10.5 `--json`).

use clap::ValueEnum;
use stratum_wire::{JobStatusView, JobSummary, ServerView};

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

pub fn print_job_submitted(format: OutputFormat, id: &str) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => println!("submitted job {id}"),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "id": id }))?),
    }
    Ok(())
}

pub fn print_ack(format: OutputFormat, verb: &str, id: &str) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => println!("{verb} job {id}"),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "id": id, "ok": true }))?)
        }
    }
    Ok(())
}

pub fn print_job_list(format: OutputFormat, jobs: &[JobSummary]) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            if jobs.is_empty() {
                println!("no jobs");
                return Ok(());
            }
            println!("{:<36} {:<24} {:<10} {:>3}  created", "ID", "CLASS", "STATE", "PRI");
            for job in jobs {
                let state = match job.sub_state {
                    Some(sub) => format!("{}/{}", job.state, sub),
                    None => job.state.to_string(),
                };
                println!(
                    "{:<36} {:<24} {:<10} {:>3}  {}",
                    job.id,
                    job.class_name,
                    state,
                    job.priority,
                    format_time_ago(job.created_at_epoch_ms)
                );
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(jobs)?),
    }
    Ok(())
}

pub fn print_job_status(format: OutputFormat, status: &JobStatusView) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            println!("id:               {}", status.id);
            let state = match status.sub_state {
                Some(sub) => format!("{}/{}", status.state, sub),
                None => status.state.to_string(),
            };
            println!("state:            {state}");
            println!("elapsed:          {}s", status.elapsed_seconds);
            println!("percent complete: {}%", status.percent_complete);
            if status.record_count > 0 {
                println!("records:          {}", status.record_count);
                println!("queued slices:    {}", status.queued_slices);
                println!("active slices:    {}", status.active_slices);
                println!("failed slices:    {}", status.failed_slices);
                println!("output slices:    {}", status.output_slices);
                println!("records/hour:     {:.1}", status.records_per_hour);
                if let Some(remaining) = status.estimated_remaining_minutes {
                    println!("eta:              {remaining}m");
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(status)?),
    }
    Ok(())
}

pub fn print_server_list(format: OutputFormat, servers: &[ServerView]) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            if servers.is_empty() {
                println!("no servers");
                return Ok(());
            }
            println!("{:<36} {:<10} {:>6} {:>6}  heartbeat", "NAME", "STATE", "MAX", "ACTIVE");
            for server in servers {
                println!(
                    "{:<36} {:<10} {:>6} {:>6}  {}s ago",
                    server.name, server.state, server.max_threads, server.active_threads, server.heartbeat_age_seconds
                );
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(servers)?),
    }
    Ok(())
}

fn format_time_ago(epoch_ms: u64) -> String {
    let now_ms =
        std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_millis() as u64;
    let elapsed_secs = now_ms.saturating_sub(epoch_ms) / 1000;
    match elapsed_secs {
        0..=59 => format!("{elapsed_secs}s"),
        60..=3599 => format!("{}m", elapsed_secs / 60),
        3600..=86399 => format!("{}h", elapsed_secs / 3600),
        _ => format!("{}d", elapsed_secs / 86400),
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
