//! Performance-test run commands

use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, LatencySample, Run, StartRequest};
use crate::output::{
    color_status, color_verdict, format_ms, format_percent, format_timestamp, print_info,
    print_json, print_success, print_table, print_warning, OutputFormat,
};

/// Row for runs table
#[derive(Tabled)]
struct RunRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Users")]
    users: u32,
    #[tabled(rename = "Duration")]
    duration: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "p95")]
    p95: String,
    #[tabled(rename = "Failures")]
    failure_rate: String,
    #[tabled(rename = "SLA")]
    verdict: String,
    #[tabled(rename = "Started")]
    started_at: String,
}

impl From<&Run> for RunRow {
    fn from(run: &Run) -> Self {
        RunRow {
            id: truncate_id(&run.id),
            name: run.name.clone(),
            users: run.target_users,
            duration: run.requested_duration.clone(),
            status: color_status(&run.status),
            p95: format_ms(run.p95_latency_ms),
            failure_rate: format_percent(run.failure_rate_percent),
            verdict: color_verdict(run.sla_verdict.as_deref()),
            started_at: format_timestamp(&run.started_at),
        }
    }
}

/// Row for the key/value detail view
#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn field(field: &'static str, value: impl Into<String>) -> FieldRow {
    FieldRow {
        field,
        value: value.into(),
    }
}

/// List every run, newest first
pub async fn list_runs(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let runs = client.list_runs().await?;

    match format {
        OutputFormat::Json => print_json(&runs)?,
        OutputFormat::Table => {
            if runs.is_empty() {
                print_warning("No performance tests found");
                return Ok(());
            }
            print_table(runs.iter().map(RunRow::from).collect::<Vec<_>>());
            println!("\nTotal: {} runs", runs.len());
        }
    }

    Ok(())
}

/// Show one run in full
pub async fn show_run(client: &ApiClient, id: &str, format: OutputFormat) -> Result<()> {
    let run = client.get_run(id).await?;

    match format {
        OutputFormat::Json => print_json(&run)?,
        OutputFormat::Table => print_run_detail(&run),
    }

    Ok(())
}

fn print_run_detail(run: &Run) {
    let mut rows = vec![
        field("ID", run.id.as_str()),
        field("Name", run.name.as_str()),
        field("Target users", run.target_users.to_string()),
        field("Duration", run.requested_duration.as_str()),
        field("Status", color_status(&run.status)),
        field("Started", format_timestamp(&run.started_at)),
    ];
    if let Some(ended) = &run.ended_at {
        rows.push(field("Ended", format_timestamp(ended)));
    }
    rows.push(field("p95 latency", format_ms(run.p95_latency_ms)));
    rows.push(field("Failure rate", format_percent(run.failure_rate_percent)));
    rows.push(field("SLA", color_verdict(run.sla_verdict.as_deref())));
    if let Some(reason) = &run.failure_reason {
        rows.push(field("Failure reason", reason.as_str()));
    }
    print_table(rows);
}

/// Show detailed figures of a completed run
pub async fn show_results(client: &ApiClient, id: &str, format: OutputFormat) -> Result<()> {
    let results = client.run_results(id).await?;

    match format {
        OutputFormat::Json => print_json(&results)?,
        OutputFormat::Table => {
            print_table(vec![
                field("Name", results.name.as_str()),
                field("SLA", color_verdict(results.sla_verdict.as_deref())),
                field("Requests", results.total_requests.to_string()),
                field("Failed", results.failed_requests.to_string()),
                field("Failure rate", format_percent(results.failure_rate_percent)),
                field("p95 latency", format_ms(results.p95_latency_ms)),
                field("Median latency", format_ms(Some(results.median_latency_ms))),
                field("Average latency", format_ms(Some(results.average_latency_ms))),
                field("Min latency", format_ms(Some(results.min_latency_ms))),
                field("Max latency", format_ms(Some(results.max_latency_ms))),
                field("Throughput", format!("{:.1} req/s", results.throughput_rps)),
            ]);
        }
    }

    Ok(())
}

/// Start a new run
pub async fn start_run(
    client: &ApiClient,
    name: String,
    users: i64,
    duration: String,
    format: OutputFormat,
) -> Result<()> {
    let request = StartRequest {
        name,
        users,
        duration,
    };
    let run = client.start_run(&request).await?;

    match format {
        OutputFormat::Json => print_json(&run)?,
        OutputFormat::Table => {
            print_success(&format!("Performance test {} started", run.id));
            print_info(&format!(
                "{} users for {}; stop early with `psctl runs stop`",
                run.target_users, run.requested_duration
            ));
        }
    }

    Ok(())
}

/// Stop the named run, or whichever run is active
pub async fn stop_run(client: &ApiClient, id: Option<String>, format: OutputFormat) -> Result<()> {
    let run = client.stop_run(id).await?;

    match format {
        OutputFormat::Json => print_json(&run)?,
        OutputFormat::Table => {
            match run.sla_verdict.as_deref() {
                Some(_) => print_success(&format!("Performance test {} completed", run.id)),
                None => print_warning(&format!(
                    "Performance test {} ended without a verdict",
                    run.id
                )),
            }
            print_run_detail(&run);
        }
    }

    Ok(())
}

/// Report one latency observation for a running run
pub async fn ingest_sample(
    client: &ApiClient,
    id: &str,
    latency_ms: f64,
    failed: bool,
    format: OutputFormat,
) -> Result<()> {
    let sample = LatencySample {
        latency_ms,
        success: !failed,
    };
    let accepted = client.ingest_sample(id, &sample).await?;

    match format {
        OutputFormat::Json => print_json(&accepted)?,
        OutputFormat::Table => print_success(&format!("{} sample(s) accepted", accepted.accepted)),
    }

    Ok(())
}

/// Truncate ID for display
fn truncate_id(id: &str) -> String {
    if id.len() > 8 {
        format!("{}...", &id[..8])
    } else {
        id.to_string()
    }
}
