//! Resource recommendation and service status commands

use anyhow::Result;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_saving, color_status, format_cpu, format_memory, format_timestamp, print_json,
    print_table, print_warning, OutputFormat,
};

/// Row for recommendations table
#[derive(Tabled)]
struct RecommendationRow {
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Pod")]
    pod: String,
    #[tabled(rename = "Container")]
    container: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "CPU Saving")]
    cpu_saving: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Mem Saving")]
    memory_saving: String,
    #[tabled(rename = "Samples")]
    samples: usize,
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

/// Show per-container recommendations
pub async fn show_recommendations(
    client: &ApiClient,
    namespace: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let recommendations = client.recommendations(namespace.as_deref()).await?;

    match format {
        OutputFormat::Json => print_json(&recommendations)?,
        OutputFormat::Table => {
            if recommendations.is_empty() {
                print_warning("No recommendations yet; containers need more samples");
                return Ok(());
            }

            let rows: Vec<RecommendationRow> = recommendations
                .iter()
                .map(|r| RecommendationRow {
                    namespace: r.namespace.clone(),
                    pod: r.pod.clone(),
                    container: r.container.clone(),
                    cpu: format!(
                        "{} → {}",
                        format_cpu(r.current_cpu as u64),
                        format_cpu(r.suggested_cpu as u64)
                    ),
                    cpu_saving: color_saving(r.cpu_saving_percent),
                    memory: format!(
                        "{} → {}",
                        format_memory(r.current_memory as u64),
                        format_memory(r.suggested_memory as u64)
                    ),
                    memory_saving: color_saving(r.memory_saving_percent),
                    samples: r.sample_count,
                })
                .collect();

            print_table(rows);
            println!("\nTotal: {} containers", recommendations.len());
        }
    }

    Ok(())
}

/// Show aggregate savings across all recommended containers
pub async fn show_savings(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let summary = client.summary().await?;

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => {
            let row = |metric: &'static str, value: String| SummaryRow { metric, value };
            print_table(vec![
                row("Containers", summary.containers.to_string()),
                row("Optimizable", summary.optimized_containers.to_string()),
                row("Skipped (too few samples)", summary.skipped_containers.to_string()),
                row("Avg CPU saving", color_saving(summary.average_cpu_saving_percent)),
                row("Avg memory saving", color_saving(summary.average_memory_saving_percent)),
                row(
                    "CPU requested",
                    format!(
                        "{} → {}",
                        format_cpu(summary.total_current_cpu),
                        format_cpu(summary.total_suggested_cpu)
                    ),
                ),
                row(
                    "Memory requested",
                    format!(
                        "{} → {}",
                        format_memory(summary.total_current_memory),
                        format_memory(summary.total_suggested_memory)
                    ),
                ),
            ]);
        }
    }

    Ok(())
}

/// Show backend status and the active run
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            println!("Backend:    {}", client.base_url());
            println!("Service:    {}", health.service);
            println!("Status:     {}", color_status(&health.status));
            println!(
                "Active run: {}",
                health.active_run.as_deref().unwrap_or("none")
            );
            println!("Checked at: {}", format_timestamp(&health.timestamp));
        }
    }

    Ok(())
}
