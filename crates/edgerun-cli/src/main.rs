//! EdgeRun CLI - Command line interface for the EdgeRun control plane.

use std::collections::HashMap;

use clap::{Parser, Subcommand};

use edgerun_core::protocol::{JobResponse, SubmitJobRequest};

mod client;

use client::ControlPlaneClient;

/// EdgeRun CLI - Control plane management tool
#[derive(Parser)]
#[command(name = "edgerun")]
#[command(about = "CLI for EdgeRun control plane", long_about = None)]
struct Cli {
    /// Control plane address
    #[arg(short, long, env = "EDGERUN_CONTROL_PLANE", default_value = "http://[::1]:8080")]
    addr: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a new job
    Submit {
        /// Task type to run
        #[arg(short, long)]
        task: String,

        /// Arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
    },

    /// Get job status
    Status {
        /// Job ID
        id: String,
    },

    /// List known edge nodes
    Nodes,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = ControlPlaneClient::new(&cli.addr);

    match cli.command {
        Commands::Submit { task, args } => {
            let arguments = parse_arguments(&args)?;
            let job = client.submit(&SubmitJobRequest { task, arguments }).await?;
            println!("Job submitted:");
            print_job(&job);
        }
        Commands::Status { id } => {
            let job = client.job(&id).await?;
            print_job(&job);
        }
        Commands::Nodes => {
            let nodes = client.nodes().await?;
            println!("Nodes ({}):", nodes.len());
            println!("{:<40}  {:<8}  {}", "ADDRESS", "LIVENESS", "LAST HEARTBEAT");
            println!("{}", "-".repeat(80));
            for node in nodes {
                println!(
                    "{:<40}  {:<8}  {}",
                    node.address,
                    node.liveness,
                    node.last_heartbeat.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
    }

    Ok(())
}

fn parse_arguments(raw: &str) -> Result<HashMap<String, serde_json::Value>, String> {
    serde_json::from_str(raw).map_err(|e| format!("--args must be a JSON object: {e}"))
}

fn print_job(job: &JobResponse) {
    println!("  ID:         {}", job.id);
    println!("  Task:       {}", job.task);
    println!("  Status:     {}", job.status);
    println!("  Created:    {}", job.created_at.format("%Y-%m-%d %H:%M:%S"));
    println!("  Updated:    {}", job.updated_at.format("%Y-%m-%d %H:%M:%S"));
    if !job.arguments.is_empty() {
        println!(
            "  Arguments:  {}",
            serde_json::to_string(&job.arguments).unwrap_or_default()
        );
    }
    if let Some(result) = &job.result {
        println!("  Result:     {}", result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        let args = parse_arguments(r#"{"w": 100}"#).unwrap();
        assert_eq!(args.get("w"), Some(&serde_json::json!(100)));
        assert!(parse_arguments("[1, 2]").is_err());
        assert!(parse_arguments("{}").unwrap().is_empty());
    }
}
