//! Command line entry point.
//!
//! Player links go to stdout, logs to stderr.

use crate::adapters::bitmovin::BitmovinClient;
use crate::adapters::memory::InMemoryApi;
use crate::application::{EncodingWorkflow, WorkflowError, WorkflowReport};
use crate::config::WorkflowConfig;
use crate::domain::demo::DemoUrls;
use crate::error::AppError;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Debug, Parser)]
#[command(
    name = "bitmovin-vod",
    version,
    about = "Encode one source file into DASH and HLS renditions"
)]
pub struct Cli {
    /// Read configuration from this file instead of `.env`
    #[arg(long, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    /// Run against an in-memory service and print every call it received
    #[arg(long)]
    pub dry_run: bool,

    /// Override BITMOVIN_API_URL
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,
}

pub async fn run(cli: Cli) -> Result<WorkflowReport, AppError> {
    let mut config = match &cli.env_file {
        Some(path) => WorkflowConfig::from_env_file(path)?,
        None => WorkflowConfig::from_env()?,
    };
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }

    let result = if cli.dry_run {
        info!("dry run, nothing is sent to the remote service");
        let workflow = EncodingWorkflow::new(InMemoryApi::new(), config);
        let result = workflow.run().await;
        for (index, call) in workflow.api().calls().await.iter().enumerate() {
            println!("{:>3}. {}", index + 1, call);
        }
        result
    } else {
        let client = BitmovinClient::new(config.api.require_key()?, config.api.base_url.clone())?;
        info!(url = %client.base_url(), "using remote service");
        EncodingWorkflow::new(client, config).run().await
    };

    let report = result.map_err(|err| {
        log_failure(&err);
        err
    })?;
    print_demo_urls(&report.demo);
    Ok(report)
}

fn log_failure(err: &WorkflowError) {
    error!(
        stage = %err.stage,
        call = err.call,
        retryable = err.is_retryable(),
        "workflow stopped"
    );
    for resource in &err.created {
        warn!(kind = %resource.kind, id = %resource.id, "resource left on remote service");
    }
}

fn print_demo_urls(demo: &DemoUrls) {
    println!("Test DASH:");
    println!("{}", demo.dash);
    println!("Test HLS:");
    println!("{}", demo.hls);
}
