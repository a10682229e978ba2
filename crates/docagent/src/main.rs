use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use docagent::{
    default_config_path, init_logging, load_config, resolve_api_key, Config, FsFileStore,
    HttpGenerationClient, JobService, JobSnapshot, JobStatus, LogFormat,
};
use log::{info, warn};

#[derive(Parser)]
#[command(name = "docagent", about = "Run bulk document generation jobs", version)]
struct Cli {
    #[arg(long, value_enum, default_value_t = LogFormat::Plain, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a job and wait until it finishes.
    Run {
        /// Config file (defaults to the platform config directory).
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        project: String,

        /// JSON file holding the agent configuration.
        #[arg(long)]
        agent: PathBuf,

        /// Status polling interval in milliseconds.
        #[arg(long, default_value_t = 500)]
        poll_ms: u64,

        /// Files to process, in order.
        #[arg(required = true)]
        file_ids: Vec<String>,
    },
    /// Validate a config file and exit.
    CheckConfig {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn resolve_config_path(path: Option<PathBuf>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    path.or_else(default_config_path)
        .ok_or_else(|| "no --config given and no platform config directory found".into())
}

fn read_agent_config(path: &Path) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read agent config '{}': {}", path.display(), e))?;
    Ok(serde_json::from_str(&content)?)
}

fn build_service(config: &Config) -> Result<JobService, Box<dyn std::error::Error>> {
    let api_key = resolve_api_key(&config.generation)?;
    let client = HttpGenerationClient::new(&config.generation, api_key)?;
    let store = FsFileStore::new(config.projects_path());
    Ok(JobService::from_config(config, Arc::new(store), Arc::new(client)))
}

async fn wait_for_job(
    service: &JobService,
    job_id: &str,
    poll: Duration,
) -> Result<JobSnapshot, Box<dyn std::error::Error>> {
    let mut last_processed = usize::MAX;
    let mut cancel_sent = false;

    loop {
        let snapshot = service.get_status(job_id)?;
        if snapshot.processed_count != last_processed {
            info!(
                "{}: {}/{} files ({}%)",
                snapshot.status,
                snapshot.processed_count,
                snapshot.total_files,
                snapshot.progress_percent
            );
            last_processed = snapshot.processed_count;
        }
        if snapshot.is_finished() {
            return Ok(snapshot);
        }

        tokio::select! {
            _ = tokio::time::sleep(poll) => {},
            signal = tokio::signal::ctrl_c(), if !cancel_sent => {
                signal?;
                warn!("Interrupted, cancelling job {} after the current file", job_id);
                if let Err(e) = service.cancel(job_id) {
                    warn!("Cancel failed: {}", e);
                }
                cancel_sent = true;
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.log_format)?;

    match cli.command {
        Command::CheckConfig { config } => {
            let path = resolve_config_path(config)?;
            load_config(&path)?;
            println!("{}: OK", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Run {
            config,
            project,
            agent,
            poll_ms,
            file_ids,
        } => {
            let path = resolve_config_path(config)?;
            let config = load_config(&path)?;
            let agent_config = read_agent_config(&agent)?;
            let service = build_service(&config)?;

            let retention = config
                .jobs
                .retention()
                .ok_or("jobs.retention_hours is out of range")?;
            let reaper = service.reaper(retention, config.jobs.reap_interval());
            let reaper_handle = reaper.start();

            let job_id = service.submit(&project, file_ids, Some(agent_config))?;
            info!("Started job {}", job_id);

            let snapshot = wait_for_job(&service, &job_id, Duration::from_millis(poll_ms)).await;

            reaper.stop();
            let _ = reaper_handle.await;

            let snapshot = snapshot?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);

            Ok(match snapshot.status {
                JobStatus::Error => ExitCode::FAILURE,
                _ => ExitCode::SUCCESS,
            })
        }
    }
}
