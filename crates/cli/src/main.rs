// SPDX-License-Identifier: MIT

//! `stratum`: the operator CLI (§10.5) — thin wrappers over the same store
//! handle the `stratumd` server process uses, talking to it over the
//! length-prefixed IPC protocol defined in `stratum-wire`.

mod client;
mod exit_error;
mod output;
mod server_process;

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use client::DaemonClient;
use exit_error::ExitError;
use output::{
    print_ack, print_job_list, print_job_status, print_job_submitted, print_server_list, OutputFormat,
};
use stratum_wire::{JobSubmission, SlicedSubmission};

#[derive(Parser)]
#[command(name = "stratum", about = "Operator CLI for the Stratum batch-processing daemon")]
struct Cli {
    /// Print machine-readable JSON instead of a human table
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Manage jobs
    Job(JobArgs),
    /// Manage the stratumd server process
    Server(ServerArgs),
    /// Inspect the effective configuration
    Config(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the config stratumd would load right now (file + env overrides)
    Show,
}

#[derive(Args)]
struct JobArgs {
    #[command(subcommand)]
    command: JobCommand,
}

#[derive(Subcommand)]
enum JobCommand {
    /// Submit a new job
    Submit {
        /// Registered worker class name
        class_name: String,
        /// Perform method name (default: "perform")
        #[arg(long, default_value = "perform")]
        perform_method: String,
        /// JSON-encoded arguments array, e.g. '[1,"two"]'
        #[arg(long)]
        arguments: Option<String>,
        /// Priority, 1 (highest) .. 100 (lowest)
        #[arg(long, default_value = "50")]
        priority: u8,
        /// Submit as a sliced job
        #[arg(long)]
        sliced: bool,
        /// Slice size for sliced jobs
        #[arg(long, default_value = "100")]
        slice_size: usize,
        /// Compress sliced payloads
        #[arg(long)]
        compress: bool,
        /// Encrypt sliced payloads
        #[arg(long)]
        encrypt: bool,
        /// Cap on simultaneously running slices
        #[arg(long)]
        max_active_workers: Option<u32>,
        /// Collect worker output
        #[arg(long)]
        collect_output: bool,
        /// Destroy the job once completed
        #[arg(long)]
        destroy_on_complete: bool,
        /// Re-run indefinitely on completion
        #[arg(long)]
        repeatable: bool,
        /// Optional exclusivity group name
        #[arg(long)]
        group: Option<String>,
    },
    /// Show a job's status
    Status { id: String },
    /// List jobs
    List,
    /// Retry a failed job
    Retry { id: String },
    /// Abort a job
    Abort { id: String },
    /// Pause a running job
    Pause { id: String },
    /// Resume a paused job
    Resume { id: String },
}

#[derive(Args)]
struct ServerArgs {
    #[command(subcommand)]
    command: ServerCommand,
}

#[derive(Subcommand)]
enum ServerCommand {
    /// Start the stratumd server process
    Start {
        /// Run in the foreground instead of spawning in the background
        #[arg(long)]
        foreground: bool,
    },
    /// Stop the running stratumd server process
    Stop,
    /// List live servers and their heartbeats
    Status,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let format = cli.format();

    match dispatch(cli.command, format).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            let code = err.downcast_ref::<ExitError>().map(|e| e.code).unwrap_or(1);
            eprintln!("stratum: {err}");
            std::process::ExitCode::from(code as u8)
        }
    }
}

async fn dispatch(command: Command, format: OutputFormat) -> Result<()> {
    match command {
        Command::Job(args) => job(args, format).await,
        Command::Server(args) => server(args, format).await,
        Command::Config(args) => config(args, format).await,
    }
}

async fn config(args: ConfigArgs, format: OutputFormat) -> Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let paths = stratum_daemon::lifecycle::Paths::resolve().map_err(|e| ExitError::new(1, e.to_string()))?;
            let config =
                stratum_daemon::lifecycle::load_effective_config(&paths).map_err(|e| ExitError::new(1, e.to_string()))?;
            match format {
                OutputFormat::Text => {
                    println!("max_worker_threads:       {}", config.max_worker_threads);
                    println!("heartbeat_seconds:        {}", config.heartbeat_seconds);
                    println!("max_poll_seconds:         {}", config.max_poll_seconds);
                    println!("re_check_seconds:         {}", config.re_check_seconds);
                    println!("inline_mode:              {}", config.inline_mode);
                    println!("reload_every_n_heartbeats:{}", config.reload_every_n_heartbeats);
                    println!("log_level:                {}", config.log_level);
                }
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
            }
            Ok(())
        }
    }
}

async fn job(args: JobArgs, format: OutputFormat) -> Result<()> {
    let client = DaemonClient::resolve().map_err(daemon_error)?;
    match args.command {
        JobCommand::Submit {
            class_name,
            perform_method,
            arguments,
            priority,
            sliced,
            slice_size,
            compress,
            encrypt,
            max_active_workers,
            collect_output,
            destroy_on_complete,
            repeatable,
            group,
        } => {
            let arguments = match arguments {
                Some(raw) => serde_json::from_str(&raw).map_err(|e| anyhow!("invalid --arguments JSON: {e}"))?,
                None => vec![],
            };
            let submission = JobSubmission {
                class_name,
                perform_method,
                arguments,
                priority,
                run_at_epoch_ms: None,
                expires_at_epoch_ms: None,
                collect_output,
                destroy_on_complete,
                repeatable,
                group,
                sliced: sliced.then_some(SlicedSubmission {
                    compress,
                    encrypt,
                    slice_size,
                    max_active_workers,
                    collect_nil_output: false,
                }),
            };
            let id = client.submit_job(submission).await.map_err(daemon_error)?;
            print_job_submitted(format, &id)
        }
        JobCommand::Status { id } => {
            let status = client.job_status(&id).await.map_err(daemon_error)?;
            print_job_status(format, &status)
        }
        JobCommand::List => {
            let jobs = client.list_jobs().await.map_err(daemon_error)?;
            print_job_list(format, &jobs)
        }
        JobCommand::Retry { id } => {
            client.retry_job(&id).await.map_err(daemon_error)?;
            print_ack(format, "retried", &id)
        }
        JobCommand::Abort { id } => {
            client.abort_job(&id).await.map_err(daemon_error)?;
            print_ack(format, "aborted", &id)
        }
        JobCommand::Pause { id } => {
            client.pause_job(&id).await.map_err(daemon_error)?;
            print_ack(format, "paused", &id)
        }
        JobCommand::Resume { id } => {
            client.resume_job(&id).await.map_err(daemon_error)?;
            print_ack(format, "resumed", &id)
        }
    }
}

async fn server(args: ServerArgs, format: OutputFormat) -> Result<()> {
    match args.command {
        ServerCommand::Start { foreground: true } => {
            let status = server_process::start_foreground().map_err(|e| anyhow!("{e}"))?;
            if !status.success() {
                return Err(ExitError::new(1, format!("stratumd exited with {status}")).into());
            }
            Ok(())
        }
        ServerCommand::Start { foreground: false } => {
            server_process::start_background().map_err(|e| anyhow!("{e}"))?;
            println!("stratumd started");
            Ok(())
        }
        ServerCommand::Stop => match server_process::stop().map_err(|e| anyhow!("{e}"))? {
            true => {
                println!("stratumd stopped");
                Ok(())
            }
            false => {
                println!("stratumd not running");
                Ok(())
            }
        },
        ServerCommand::Status => {
            let client = DaemonClient::resolve().map_err(daemon_error)?;
            let servers = client.server_status().await.map_err(daemon_error)?;
            print_server_list(format, &servers)
        }
    }
}

fn daemon_error(err: client::ClientError) -> anyhow::Error {
    ExitError::new(1, format!("{err}")).into()
}
