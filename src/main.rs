use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::sync::mpsc;

use kombajn::engine::OsintEngine;
use kombajn::orchestration::PoolEvent;
use kombajn::report::{ReportFormat, ReportGenerator};
use kombajn::{klog, klog_error, Config, Result, Target};

/// Exit code for an interrupted run, 128 + SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

/// kombajn - OSINT tool orchestrator
#[derive(Parser, Debug)]
#[command(name = "kombajn")]
#[command(version, about, long_about = None)]
#[command(
    after_help = "ENVIRONMENT:\n    KOMBAJN_DEBUG=1     Enable debug logging (alternative to --debug)"
)]
struct Cli {
    /// Username to scan (sherlock + maigret); repeatable
    #[arg(short = 'u', long = "username")]
    usernames: Vec<String>,

    /// Email address to scan (holehe); repeatable
    #[arg(short = 'e', long = "email")]
    emails: Vec<String>,

    /// Phone number to scan (phoneinfoga); repeatable
    #[arg(short = 'p', long = "phone")]
    phones: Vec<String>,

    /// File to extract metadata from (exiftool); repeatable
    #[arg(short = 'f', long = "file")]
    files: Vec<PathBuf>,

    /// Report format: html, json, or txt
    #[arg(long, default_value = "html")]
    format: String,

    /// Directory for the generated report (default: ~/.kombajn/results)
    #[arg(short = 'o', long)]
    output_dir: Option<PathBuf>,

    /// Max jobs running at once (overrides config)
    #[arg(short = 'c', long)]
    concurrency: Option<usize>,

    /// Skip report generation, print a summary only
    #[arg(long)]
    no_report: bool,

    /// Enable debug logging (writes to ~/.kombajn/kombajn.log)
    #[arg(short = 'd', long)]
    debug: bool,
}

impl Cli {
    fn targets(&self) -> Vec<Target> {
        let mut targets = Vec::new();
        targets.extend(self.usernames.iter().cloned().map(Target::Username));
        targets.extend(self.emails.iter().cloned().map(Target::Email));
        targets.extend(self.phones.iter().cloned().map(Target::Phone));
        targets.extend(self.files.iter().cloned().map(Target::File));
        targets
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    kombajn::log::init_with_debug(cli.debug);

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            klog_error!("fatal: {}", err);
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let targets = cli.targets();
    if targets.is_empty() {
        eprintln!("error: no targets given; see --help");
        return Ok(ExitCode::FAILURE);
    }

    let format: ReportFormat = cli.format.parse()?;
    let mut config = Config::load()?;
    if let Some(concurrency) = cli.concurrency {
        config.concurrency_limit = concurrency;
    }

    let output_dir = match &cli.output_dir {
        Some(dir) => dir.clone(),
        None => config.output_dir()?,
    };

    let (event_tx, mut event_rx) = mpsc::channel::<PoolEvent>(256);
    let engine = OsintEngine::new(config).with_events(event_tx);
    let jobs = engine.plan(&targets)?;
    println!(
        "Running {} jobs over {} targets...",
        jobs.len(),
        targets.len()
    );

    // ctrl-c cancels the batch; in-flight subprocesses are killed and
    // the run reports whatever had already finished.
    let cancel = engine.cancellation_token();
    let interrupted = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            klog!("interrupt received, cancelling batch");
            eprintln!("\nInterrupted, cancelling...");
            interrupted.cancel();
        }
    });

    let progress = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                PoolEvent::JobStarted { tool, .. } => println!("  [{tool}] started"),
                PoolEvent::JobFinished { tool, outcome, .. } => {
                    println!("  [{tool}] {outcome}")
                }
                PoolEvent::AttemptFinished {
                    tool,
                    attempt,
                    outcome,
                    ..
                } if attempt > 1 => {
                    println!("  [{tool}] retry #{} -> {outcome}", attempt - 1)
                }
                _ => {}
            }
        }
    });

    let (results, metrics) = engine.run(jobs).await?;
    progress.abort();

    let succeeded = results.success_count();
    println!(
        "\nDone: {}/{} jobs succeeded in {} attempts.",
        succeeded,
        results.len(),
        metrics.total_attempts()
    );

    if !cli.no_report {
        let path = ReportGenerator::new(output_dir).write(&results, &metrics, format)?;
        println!("Report: {}", path.display());
    }

    if cancel.is_cancelled() {
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    }
    Ok(if results.any_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
