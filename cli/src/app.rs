use crate::args::{Cli, OutputFormat};
use crate::config::{self, ResourceSource, RunSettings};
use crate::error::{AppError, RunStatus};
use crate::logger;
use crate::prompt;
use crate::report::{self, SweepReport};
use chrono::Utc;
use std::io;
use std::sync::Arc;
use sweeper_engine::ResourceProvider;
use sweeper_engine::cleanup::{ConsoleSink, ConsoleStream, ProgressSink, RunSummary, Sweeper};
use sweeper_engine::provider::InMemoryProvider;
use tokio_util::sync::CancellationToken;

/// Asks the operator to confirm deleting the given number of resources.
/// Runs on a blocking thread.
pub type Confirmation = Box<dyn FnOnce(usize) -> io::Result<bool> + Send>;

/// Confirmation read from the terminal. The prompt goes to stderr when stdout
/// carries JSON.
pub fn terminal_confirmation(format: OutputFormat) -> Confirmation {
    Box::new(move |count| {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        match format {
            OutputFormat::Text => prompt::confirm_deletion(count, &mut input, &mut io::stdout()),
            OutputFormat::Json => prompt::confirm_deletion(count, &mut input, &mut io::stderr()),
        }
    })
}

/// Load configuration, install the logger and run a cleanup end to end.
pub async fn run(cli: Cli) -> Result<RunStatus, AppError> {
    let mut app_config = config::load_config(cli.config.as_deref())?;
    app_config.apply_cli(&cli);

    if let Err(e) = logger::setup_logger(app_config.logging()) {
        eprintln!("Warning: Failed to initialize logger: {e}");
    }

    let settings = app_config.validate()?;
    let provider = build_provider(&settings.source).await?;
    let confirm = terminal_confirmation(cli.format);
    execute(&cli, settings, provider, confirm, CancellationToken::new()).await
}

/// Run a cleanup against an already built provider.
///
/// `confirm` is consulted unless `--yes` is set or nothing matched. Ctrl-C
/// cancels `cancel_token` once deletion starts.
pub async fn execute(
    cli: &Cli,
    settings: RunSettings,
    provider: Arc<dyn ResourceProvider>,
    confirm: Confirmation,
    cancel_token: CancellationToken,
) -> Result<RunStatus, AppError> {
    // With JSON output, stdout carries only the report
    let stream = match cli.format {
        OutputFormat::Text => ConsoleStream::Stdout,
        OutputFormat::Json => ConsoleStream::Stderr,
    };
    let sink: Arc<dyn ProgressSink> = Arc::new(ConsoleSink::new(stream));

    let sweeper = Sweeper::new(provider, settings.cleanup.clone())?
        .with_sink(sink.clone())
        .with_cancel_token(cancel_token.clone());

    let started_at = Utc::now();
    let report = SweepReport::new(
        sweeper.provider_name(),
        settings.filter.to_string(),
        started_at,
    );
    log::info!(
        "Run {} against {} with filter '{}'",
        report.run_id,
        report.provider,
        report.filter
    );

    sink.emit(&format!("Scanning {}...", report.provider));
    let plan = sweeper.plan(&settings.filter).await?;

    if !plan.is_empty() {
        sink.emit(&format!("\nTotal found: {} resources", plan.matched().len()));
        for name in plan.matched() {
            if cli.dry_run {
                sink.emit(&format!("  {name}"));
            } else {
                log::debug!("Matched {name}");
            }
        }
    }

    if cli.dry_run {
        let summary = RunSummary {
            total_listed: plan.total_listed(),
            total_discovered: plan.matched().len(),
            total_batches: plan.total_batches(),
            ..RunSummary::default()
        };
        let planned = plan.matched().to_vec();
        drop(plan);

        if planned.is_empty() {
            sink.emit(&format!(
                "No resources found matching '{}'. Nothing to do.",
                settings.filter
            ));
        } else {
            sink.emit("Dry run: nothing deleted.");
        }
        let report = report
            .with_planned(planned)
            .with_summary(summary, RunStatus::Success.code());
        finish(cli, &report)?;
        return Ok(RunStatus::Success);
    }

    if !plan.is_empty() && !cli.yes {
        let count = plan.matched().len();
        let confirmed = tokio::task::spawn_blocking(move || confirm(count))
            .await
            .map_err(|e| AppError::Prompt(io::Error::other(e)))?
            .map_err(AppError::Prompt)?;

        if !confirmed {
            drop(plan);
            sink.emit("Cancelled.");
            log::info!("Operator declined deletion");
            return Ok(RunStatus::Success);
        }
    }

    let interrupt = spawn_interrupt_handler(cancel_token.clone());
    let summary = plan.execute().await;
    interrupt.abort();

    let status = RunStatus::from_summary(&summary);
    let report = report.with_summary(summary, status.code());
    finish(cli, &report)?;
    Ok(status)
}

async fn build_provider(source: &ResourceSource) -> Result<Arc<dyn ResourceProvider>, AppError> {
    match source {
        ResourceSource::CloudWatch { region } => Ok(Arc::new(
            sweeper_engine::provider::CloudWatchLogsProvider::from_env(region.clone()).await,
        )),
        ResourceSource::File(path) => {
            let provider =
                InMemoryProvider::from_file(path).map_err(|source| AppError::NamesFile {
                    path: path.clone(),
                    source,
                })?;
            Ok(Arc::new(provider))
        }
    }
}

/// Cancel the run on Ctrl-C. Installed only once deletion starts so an
/// interrupt at the prompt still terminates the process.
fn spawn_interrupt_handler(cancel_token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, cancelling cleanup");
            cancel_token.cancel();
        }
    })
}

fn finish(cli: &Cli, report: &SweepReport) -> Result<(), AppError> {
    if let Some(path) = &cli.report {
        report::write_report(path, report)?;
    }
    if cli.format == OutputFormat::Json {
        println!("{}", report.to_json()?);
    }
    Ok(())
}
