//! vigil-worker: runs the incident pipeline over a stream of JSON samples.
//!
//! Reads one sample per line from a file or stdin and writes every pipeline
//! event to stdout as a JSON line. Incidents are also rendered and handed to
//! the log notifier. Lines of the form
//! `{"kind":"clear","subjectId":"..."}` acknowledge a latched emergency.
//!
//! When reading stdin, every subject's geofence clock is also ticked on the
//! wall clock each `SAMPLING_INTERVAL_SECS`, so a subject whose device goes
//! quiet outside its zones still escalates. File replays run on the samples'
//! own timestamps.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use vigil_core::{Config, RegistrySource, Sample, VigilError};
use vigil_notify::{Dispatcher, LogNotifier, TemplateRenderer};
use vigil_pipeline::{
    ChannelSink, Engine, EventSink, FanoutSink, NotifyingSink, Pipeline, PipelineEvent,
    PipelineSettings, WorkerPool,
};
use vigil_rules::{AuditLog, RegistryLoader};

// ── CLI ─────────────────────────────────────────────────────────────

/// Incident pipeline worker: JSON samples in, JSON events out.
#[derive(Parser, Debug)]
#[command(name = "vigil-worker", version, about)]
struct Cli {
    /// Sample file to read (one JSON sample per line). Defaults to stdin.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Registry YAML file with safe zones and responders.
    #[arg(long, env = "REGISTRY_PATH")]
    registry: Option<PathBuf>,

    /// Reload the registry when the file changes.
    #[arg(long)]
    watch: bool,

    /// Process every subject on one task instead of one task per subject.
    #[arg(long)]
    single_threaded: bool,
}

// ── Runner ──────────────────────────────────────────────────────────

enum Runner {
    Single(Engine),
    Pool(WorkerPool),
}

impl Runner {
    async fn submit_sample(&mut self, sample: Sample, line: usize) -> anyhow::Result<()> {
        match self {
            Runner::Single(engine) => engine.submit_sample(sample, Some(line)).await,
            Runner::Pool(pool) => pool.submit_sample(sample, Some(line)).await?,
        }
        Ok(())
    }

    async fn clear_emergency(&mut self, subject_id: &str) -> anyhow::Result<()> {
        match self {
            Runner::Single(engine) => engine.clear_emergency(subject_id).await,
            Runner::Pool(pool) => pool.clear_emergency(subject_id).await?,
        }
        Ok(())
    }

    async fn tick(&mut self) -> anyhow::Result<()> {
        let now = Utc::now();
        match self {
            Runner::Single(engine) => engine.tick(now).await,
            Runner::Pool(pool) => pool.tick(now).await?,
        }
        Ok(())
    }

    async fn finish(self) {
        if let Runner::Pool(pool) = self {
            pool.shutdown().await;
        }
    }
}

/// Either a control command or a sample.
enum InputLine {
    Clear(String),
    Sample(Sample),
}

fn parse_input(line: &str) -> Result<InputLine, VigilError> {
    let value: serde_json::Value = serde_json::from_str(line.trim())
        .map_err(|e| VigilError::Serialize(format!("invalid sample: {e}")))?;

    if value.get("kind").and_then(|k| k.as_str()) == Some("clear") {
        let subject = value
            .get("subjectId")
            .and_then(|s| s.as_str())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| VigilError::invalid("", "clear command without subjectId"))?;
        return Ok(InputLine::Clear(subject.to_string()));
    }

    serde_json::from_value::<Sample>(value)
        .map(InputLine::Sample)
        .map_err(|e| VigilError::Serialize(format!("invalid sample: {e}")))
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    vigil_core::config::load_dotenv();
    let cli = Cli::parse();
    let config = Config::from_env();
    config.log_summary();

    let registry_path = cli.registry.clone().unwrap_or_else(|| config.registry.path.clone());
    let mut loader = RegistryLoader::new(registry_path.clone());
    if let Err(e) = loader.load() {
        warn!(
            path = %registry_path.display(),
            error = %e,
            "starting without a registry, subjects will be treated as outside"
        );
    }
    if cli.watch || config.registry.watch {
        loader.watch()?;
    }
    let registry: Arc<dyn RegistrySource> = Arc::new(loader);

    let audit = AuditLog::with_max_entries(config.audit.max_entries_per_subject);
    let pipeline = Arc::new(Pipeline::new(
        PipelineSettings::from(&config),
        Arc::clone(&registry),
        audit.clone(),
    ));

    let (channel_sink, mut events) = ChannelSink::channel(config.worker.queue_capacity);
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(event) = events.recv().await {
            if let Err(e) = write_event(&mut stdout, &event).await {
                error!(error = %e, "failed to write event");
            }
        }
    });

    let notifying = NotifyingSink::new(
        Dispatcher::with_defaults(vec![Box::new(LogNotifier::new())]),
        TemplateRenderer::new(),
        Arc::clone(&registry),
        audit,
    );
    let sink: Arc<dyn EventSink> = Arc::new(FanoutSink::new(vec![
        Arc::new(channel_sink),
        Arc::new(notifying),
    ]));

    let mut runner = if cli.single_threaded {
        Runner::Single(Engine::new(pipeline.clone(), sink.clone()))
    } else {
        Runner::Pool(WorkerPool::new(pipeline.clone(), sink.clone(), config.worker.queue_capacity))
    };

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &cli.input {
        Some(path) => Box::new(BufReader::new(tokio::fs::File::open(path).await?)),
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    info!(
        input = %cli.input.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "stdin".into()),
        single_threaded = cli.single_threaded,
        "vigil-worker starting"
    );

    let live = cli.input.is_none();
    let period = Duration::from_secs(u64::from(config.geofence.sampling_interval_secs.max(1)));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut lines = reader.lines();
    let mut line_no = 0usize;
    loop {
        tokio::select! {
            next = lines.next_line() => {
                let Some(line) = next? else { break };
                line_no += 1;
                if line.trim().is_empty() {
                    continue;
                }
                match parse_input(&line) {
                    Ok(InputLine::Clear(subject_id)) => runner.clear_emergency(&subject_id).await?,
                    Ok(InputLine::Sample(sample)) => runner.submit_sample(sample, line_no).await?,
                    Err(e) => sink.emit(pipeline.reject(None, &e, Some(line_no))).await,
                }
            }
            _ = ticker.tick(), if live => runner.tick().await?,
        }
    }

    runner.finish().await;
    // The writer stops once every sink handle is gone.
    drop(sink);
    drop(pipeline);
    writer.await?;

    info!(lines = line_no, "vigil-worker exited cleanly");
    Ok(())
}

async fn write_event(stdout: &mut tokio::io::Stdout, event: &PipelineEvent) -> anyhow::Result<()> {
    let mut json = serde_json::to_vec(event)?;
    json.push(b'\n');
    stdout.write_all(&json).await?;
    stdout.flush().await?;
    Ok(())
}
