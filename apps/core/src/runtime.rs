use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};

use clap::Parser;

use crate::commit::{CommitMode, CommitOutcome, CommitPipeline, CommitRequest, HideError, WindowHost};
use crate::config::{self, ConfigError};
use crate::contract::HostSignal;
use crate::core_service::{run_contained, CommitDispatch, OverlayService, ServiceError};
use crate::index_store::{SqliteStore, StoreError};
use crate::keymap::Variant;
use crate::logging;
use crate::model::Candidate;
use crate::output::{OutputChain, PipeInjector};
use crate::transport::{encode, handle_json};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("service error: {0}")]
    Service(#[from] ServiceError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "quickpick",
    version = env!("CARGO_PKG_VERSION"),
    about = "Quick-access snippet overlay driven over stdio"
)]
pub struct RuntimeOptions {
    #[clap(long, help = "Config file (.toml, .json or .json5)")]
    pub config: Option<PathBuf>,

    #[clap(long, help = "Snippet database path, overrides the config")]
    pub db: Option<PathBuf>,

    #[clap(long, default_value = "list", help = "Overlay variant: list or grid")]
    pub variant: Variant,

    #[clap(long, help = "Insert demo snippets when the database is empty")]
    pub seed_demo: bool,
}

pub fn parse_cli_args<I, T>(args: I) -> Result<RuntimeOptions, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    RuntimeOptions::try_parse_from(args)
}

#[derive(Debug)]
pub enum RuntimeEvent {
    Line(String),
    Settled(CommitOutcome),
    InputClosed,
}

/// Hides the overlay by telling the host over the output line channel.
pub struct ChannelHost {
    lines: Mutex<Sender<String>>,
}

impl ChannelHost {
    pub fn new(lines: Sender<String>) -> Self {
        Self {
            lines: Mutex::new(lines),
        }
    }
}

impl WindowHost for ChannelHost {
    fn hide_current_window(&self) -> Result<(), HideError> {
        let lines = self
            .lines
            .lock()
            .map_err(|_| HideError("host channel poisoned".into()))?;
        lines
            .send(encode(&HostSignal::Hide))
            .map_err(|_| HideError("host channel closed".into()))
    }
}

/// Runs each commit on its own thread and posts the outcome to the event loop.
pub struct WorkerDispatch {
    pipeline: Arc<CommitPipeline>,
    events: Mutex<Sender<RuntimeEvent>>,
}

impl WorkerDispatch {
    pub fn new(pipeline: Arc<CommitPipeline>, events: Sender<RuntimeEvent>) -> Self {
        Self {
            pipeline,
            events: Mutex::new(events),
        }
    }
}

impl CommitDispatch for WorkerDispatch {
    fn dispatch(&self, request: CommitRequest) {
        let events = self
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let candidate_id = request.candidate.id;
        let pipeline = Arc::clone(&self.pipeline);
        let worker_events = events.clone();
        let spawned = std::thread::Builder::new()
            .name("quickpick-commit".into())
            .spawn(move || {
                let outcome = run_contained(&pipeline, &request);
                if worker_events.send(RuntimeEvent::Settled(outcome)).is_err() {
                    tracing::warn!("event loop gone before commit settled");
                }
            });
        if let Err(error) = spawned {
            tracing::error!(%error, "failed to spawn commit worker");
            let outcome =
                CommitOutcome::aborted(candidate_id, format!("commit worker unavailable: {error}"));
            if events.send(RuntimeEvent::Settled(outcome)).is_err() {
                tracing::warn!("event loop gone before commit settled");
            }
        }
    }
}

pub fn run_with_options(options: RuntimeOptions) -> Result<(), RuntimeError> {
    let mut config = config::load(options.config.as_deref())?;
    if let Some(db) = options.db {
        config.db_path = db;
    }
    config::validate(&config)?;

    match logging::init(&logging::logs_dir(), &config.log_filter) {
        Ok(path) => tracing::info!(log = %path.display(), "logging initialized"),
        Err(error) => eprintln!("[quickpick] logging disabled: {error}"),
    }
    tracing::info!(
        variant = options.variant.as_str(),
        db = %config.db_path.display(),
        config = %config.config_path.display(),
        "startup"
    );

    let store = Arc::new(SqliteStore::open_file(&config.db_path)?);
    if options.seed_demo {
        let seeded = seed_demo_snippets(&store)?;
        tracing::info!(seeded, "demo snippets");
    }

    let (event_tx, event_rx) = mpsc::channel::<RuntimeEvent>();
    let (line_tx, line_rx) = mpsc::channel::<String>();
    let writer = spawn_writer(line_rx);

    let host = Arc::new(ChannelHost::new(line_tx.clone()));
    let mut pipeline = CommitPipeline::new(
        OutputChain::system(config.native_fallback),
        host.clone(),
        store.clone(),
    );
    if config.commit_mode == CommitMode::Injection {
        pipeline = pipeline.with_injector(Arc::new(PipeInjector::new(&config.inject_pipe_path)));
    }
    let dispatcher = WorkerDispatch::new(Arc::new(pipeline), event_tx.clone());
    let mut service =
        OverlayService::new(config, options.variant, store, host, Box::new(dispatcher))?;

    spawn_reader(event_tx);
    event_loop(&mut service, &event_rx, &line_tx);

    drop(service);
    drop(line_tx);
    if writer.join().is_err() {
        tracing::error!("stdout writer panicked");
    }
    tracing::info!("shutdown");
    Ok(())
}

/// Drains events until stdin closes and no commit is still running.
pub fn event_loop(service: &mut OverlayService, events: &Receiver<RuntimeEvent>, lines: &Sender<String>) {
    let mut input_closed = false;
    while let Ok(event) = events.recv() {
        let line = match event {
            RuntimeEvent::Line(raw) => {
                if raw.trim().is_empty() {
                    continue;
                }
                Some(handle_json(service, &raw))
            }
            RuntimeEvent::Settled(outcome) => {
                tracing::debug!(candidate_id = outcome.candidate_id(), "commit settled");
                Some(encode(&service.settle(&outcome)))
            }
            RuntimeEvent::InputClosed => {
                input_closed = true;
                None
            }
        };
        if let Some(line) = line {
            if lines.send(line).is_err() {
                break;
            }
        }
        if input_closed && !service.commit_in_flight() {
            break;
        }
    }
}

fn spawn_reader(events: Sender<RuntimeEvent>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if events.send(RuntimeEvent::Line(line)).is_err() {
                        return;
                    }
                }
                Err(error) => {
                    tracing::warn!(%error, "stdin read failed");
                    break;
                }
            }
        }
        let _ = events.send(RuntimeEvent::InputClosed);
    });
}

fn spawn_writer(lines: Receiver<String>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        for line in lines {
            if writeln!(out, "{line}").and_then(|_| out.flush()).is_err() {
                tracing::warn!("stdout closed");
                break;
            }
        }
    })
}

/// Inserts a small demo set into an empty store; returns how many were added.
pub fn seed_demo_snippets(store: &SqliteStore) -> Result<usize, StoreError> {
    if store.snippet_count()? > 0 {
        return Ok(0);
    }
    let demo = demo_snippets();
    for candidate in &demo {
        store.upsert_snippet(candidate)?;
    }
    Ok(demo.len())
}

pub fn demo_snippets() -> Vec<Candidate> {
    vec![
        Candidate::new(1, "Code review", "Review this diff for bugs and unclear naming:")
            .with_tags(&["coding", "review"])
            .with_category("coding"),
        Candidate::new(2, "Summarize", "Summarize the following text in three sentences:")
            .with_tags(&["writing"]),
        Candidate::new(3, "Translate to English", "Translate the following into English:")
            .with_tags(&["writing", "translation"]),
        Candidate::new(4, "Explain error", "Explain what causes this error and how to fix it:")
            .with_tags(&["coding", "debug"])
            .with_category("coding"),
        Candidate::new(5, "Meeting notes", "Turn these notes into action items with owners:")
            .with_tags(&["work"]),
        Candidate::new(6, "Commit message", "Write a concise commit message for this change:")
            .with_tags(&["coding", "git"]),
        Candidate::new(7, "Polite decline", "Thank you for the invitation, but I can't make it.")
            .with_tags(&["email"]),
        Candidate::new(8, "SQL helper", "Write a SQL query that returns:")
            .with_tags(&["coding", "sql"]),
    ]
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::{self, Sender};
    use std::sync::Arc;
    use std::time::Duration;

    use super::{
        demo_snippets, event_loop, parse_cli_args, seed_demo_snippets, ChannelHost, RuntimeEvent,
        WorkerDispatch,
    };
    use crate::commit::{CommitPipeline, MockHost, WindowHost};
    use crate::config::Config;
    use crate::contract::OverlayRequest;
    use crate::core_service::OverlayService;
    use crate::index_store::{MemoryStore, SqliteStore};
    use crate::keymap::Variant;
    use crate::model::Candidate;
    use crate::output::{OutputBackend, OutputChain, OutputError};

    struct CrashingOutput;

    impl OutputBackend for CrashingOutput {
        fn name(&self) -> &'static str {
            "crashing"
        }

        fn write_output(&self, _text: &str) -> Result<(), OutputError> {
            panic!("backend crashed");
        }
    }

    fn worker_service(events: Sender<RuntimeEvent>) -> OverlayService {
        let store = Arc::new(MemoryStore::new(vec![Candidate::new(1, "Greeting", "hello")]));
        let host = Arc::new(MockHost::default());
        let pipeline = CommitPipeline::new(
            OutputChain::new(Box::new(CrashingOutput)),
            host.clone(),
            store.clone(),
        );
        OverlayService::new(
            Config::default(),
            Variant::List,
            store,
            host,
            Box::new(WorkerDispatch::new(Arc::new(pipeline), events)),
        )
        .unwrap()
    }

    #[test]
    fn cli_defaults_to_list_variant() {
        let options = parse_cli_args(["quickpick"]).unwrap();
        assert_eq!(options.variant, Variant::List);
        assert!(!options.seed_demo);
        assert!(options.config.is_none());
    }

    #[test]
    fn cli_parses_grid_and_paths() {
        let options =
            parse_cli_args(["quickpick", "--variant", "grid", "--db", "x.sqlite3", "--seed-demo"])
                .unwrap();
        assert_eq!(options.variant, Variant::Grid);
        assert_eq!(options.db.unwrap().to_string_lossy(), "x.sqlite3");
        assert!(options.seed_demo);
    }

    #[test]
    fn cli_rejects_unknown_variant() {
        assert!(parse_cli_args(["quickpick", "--variant", "tree"]).is_err());
    }

    #[test]
    fn seeding_only_fills_empty_store() {
        let store = SqliteStore::open_memory().unwrap();
        assert_eq!(seed_demo_snippets(&store).unwrap(), demo_snippets().len());
        assert_eq!(seed_demo_snippets(&store).unwrap(), 0);
    }

    #[test]
    fn channel_host_emits_hide_signal() {
        let (tx, rx) = mpsc::channel();
        let host = ChannelHost::new(tx);
        host.hide_current_window().unwrap();
        assert_eq!(rx.recv().unwrap(), r#"{"signal":"hide"}"#);
    }

    #[test]
    fn channel_host_reports_closed_channel() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let host = ChannelHost::new(tx);
        assert!(host.hide_current_window().is_err());
    }

    #[test]
    fn panicking_commit_settles_and_allows_retry() {
        let (tx, rx) = mpsc::channel();
        let mut service = worker_service(tx);
        service.handle_command(OverlayRequest::Show).unwrap();
        service.handle_command(OverlayRequest::Confirm).unwrap();
        assert!(service.commit_in_flight());

        let RuntimeEvent::Settled(outcome) = rx.recv_timeout(Duration::from_secs(5)).unwrap()
        else {
            panic!("expected settled event");
        };
        assert!(!outcome.is_committed());
        service.settle(&outcome);
        assert!(!service.commit_in_flight());
        assert!(service.is_visible());

        service.handle_command(OverlayRequest::Confirm).unwrap();
        assert!(service.commit_in_flight());
    }

    #[test]
    fn event_loop_exits_after_crashed_commit_settles() {
        let (tx, rx) = mpsc::channel();
        let (line_tx, line_rx) = mpsc::channel();
        let mut service = worker_service(tx.clone());
        service.handle_command(OverlayRequest::Show).unwrap();
        tx.send(RuntimeEvent::Line(r#"{"kind":"confirm"}"#.into())).unwrap();
        tx.send(RuntimeEvent::InputClosed).unwrap();

        event_loop(&mut service, &rx, &line_tx);

        assert!(!service.commit_in_flight());
        let lines: Vec<String> = line_rx.try_iter().collect();
        assert!(lines.iter().any(|line| line.contains(r#""signal":"commit_settled""#)));
    }
}
