use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};

use crate::commit::{CommitOutcome, CommitPipeline, CommitRequest, WindowHost};
use crate::config::{validate, Config, ConfigError};
use crate::contract::{CommitSummary, HostSignal, OverlayRequest, OverlayResponse};
use crate::index_store::{now_epoch_ms, CandidateStore};
use crate::keymap::{self, Variant};
use crate::render::{project_grid, project_list, RenderFrame};
use crate::session::{Effect, GridSession, ListSession, Overlay, OverlayAction};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("overlay is not visible")]
    NotVisible,
}

/// Hands a commit to whatever runs the pipeline. The outcome must come back
/// through [`OverlayService::settle`].
pub trait CommitDispatch: Send + Sync {
    fn dispatch(&self, request: CommitRequest);
}

/// Runs the pipeline and turns a panic into a failed delivery, so every
/// dispatched commit settles exactly once.
pub fn run_contained(pipeline: &CommitPipeline, request: &CommitRequest) -> CommitOutcome {
    match std::panic::catch_unwind(AssertUnwindSafe(|| pipeline.run(request))) {
        Ok(outcome) => outcome,
        Err(_) => {
            tracing::error!(candidate_id = request.candidate.id, "commit pipeline panicked");
            CommitOutcome::aborted(request.candidate.id, "commit pipeline panicked")
        }
    }
}

/// Runs the pipeline on the calling thread and queues outcomes for the caller.
pub struct InlineDispatch {
    pipeline: Arc<CommitPipeline>,
    outcomes: Mutex<Vec<CommitOutcome>>,
}

impl InlineDispatch {
    pub fn new(pipeline: Arc<CommitPipeline>) -> Self {
        Self {
            pipeline,
            outcomes: Mutex::new(Vec::new()),
        }
    }

    pub fn take_outcomes(&self) -> Vec<CommitOutcome> {
        let mut outcomes = self.outcomes.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *outcomes)
    }
}

impl CommitDispatch for InlineDispatch {
    fn dispatch(&self, request: CommitRequest) {
        let outcome = run_contained(&self.pipeline, &request);
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(outcome);
    }
}

impl<T: CommitDispatch + ?Sized> CommitDispatch for Arc<T> {
    fn dispatch(&self, request: CommitRequest) {
        (**self).dispatch(request)
    }
}

pub enum SessionKind {
    List(ListSession),
    Grid(GridSession),
}

/// One overlay instance: its session plus the collaborators it drives.
pub struct OverlayService {
    variant: Variant,
    session: SessionKind,
    store: Arc<dyn CandidateStore>,
    host: Arc<dyn WindowHost>,
    dispatcher: Box<dyn CommitDispatch>,
    config: Config,
}

impl OverlayService {
    pub fn new(
        config: Config,
        variant: Variant,
        store: Arc<dyn CandidateStore>,
        host: Arc<dyn WindowHost>,
        dispatcher: Box<dyn CommitDispatch>,
    ) -> Result<Self, ServiceError> {
        validate(&config)?;
        let session = match variant {
            Variant::List => SessionKind::List(ListSession::new(config.rank_options())),
            Variant::Grid => {
                SessionKind::Grid(GridSession::new(config.page_size, config.commit_mode))
            }
        };
        Ok(Self {
            variant,
            session,
            store,
            host,
            dispatcher,
            config,
        })
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn session(&self) -> &SessionKind {
        &self.session
    }

    pub fn is_visible(&self) -> bool {
        self.overlay().is_visible()
    }

    pub fn commit_in_flight(&self) -> bool {
        self.overlay().commit_in_flight()
    }

    pub fn handle_command(&mut self, request: OverlayRequest) -> Result<OverlayResponse, ServiceError> {
        match request {
            OverlayRequest::Show => {
                self.show();
                Ok(OverlayResponse::Frame(self.frame()))
            }
            OverlayRequest::Render => Ok(OverlayResponse::Frame(self.frame())),
            OverlayRequest::Key(key) => {
                let slots = match &self.session {
                    SessionKind::List(_) => 0,
                    SessionKind::Grid(session) => session.page_size(),
                };
                match keymap::resolve(self.variant, &key.key, key.code.as_deref(), slots) {
                    Some(action) => self.apply(action),
                    None => Ok(OverlayResponse::Unbound),
                }
            }
            other => {
                let action = other
                    .action()
                    .ok_or_else(|| ServiceError::InvalidRequest(format!("{other:?}")))?;
                self.ensure_supported(&action)?;
                self.apply(action)
            }
        }
    }

    /// Feeds a finished commit back into the session.
    pub fn settle(&mut self, outcome: &CommitOutcome) -> HostSignal {
        match &mut self.session {
            SessionKind::List(session) => session.settle(outcome),
            SessionKind::Grid(session) => session.settle(outcome),
        }
        HostSignal::CommitSettled {
            commit: CommitSummary::from(outcome),
            frame: self.frame(),
        }
    }

    pub fn frame(&mut self) -> RenderFrame {
        match &mut self.session {
            SessionKind::List(session) => {
                let focus_input = session.take_input_focus_request();
                project_list(session, focus_input, now_epoch_ms())
            }
            SessionKind::Grid(session) => project_grid(session),
        }
    }

    fn overlay(&self) -> &dyn Overlay {
        match &self.session {
            SessionKind::List(session) => session as &dyn Overlay,
            SessionKind::Grid(session) => session as &dyn Overlay,
        }
    }

    fn show(&mut self) {
        match &mut self.session {
            SessionKind::List(session) => {
                let stats = self
                    .store
                    .fetch_stats(self.config.stats_limit)
                    .unwrap_or_else(|error| {
                        tracing::warn!(%error, "usage stats unavailable");
                        Vec::new()
                    });
                session.open(self.store.fetch_candidates(), stats);
                tracing::debug!(candidates = session.snapshot().len(), "list overlay opened");
            }
            SessionKind::Grid(session) => {
                session.open(self.store.fetch_page(0, session.page_size()));
                tracing::debug!(
                    total_pages = session.grid().page().total_pages,
                    "grid overlay opened"
                );
            }
        }
    }

    fn ensure_supported(&self, action: &OverlayAction) -> Result<(), ServiceError> {
        let supported = match self.variant {
            Variant::List => !matches!(action, OverlayAction::NextPage | OverlayAction::PrevPage),
            Variant::Grid => !matches!(
                action,
                OverlayAction::Query(_) | OverlayAction::Next | OverlayAction::Prev
            ),
        };
        if supported {
            Ok(())
        } else {
            Err(ServiceError::InvalidRequest(format!(
                "{action:?} is not supported by the {} overlay",
                self.variant.as_str()
            )))
        }
    }

    fn apply(&mut self, action: OverlayAction) -> Result<OverlayResponse, ServiceError> {
        if !self.is_visible() && action != OverlayAction::Cancel {
            return Err(ServiceError::NotVisible);
        }
        let effect = match &mut self.session {
            SessionKind::List(session) => session.handle(action),
            SessionKind::Grid(session) => session.handle(action),
        };
        match effect {
            Effect::None => {}
            Effect::Commit(request) => {
                tracing::info!(candidate_id = request.candidate.id, "commit dispatched");
                self.dispatcher.dispatch(request);
            }
            Effect::Hide => {
                if let Err(error) = self.host.hide_current_window() {
                    tracing::warn!(%error, "hide on cancel failed");
                }
            }
            Effect::FetchPage(page_index) => {
                if let SessionKind::Grid(session) = &mut self.session {
                    let fetched = self.store.fetch_page(page_index, session.page_size());
                    session.apply_page(fetched);
                }
            }
        }
        Ok(OverlayResponse::Frame(self.frame()))
    }
}
