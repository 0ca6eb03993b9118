use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::index_store::CandidateStore;
use crate::model::Candidate;
use crate::output::{Injector, OutputChain, OutputError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    /// Write the snippet text through the output chain.
    #[default]
    Output,
    /// Ask the injection service to type the snippet, falling back to output.
    Injection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommitRequest {
    pub candidate: Candidate,
    pub query: Option<String>,
    pub mode: CommitMode,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("hide failed: {0}")]
pub struct HideError(pub String);

/// The window that hosts the overlay.
pub trait WindowHost: Send + Sync {
    fn hide_current_window(&self) -> Result<(), HideError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Committed {
        candidate_id: i64,
        delivered_via: &'static str,
        usage_logged: bool,
        hidden: bool,
    },
    DeliveryFailed {
        candidate_id: i64,
        error: OutputError,
    },
}

impl CommitOutcome {
    pub fn candidate_id(&self) -> i64 {
        match self {
            Self::Committed { candidate_id, .. } | Self::DeliveryFailed { candidate_id, .. } => {
                *candidate_id
            }
        }
    }

    /// Outcome for a commit whose pipeline never produced one.
    pub fn aborted(candidate_id: i64, message: impl Into<String>) -> Self {
        Self::DeliveryFailed {
            candidate_id,
            error: OutputError::Aborted(message.into()),
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

pub struct CommitPipeline {
    output: OutputChain,
    injector: Option<Arc<dyn Injector>>,
    host: Arc<dyn WindowHost>,
    store: Arc<dyn CandidateStore>,
}

impl CommitPipeline {
    pub fn new(
        output: OutputChain,
        host: Arc<dyn WindowHost>,
        store: Arc<dyn CandidateStore>,
    ) -> Self {
        Self {
            output,
            injector: None,
            host,
            store,
        }
    }

    pub fn with_injector(mut self, injector: Arc<dyn Injector>) -> Self {
        self.injector = Some(injector);
        self
    }

    /// Deliver, then log usage, then hide. Only a delivery failure stops the
    /// sequence; logging and hide failures are logged and skipped.
    pub fn run(&self, request: &CommitRequest) -> CommitOutcome {
        let candidate = &request.candidate;
        let delivered_via = match self.deliver(request) {
            Ok(backend) => backend,
            Err(error) => {
                tracing::error!(candidate_id = candidate.id, %error, "commit aborted");
                return CommitOutcome::DeliveryFailed {
                    candidate_id: candidate.id,
                    error,
                };
            }
        };
        tracing::info!(candidate_id = candidate.id, backend = delivered_via, "snippet delivered");

        let usage_logged = match self.store.record_usage(
            candidate.id,
            &candidate.name,
            request.query.as_deref(),
        ) {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(candidate_id = candidate.id, %error, "usage log failed");
                false
            }
        };

        let hidden = match self.host.hide_current_window() {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(%error, "hide after commit failed");
                false
            }
        };

        CommitOutcome::Committed {
            candidate_id: candidate.id,
            delivered_via,
            usage_logged,
            hidden,
        }
    }

    fn deliver(&self, request: &CommitRequest) -> Result<&'static str, OutputError> {
        if request.mode == CommitMode::Injection {
            match &self.injector {
                Some(injector) => match injector.trigger_injection(request.candidate.id) {
                    Ok(()) => return Ok("injection"),
                    Err(error) => {
                        tracing::warn!(%error, "injection failed; falling back to output")
                    }
                },
                None => tracing::warn!("injection requested without an injector"),
            }
        }
        self.output.write(&request.candidate.content)
    }
}

/// Counts hide requests; can be switched to fail.
#[derive(Default)]
pub struct MockHost {
    hides: AtomicUsize,
    fail: AtomicBool,
}

impl MockHost {
    pub fn hide_count(&self) -> usize {
        self.hides.load(Ordering::SeqCst)
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl WindowHost for MockHost {
    fn hide_current_window(&self) -> Result<(), HideError> {
        self.hides.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(HideError("mock host refused".into()));
        }
        Ok(())
    }
}
