use serde::{Deserialize, Serialize};

use crate::commit::CommitOutcome;
use crate::render::RenderFrame;
use crate::session::OverlayAction;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyRequest {
    pub key: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotRequest {
    pub slot: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum OverlayRequest {
    /// The host made the overlay visible; resets the session.
    Show,
    Query(QueryRequest),
    Key(KeyRequest),
    Next,
    Prev,
    Confirm,
    Cancel,
    SelectSlot(SlotRequest),
    NextPage,
    PrevPage,
    /// Re-render without changing state.
    Render,
}

impl OverlayRequest {
    /// Direct action for requests that bypass the keymap.
    pub fn action(&self) -> Option<OverlayAction> {
        match self {
            Self::Query(request) => Some(OverlayAction::Query(request.text.clone())),
            Self::Next => Some(OverlayAction::Next),
            Self::Prev => Some(OverlayAction::Prev),
            Self::Confirm => Some(OverlayAction::Confirm),
            Self::Cancel => Some(OverlayAction::Cancel),
            Self::SelectSlot(request) => Some(OverlayAction::SelectSlot(request.slot)),
            Self::NextPage => Some(OverlayAction::NextPage),
            Self::PrevPage => Some(OverlayAction::PrevPage),
            Self::Show | Self::Key(_) | Self::Render => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum OverlayResponse {
    Frame(RenderFrame),
    /// Key had no binding for this variant; the host keeps its default handling.
    Unbound,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitSummary {
    pub candidate_id: i64,
    pub committed: bool,
    pub delivered_via: Option<String>,
    pub usage_logged: bool,
    pub error: Option<String>,
}

impl From<&CommitOutcome> for CommitSummary {
    fn from(outcome: &CommitOutcome) -> Self {
        match outcome {
            CommitOutcome::Committed {
                candidate_id,
                delivered_via,
                usage_logged,
                ..
            } => Self {
                candidate_id: *candidate_id,
                committed: true,
                delivered_via: Some(delivered_via.to_string()),
                usage_logged: *usage_logged,
                error: None,
            },
            CommitOutcome::DeliveryFailed {
                candidate_id,
                error,
            } => Self {
                candidate_id: *candidate_id,
                committed: false,
                delivered_via: None,
                usage_logged: false,
                error: Some(error.to_string()),
            },
        }
    }
}

/// Unsolicited lines from the runtime to the host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum HostSignal {
    Hide,
    CommitSettled {
        commit: CommitSummary,
        frame: RenderFrame,
    },
}
