//! Per-overlay state for the list and grid variants.
//!
//! A session never talks to collaborators itself. Input arrives as an
//! [`OverlayAction`] and the session answers with an [`Effect`] for the host
//! to carry out; results of external calls come back through `open`,
//! `apply_page` and `settle`.

use crate::commit::{CommitMode, CommitOutcome, CommitRequest};
use crate::index_store::StoreError;
use crate::model::{Candidate, Page, RankedEntry, UsageStat};
use crate::navigation::{Focus, NavAction, NavOutcome, Navigator};
use crate::overlay_state::OverlayState;
use crate::paging::GridState;
use crate::search::{rank_with, RankOptions};
use crate::similarity::{ApproximateSubstring, TextSimilarity};

pub const COMMIT_FAILED_MESSAGE: &str = "Copy failed, please try again.";
pub const RETRIEVAL_FAILED_MESSAGE: &str = "Could not load snippets. Reopen to retry.";

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayAction {
    Query(String),
    Next,
    Prev,
    Confirm,
    Cancel,
    SelectSlot(usize),
    NextPage,
    PrevPage,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    Commit(CommitRequest),
    Hide,
    FetchPage(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Ready,
    RetrievalFailed(String),
    CommitFailed(String),
}

/// Shared contract of both overlay variants.
pub trait Overlay {
    fn handle(&mut self, action: OverlayAction) -> Effect;
    fn settle(&mut self, outcome: &CommitOutcome);
    fn is_visible(&self) -> bool;
    fn commit_in_flight(&self) -> bool;
    fn status(&self) -> &Status;
}

pub struct ListSession {
    options: RankOptions,
    matcher: Box<dyn TextSimilarity>,
    snapshot: Vec<Candidate>,
    query: String,
    view: Vec<RankedEntry>,
    navigator: Navigator,
    visibility: OverlayState,
    status: Status,
    stats: Vec<UsageStat>,
    commit_in_flight: bool,
    input_focus_requested: bool,
}

impl ListSession {
    pub fn new(options: RankOptions) -> Self {
        Self {
            options,
            matcher: Box::new(ApproximateSubstring),
            snapshot: Vec::new(),
            query: String::new(),
            view: Vec::new(),
            navigator: Navigator::default(),
            visibility: OverlayState::default(),
            status: Status::Ready,
            stats: Vec::new(),
            commit_in_flight: false,
            input_focus_requested: false,
        }
    }

    pub fn with_matcher(mut self, matcher: Box<dyn TextSimilarity>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Show or re-show: replaces the snapshot and resets query, view and cursor.
    pub fn open(&mut self, fetched: Result<Vec<Candidate>, StoreError>, stats: Vec<UsageStat>) {
        self.visibility.on_show();
        self.query.clear();
        self.stats = stats;
        self.input_focus_requested = true;
        match fetched {
            Ok(snapshot) => {
                self.snapshot = snapshot;
                self.status = Status::Ready;
            }
            Err(error) => {
                tracing::error!(%error, "candidate fetch failed");
                self.snapshot.clear();
                self.status = Status::RetrievalFailed(RETRIEVAL_FAILED_MESSAGE.to_string());
            }
        }
        self.refresh_view();
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
        if matches!(self.status, Status::CommitFailed(_)) {
            self.status = Status::Ready;
        }
        self.refresh_view();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn snapshot(&self) -> &[Candidate] {
        &self.snapshot
    }

    pub fn view(&self) -> &[RankedEntry] {
        &self.view
    }

    pub fn focus(&self) -> Focus {
        self.navigator.focus()
    }

    pub fn stats(&self) -> &[UsageStat] {
        &self.stats
    }

    /// True once after each open; the host moves keyboard focus to the input.
    pub fn take_input_focus_request(&mut self) -> bool {
        std::mem::take(&mut self.input_focus_requested)
    }

    fn refresh_view(&mut self) {
        self.view = rank_with(&self.snapshot, &self.query, self.matcher.as_ref(), self.options);
        self.navigator.reset(self.view.len());
    }

    fn commit_index(&mut self, index: usize) -> Effect {
        let Some(entry) = self.view.get(index) else {
            return Effect::None;
        };
        let query = self.query.trim();
        let request = CommitRequest {
            candidate: entry.candidate.clone(),
            query: (!query.is_empty()).then(|| query.to_string()),
            mode: CommitMode::Output,
        };
        self.commit_in_flight = true;
        Effect::Commit(request)
    }
}

impl Overlay for ListSession {
    fn handle(&mut self, action: OverlayAction) -> Effect {
        match action {
            OverlayAction::Query(query) => {
                self.set_query(&query);
                Effect::None
            }
            OverlayAction::Next => {
                self.navigator.apply(NavAction::Next);
                Effect::None
            }
            OverlayAction::Prev => {
                self.navigator.apply(NavAction::Prev);
                Effect::None
            }
            OverlayAction::Confirm => {
                if self.commit_in_flight {
                    return Effect::None;
                }
                match self.navigator.apply(NavAction::Confirm) {
                    NavOutcome::Emit(index) => self.commit_index(index),
                    _ => Effect::None,
                }
            }
            OverlayAction::SelectSlot(index) => {
                if self.commit_in_flight {
                    return Effect::None;
                }
                match self.navigator.select(index) {
                    NavOutcome::Emit(index) => self.commit_index(index),
                    _ => Effect::None,
                }
            }
            OverlayAction::Cancel => {
                self.visibility.on_hide();
                Effect::Hide
            }
            OverlayAction::NextPage | OverlayAction::PrevPage => Effect::None,
        }
    }

    fn settle(&mut self, outcome: &CommitOutcome) {
        self.commit_in_flight = false;
        match outcome {
            CommitOutcome::Committed { .. } => {
                self.visibility.on_hide();
            }
            CommitOutcome::DeliveryFailed { .. } => {
                self.status = Status::CommitFailed(COMMIT_FAILED_MESSAGE.to_string());
            }
        }
    }

    fn is_visible(&self) -> bool {
        self.visibility.is_visible()
    }

    fn commit_in_flight(&self) -> bool {
        self.commit_in_flight
    }

    fn status(&self) -> &Status {
        &self.status
    }
}

pub struct GridSession {
    grid: GridState,
    mode: CommitMode,
    visibility: OverlayState,
    status: Status,
    commit_in_flight: bool,
}

impl GridSession {
    pub fn new(page_size: usize, mode: CommitMode) -> Self {
        Self {
            grid: GridState::new(page_size),
            mode,
            visibility: OverlayState::default(),
            status: Status::Ready,
            commit_in_flight: false,
        }
    }

    pub fn page_size(&self) -> usize {
        self.grid.page_size()
    }

    pub fn grid(&self) -> &GridState {
        &self.grid
    }

    /// Show or re-show with the first page.
    pub fn open(&mut self, fetched: Result<Page, StoreError>) {
        self.visibility.on_show();
        match fetched {
            Ok(page) => {
                self.grid.apply_page(page);
                self.status = Status::Ready;
            }
            Err(error) => {
                tracing::error!(%error, "page fetch failed");
                self.grid.clear();
                self.status = Status::RetrievalFailed(RETRIEVAL_FAILED_MESSAGE.to_string());
            }
        }
    }

    /// Result of a `FetchPage` effect. A failed fetch keeps the current page.
    pub fn apply_page(&mut self, fetched: Result<Page, StoreError>) {
        match fetched {
            Ok(page) => {
                self.grid.apply_page(page);
                self.status = Status::Ready;
            }
            Err(error) => {
                tracing::error!(%error, "page fetch failed");
                self.status = Status::RetrievalFailed(RETRIEVAL_FAILED_MESSAGE.to_string());
            }
        }
    }

    fn commit(&mut self, candidate: Option<Candidate>) -> Effect {
        let Some(candidate) = candidate else {
            return Effect::None;
        };
        self.commit_in_flight = true;
        Effect::Commit(CommitRequest {
            candidate,
            query: None,
            mode: self.mode,
        })
    }
}

impl Overlay for GridSession {
    fn handle(&mut self, action: OverlayAction) -> Effect {
        match action {
            OverlayAction::SelectSlot(slot) => {
                if self.commit_in_flight {
                    return Effect::None;
                }
                let candidate = self.grid.select_slot(slot).cloned();
                self.commit(candidate)
            }
            OverlayAction::Confirm => {
                if self.commit_in_flight {
                    return Effect::None;
                }
                let candidate = self.grid.focused().cloned();
                self.commit(candidate)
            }
            OverlayAction::NextPage => self
                .grid
                .next_page_index()
                .map_or(Effect::None, Effect::FetchPage),
            OverlayAction::PrevPage => self
                .grid
                .prev_page_index()
                .map_or(Effect::None, Effect::FetchPage),
            OverlayAction::Cancel => {
                self.visibility.on_hide();
                Effect::Hide
            }
            OverlayAction::Query(_) | OverlayAction::Next | OverlayAction::Prev => Effect::None,
        }
    }

    fn settle(&mut self, outcome: &CommitOutcome) {
        self.commit_in_flight = false;
        match outcome {
            CommitOutcome::Committed { .. } => {
                self.visibility.on_hide();
            }
            CommitOutcome::DeliveryFailed { .. } => {
                self.status = Status::CommitFailed(COMMIT_FAILED_MESSAGE.to_string());
            }
        }
    }

    fn is_visible(&self) -> bool {
        self.visibility.is_visible()
    }

    fn commit_in_flight(&self) -> bool {
        self.commit_in_flight
    }

    fn status(&self) -> &Status {
        &self.status
    }
}
