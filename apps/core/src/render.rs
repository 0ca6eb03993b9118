//! Pure projection of a session into a serializable frame for the front end.

use serde::{Deserialize, Serialize};

use crate::model::{Candidate, UsageStat};
use crate::navigation::Focus;
use crate::paging::Slot;
use crate::session::{GridSession, ListSession, Overlay, Status};

const PREVIEW_CHARS: usize = 50;
pub const EMPTY_STATE_TEXT: &str = "No matching snippets";
pub const NO_STATS_TEXT: &str = "No usage yet";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowView {
    pub id: i64,
    pub name: String,
    pub preview: String,
    pub category: Option<String>,
    pub extra_tags: Vec<String>,
    pub usage_label: Option<String>,
    pub focused: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotView {
    pub slot: usize,
    pub label: String,
    pub id: Option<i64>,
    pub name: Option<String>,
    pub selectable: bool,
    pub focused: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageIndicator {
    /// 1-based for display.
    pub current: usize,
    pub total: usize,
    pub can_prev: bool,
    pub can_next: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum RenderFrame {
    List {
        visible: bool,
        query: String,
        rows: Vec<RowView>,
        empty_state: Option<String>,
        error: Option<String>,
        toast: Option<String>,
        stats: Vec<StatView>,
        stats_placeholder: Option<String>,
        focus_input: bool,
    },
    Grid {
        visible: bool,
        slots: Vec<SlotView>,
        page: PageIndicator,
        error: Option<String>,
        toast: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatView {
    pub name: String,
    pub usage_count: u32,
}

impl From<&UsageStat> for StatView {
    fn from(stat: &UsageStat) -> Self {
        Self {
            name: stat.name.clone(),
            usage_count: stat.usage_count,
        }
    }
}

pub fn project_list(session: &ListSession, focus_input: bool, now_ms: i64) -> RenderFrame {
    let (error, toast) = status_messages(session.status());
    let focused = match session.focus() {
        Focus::Focused(cursor) => Some(cursor),
        Focus::Idle => None,
    };
    let rows: Vec<RowView> = session
        .view()
        .iter()
        .enumerate()
        .map(|(index, entry)| row_view(&entry.candidate, focused == Some(index), now_ms))
        .collect();
    let empty_state = (rows.is_empty() && error.is_none()).then(|| EMPTY_STATE_TEXT.to_string());
    let stats: Vec<StatView> = session.stats().iter().map(StatView::from).collect();
    let stats_placeholder = stats.is_empty().then(|| NO_STATS_TEXT.to_string());

    RenderFrame::List {
        visible: session.is_visible(),
        query: session.query().to_string(),
        rows,
        empty_state,
        error,
        toast,
        stats,
        stats_placeholder,
        focus_input,
    }
}

pub fn project_grid(session: &GridSession) -> RenderFrame {
    let grid = session.grid();
    let (error, toast) = status_messages(session.status());
    let focused = match grid.focus() {
        Focus::Focused(cursor) => Some(cursor),
        Focus::Idle => None,
    };
    let slots = grid
        .slots()
        .into_iter()
        .enumerate()
        .map(|(slot, content)| match content {
            Slot::Filled(candidate) => SlotView {
                slot,
                label: (slot + 1).to_string(),
                id: Some(candidate.id),
                name: Some(candidate.name.clone()),
                selectable: true,
                focused: focused == Some(slot),
            },
            Slot::Placeholder => SlotView {
                slot,
                label: (slot + 1).to_string(),
                id: None,
                name: None,
                selectable: false,
                focused: false,
            },
        })
        .collect();
    let page = grid.page();

    RenderFrame::Grid {
        visible: session.is_visible(),
        slots,
        page: PageIndicator {
            current: page.page_index + 1,
            total: page.total_pages.max(1),
            can_prev: grid.can_go_prev(),
            can_next: grid.can_go_next(),
        },
        error,
        toast,
    }
}

fn status_messages(status: &Status) -> (Option<String>, Option<String>) {
    match status {
        Status::Ready => (None, None),
        Status::RetrievalFailed(message) => (Some(message.clone()), None),
        Status::CommitFailed(message) => (None, Some(message.clone())),
    }
}

fn row_view(candidate: &Candidate, focused: bool, now_ms: i64) -> RowView {
    RowView {
        id: candidate.id,
        name: candidate.name.clone(),
        preview: preview(&candidate.content),
        category: candidate
            .category
            .clone()
            .or_else(|| candidate.tags.first().cloned()),
        extra_tags: candidate.tags.iter().skip(1).cloned().collect(),
        usage_label: usage_label(candidate, now_ms),
        focused,
    }
}

pub fn preview(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

/// "Used 3 times · 2h ago"; `None` for snippets that were never used.
pub fn usage_label(candidate: &Candidate, now_ms: i64) -> Option<String> {
    if candidate.usage_count == 0 {
        return None;
    }
    let times = if candidate.usage_count == 1 { "time" } else { "times" };
    let mut label = format!("Used {} {times}", candidate.usage_count);
    if let Some(last_used_at) = candidate.last_used_at {
        label.push_str(" · ");
        label.push_str(&relative_age(now_ms, last_used_at));
    }
    Some(label)
}

pub fn relative_age(now_ms: i64, then_ms: i64) -> String {
    let seconds = now_ms.saturating_sub(then_ms).max(0) / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;
    if days > 0 {
        format!("{days}d ago")
    } else if hours > 0 {
        format!("{hours}h ago")
    } else if minutes > 0 {
        format!("{minutes}m ago")
    } else {
        "just now".to_string()
    }
}
