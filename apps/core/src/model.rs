use serde::{Deserialize, Serialize};

/// A saved snippet eligible for selection in the overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: i64,
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub usage_count: u32,
    #[serde(default)]
    pub last_used_at: Option<i64>,
}

impl Candidate {
    pub fn new(id: i64, name: &str, content: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            content: content.to_string(),
            tags: Vec::new(),
            category: None,
            usage_count: 0,
            last_used_at: None,
        }
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|tag| tag.to_string()).collect();
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn with_usage(mut self, usage_count: u32, last_used_at: Option<i64>) -> Self {
        self.usage_count = usage_count;
        self.last_used_at = last_used_at;
        self
    }

    /// Recency used for ordering; a candidate that was never used sorts as epoch 0.
    pub fn recency(&self) -> i64 {
        self.last_used_at.unwrap_or(0)
    }
}

/// One row of a ranked view. `score` is present only for non-empty queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub candidate: Candidate,
    pub score: Option<f64>,
}

impl RankedEntry {
    pub fn unscored(candidate: Candidate) -> Self {
        Self {
            candidate,
            score: None,
        }
    }
}

/// A window of the store's globally ordered candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub items: Vec<Candidate>,
    pub page_index: usize,
    pub total_pages: usize,
    pub total_count: usize,
}

impl Page {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            page_index: 0,
            total_pages: 0,
            total_count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStat {
    pub name: String,
    pub usage_count: u32,
}

pub fn normalize_for_search(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}
