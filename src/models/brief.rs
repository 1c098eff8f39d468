//! Daily brief: the thematic summary over the last day's corpus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One generated brief. Unique by date; regeneration upserts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brief {
    /// UTC midnight of the day the brief covers.
    pub date: DateTime<Utc>,
    pub summary: String,
    /// Most frequent taxonomy tags across the input set, most common first.
    pub top_tags: Vec<String>,
    pub article_count: usize,
    pub generated_at: DateTime<Utc>,
}
