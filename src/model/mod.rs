//! Canonical records produced by every agent.
//!
//! These are the typed forms of what a [`SchemaTable`](crate::schema::SchemaTable)
//! normalizes a candidate into. Field names serialize in camelCase to match
//! the canonical paths the schema tables declare (`altTitles`,
//! `externalIds.<agent>`, `pageURL`).

pub mod de;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Agent-keyed identifiers or links (`externalIds.<agent>`).
pub type AgentKeyed = BTreeMap<String, String>;

/// A search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupRecord {
    #[serde(deserialize_with = "de::string")]
    pub id: String,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "de::string_list")]
    pub alt_titles: Vec<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub desc: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "de::opt_count")]
    pub year: Option<u32>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub cover: Option<String>,
    #[serde(default, deserialize_with = "de::string_list")]
    pub genre: Vec<String>,
    #[serde(default, deserialize_with = "de::opt_number")]
    pub score: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "de::opt_number")]
    pub last_chapter: Option<f64>,
    #[serde(default, deserialize_with = "de::string_list")]
    pub authors: Vec<String>,
    #[serde(default, deserialize_with = "de::string_map")]
    pub external_ids: AgentKeyed,
    #[serde(default, deserialize_with = "de::string_map")]
    pub external_links: AgentKeyed,
}

/// Full metadata for one catalog item (a manga / series).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    #[serde(deserialize_with = "de::string")]
    pub id: String,
    #[serde(rename = "type", default, deserialize_with = "de::opt_string")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub canonical_title: Option<String>,
    #[serde(default, deserialize_with = "de::string_list")]
    pub alt_titles: Vec<String>,
    #[serde(default, deserialize_with = "de::string_list")]
    pub genres: Vec<String>,
    /// Locale → description text (`en_us`).
    #[serde(default, deserialize_with = "de::string_map")]
    pub description: BTreeMap<String, String>,
    /// Agent id → cover image URL.
    #[serde(default, deserialize_with = "de::string_map")]
    pub cover_image: AgentKeyed,
    #[serde(default, deserialize_with = "de::opt_count")]
    pub chapter_count: Option<u32>,
    #[serde(default, deserialize_with = "de::opt_count")]
    pub start_year: Option<u32>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "de::string_list")]
    pub authors: Vec<String>,
    #[serde(default, deserialize_with = "de::string_map")]
    pub external_ids: AgentKeyed,
    #[serde(default, deserialize_with = "de::string_map")]
    pub external_links: AgentKeyed,
}

/// One chapter of an item.
///
/// `source` is always the id of the agent that produced the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubItemRecord {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub id: Option<String>,
    /// Language → chapter title.
    #[serde(default, deserialize_with = "de::string_map")]
    pub titles: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub manga_id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub lang_available: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub poster_image: Option<String>,
    #[serde(default, deserialize_with = "de::opt_number")]
    pub volume: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_number")]
    pub chapter: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_count")]
    pub pages: Option<u32>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub publish_at: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub readable_at: Option<String>,
    #[serde(default, deserialize_with = "de::string_map")]
    pub external_ids: AgentKeyed,
    #[serde(default, deserialize_with = "de::string_map")]
    pub external_links: AgentKeyed,
    #[serde(deserialize_with = "de::string")]
    pub source: String,
}

impl SubItemRecord {
    /// Returns the link this agent published for the chapter, if any.
    #[must_use]
    pub fn link_for(&self, agent_id: &str) -> Option<&str> {
        self.external_links.get(agent_id).map(String::as_str)
    }
}

/// One page image of a chapter.
///
/// `page` is 1-based; 0 means the extractor supplied no ordinal and the
/// pipeline numbers the page by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    #[serde(default, deserialize_with = "de::count")]
    pub page: u32,
    #[serde(rename = "pageURL", deserialize_with = "de::string")]
    pub page_url: String,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub chapter_id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub manga_id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub referer: Option<String>,
}
