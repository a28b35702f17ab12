//! Agents: one catalog site behind the shared four-stage pipeline.
//!
//! # Architecture
//!
//! - [`Agent`] - Profile, schema tables, rate limiter, fetcher and extractor for one site
//! - [`SiteExtractor`] - Site-specific URL construction and content parsing
//! - [`Capability`] / [`Stage`] - What an agent declares and the stages it enables
//! - [`AgentRegistry`] - Agents selectable by id, capability, stage and cover priority
//!
//! The stage operations themselves ([`Agent::search`], [`Agent::item`],
//! [`Agent::sub_items`], [`Agent::pages`]) live in the pipeline module and are
//! identical for every agent.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use aggregator_core::agents::build_default_registry;
//! use aggregator_core::fetch::HttpFetcher;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = build_default_registry(Arc::new(HttpFetcher::new()?));
//! let agent = registry.get("asurascans").ok_or("agent missing")?;
//!
//! for hit in agent.search("tower of god", 0, 1).await? {
//!     println!("{} {:?}", hit.id, hit.title);
//! }
//! # Ok(())
//! # }
//! ```

mod capability;
mod error;
mod extractor;
mod pipeline;
mod registry;

pub use capability::{Capability, CapabilitySet, Stage};
pub use error::{AgentError, BuildError, ExtractionError};
pub use extractor::{ParseContext, SiteExtractor};
pub use registry::AgentRegistry;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::fetch::{RateLimiter, RawFetcher};
use crate::model::{LookupRecord, SubItemRecord};
use crate::schema::SchemaTable;

/// Reference to an item or chapter handed between stages.
///
/// Stages prefer `url` when present and recognised for the stage, and fall
/// back to building a URL from `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRef {
    /// Agent-specific identifier.
    pub id: String,
    /// Direct URL, if the agent published one.
    pub url: Option<String>,
}

impl ItemRef {
    /// Creates a reference with an id only.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: None,
        }
    }

    /// Creates a reference with both id and URL.
    #[must_use]
    pub fn with_url(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: Some(url.into()),
        }
    }

    /// Builds a reference from a user-supplied id or URL.
    ///
    /// Anything starting with `http://` or `https://` is used as both.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.starts_with("http://") || input.starts_with("https://") {
            Self::with_url(input, input)
        } else {
            Self::new(input)
        }
    }
}

impl From<&LookupRecord> for ItemRef {
    fn from(record: &LookupRecord) -> Self {
        Self {
            id: record.id.clone(),
            url: record.url.clone(),
        }
    }
}

impl From<&SubItemRecord> for ItemRef {
    /// Uses the producing agent's external id and link; falls back to the
    /// record id, then to the link itself.
    fn from(record: &SubItemRecord) -> Self {
        let link = record.link_for(&record.source).map(str::to_string);
        let id = record
            .external_ids
            .get(&record.source)
            .cloned()
            .or_else(|| record.id.clone())
            .or_else(|| link.clone())
            .unwrap_or_default();
        Self { id, url: link }
    }
}

/// Static description of an agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentProfile {
    /// Unique agent id, also used as the key in `externalIds` / `externalLinks`.
    pub id: String,
    /// Human-readable name.
    pub label: String,
    /// Base URL of the site.
    pub host: String,
    /// Languages the site publishes in.
    pub languages: Vec<String>,
    /// Declared capabilities.
    pub capabilities: CapabilitySet,
    /// Selection order among agents with the same capability (lower first).
    pub priority: u32,
    /// Selection order as a cover image source (lower first).
    pub cover_priority: u32,
    /// Offset increment between result pages.
    pub offset_inc: u32,
    /// Highest 1-based page the paginated stages return results for.
    pub max_pages: u32,
    /// Attribution text.
    pub credits: Option<String>,
    /// Site icon.
    #[serde(rename = "iconURL")]
    pub icon_url: Option<String>,
    /// Item link template; `[id]` is replaced by the item id.
    #[serde(rename = "sourceURL")]
    pub source_url: Option<String>,
    /// Free-form tags.
    pub tags: Vec<String>,
}

impl AgentProfile {
    /// Creates a profile with no capabilities and a single result page.
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            host: host.into(),
            languages: Vec::new(),
            capabilities: CapabilitySet::empty(),
            priority: 0,
            cover_priority: 0,
            offset_inc: 0,
            max_pages: 1,
            credits: None,
            icon_url: None,
            source_url: None,
            tags: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_capabilities(mut self, capabilities: impl Into<CapabilitySet>) -> Self {
        self.capabilities = capabilities.into();
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: u32, cover_priority: u32) -> Self {
        self.priority = priority;
        self.cover_priority = cover_priority;
        self
    }

    #[must_use]
    pub fn with_pagination(mut self, offset_inc: u32, max_pages: u32) -> Self {
        self.offset_inc = offset_inc;
        self.max_pages = max_pages;
        self
    }

    #[must_use]
    pub fn with_credits(mut self, credits: impl Into<String>) -> Self {
        self.credits = Some(credits.into());
        self
    }

    #[must_use]
    pub fn with_icon_url(mut self, icon_url: impl Into<String>) -> Self {
        self.icon_url = Some(icon_url.into());
        self
    }

    #[must_use]
    pub fn with_source_url(mut self, template: impl Into<String>) -> Self {
        self.source_url = Some(template.into());
        self
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Returns true if the 1-based `page` is within the paginated range.
    #[must_use]
    pub fn page_in_range(&self, page: u32) -> bool {
        (1..=self.max_pages).contains(&page)
    }
}

/// The four schema tables of an agent, one per stage output.
#[derive(Debug, Clone)]
pub struct AgentSchemas {
    /// Search hit → [`LookupRecord`].
    pub lookup: SchemaTable,
    /// Item detail → [`ItemRecord`](crate::model::ItemRecord).
    pub item: SchemaTable,
    /// Chapter → [`SubItemRecord`].
    pub sub_item: SchemaTable,
    /// Page image → [`PageRecord`](crate::model::PageRecord).
    pub page: SchemaTable,
}

impl AgentSchemas {
    /// Returns the table used for `stage`'s records.
    #[must_use]
    pub fn for_stage(&self, stage: Stage) -> &SchemaTable {
        match stage {
            Stage::Search => &self.lookup,
            Stage::ItemDetail => &self.item,
            Stage::SubItemListing => &self.sub_item,
            Stage::LeafContent => &self.page,
        }
    }
}

/// One catalog site: its profile, schema tables, rate limiter, raw fetcher
/// and site extractor.
///
/// Constructed once and immutable afterwards, apart from the limiter's own
/// bookkeeping. Share it behind an `Arc`; every stage call on every clone of
/// the `Arc` goes through the same limiter.
pub struct Agent {
    profile: AgentProfile,
    schemas: AgentSchemas,
    limiter: RateLimiter,
    fetcher: Arc<dyn RawFetcher>,
    extractor: Box<dyn SiteExtractor>,
}

impl Agent {
    /// Assembles an agent.
    #[must_use]
    pub fn new(
        profile: AgentProfile,
        schemas: AgentSchemas,
        limiter: RateLimiter,
        fetcher: Arc<dyn RawFetcher>,
        extractor: Box<dyn SiteExtractor>,
    ) -> Self {
        Self {
            profile,
            schemas,
            limiter,
            fetcher,
            extractor,
        }
    }

    /// Returns the agent id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.profile.id
    }

    /// Returns the human-readable name.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.profile.label
    }

    /// Returns the site's base URL.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.profile.host
    }

    #[must_use]
    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    #[must_use]
    pub fn schemas(&self) -> &AgentSchemas {
        &self.schemas
    }

    #[must_use]
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Returns the declared capabilities.
    #[must_use]
    pub fn capabilities(&self) -> CapabilitySet {
        self.profile.capabilities
    }

    /// Returns true if the declared capabilities enable `stage`.
    ///
    /// Answers without calling the site. The pipeline itself does not check
    /// capabilities; callers select agents with this.
    #[must_use]
    pub fn supports(&self, stage: Stage) -> bool {
        self.profile.capabilities.supports(stage)
    }

    /// Fills the profile's source link template for item `id`.
    #[must_use]
    pub fn source_link(&self, id: &str) -> Option<String> {
        let slug = id.trim_matches('/').rsplit('/').next().unwrap_or(id);
        self.profile
            .source_url
            .as_deref()
            .map(|template| template.replace("[id]", slug))
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.profile.id)
            .field("host", &self.profile.host)
            .field("capabilities", &self.profile.capabilities)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::fetch::RateLimiter;
    use crate::test_support::{StubExtractor, ScriptedFetcher, stub_schemas};

    fn stub_agent(profile: AgentProfile) -> Agent {
        Agent::new(
            profile,
            stub_schemas("stub"),
            RateLimiter::disabled(),
            Arc::new(ScriptedFetcher::new()),
            Box::new(StubExtractor::default()),
        )
    }

    #[test]
    fn test_item_ref_parse_url_and_id() {
        assert_eq!(
            ItemRef::parse(" https://host/series/x "),
            ItemRef::with_url("https://host/series/x", "https://host/series/x")
        );
        assert_eq!(ItemRef::parse("/series/x"), ItemRef::new("/series/x"));
    }

    #[test]
    fn test_item_ref_from_lookup_record() {
        let record: LookupRecord = serde_json::from_value(serde_json::json!({
            "id": "/series/tower-of-god",
            "url": "https://host/series/tower-of-god"
        }))
        .unwrap();
        let item = ItemRef::from(&record);
        assert_eq!(item.id, "/series/tower-of-god");
        assert_eq!(item.url.as_deref(), Some("https://host/series/tower-of-god"));
    }

    #[test]
    fn test_item_ref_from_sub_item_prefers_agent_keys() {
        let record = SubItemRecord {
            id: None,
            titles: BTreeMap::new(),
            manga_id: None,
            lang_available: Some("en".to_string()),
            poster_image: None,
            volume: None,
            chapter: Some(1.0),
            pages: None,
            publish_at: None,
            readable_at: None,
            external_ids: BTreeMap::from([("stub".to_string(), "ch-1".to_string())]),
            external_links: BTreeMap::from([("stub".to_string(), "https://host/ch/1".to_string())]),
            source: "stub".to_string(),
        };
        let item = ItemRef::from(&record);
        assert_eq!(item.id, "ch-1");
        assert_eq!(item.url.as_deref(), Some("https://host/ch/1"));

        let link_only = SubItemRecord {
            external_ids: BTreeMap::new(),
            ..record
        };
        assert_eq!(ItemRef::from(&link_only).id, "https://host/ch/1");
    }

    #[test]
    fn test_profile_page_range_is_one_based() {
        let profile = AgentProfile::new("stub", "Stub", "https://host").with_pagination(100, 1);
        assert!(!profile.page_in_range(0));
        assert!(profile.page_in_range(1));
        assert!(!profile.page_in_range(2));

        let deep = profile.with_pagination(20, 3);
        assert!(deep.page_in_range(3));
        assert!(!deep.page_in_range(4));
    }

    #[test]
    fn test_agent_supports_declared_stages_only() {
        let agent = stub_agent(
            AgentProfile::new("stub", "Stub", "https://host")
                .with_capabilities([Capability::ChapterFetch]),
        );
        assert!(!agent.supports(Stage::Search));
        assert!(!agent.supports(Stage::ItemDetail));
        assert!(agent.supports(Stage::SubItemListing));
        assert!(agent.supports(Stage::LeafContent));
    }

    #[test]
    fn test_agent_source_link_fills_template() {
        let agent = stub_agent(
            AgentProfile::new("stub", "Stub", "https://host")
                .with_source_url("https://host/series/[id]"),
        );
        assert_eq!(
            agent.source_link("/series/tower-of-god").as_deref(),
            Some("https://host/series/tower-of-god")
        );
        assert_eq!(
            stub_agent(AgentProfile::new("x", "X", "https://x")).source_link("a"),
            None
        );
    }

    #[test]
    fn test_agent_debug_names_agent() {
        let agent = stub_agent(AgentProfile::new("stub", "Stub", "https://host"));
        let debug = format!("{agent:?}");
        assert!(debug.contains("stub"));
        assert!(debug.contains("https://host"));
    }

    #[test]
    fn test_profile_serializes_for_listing() {
        let profile = AgentProfile::new("stub", "Stub", "https://host")
            .with_capabilities([Capability::MetadataFetch])
            .with_icon_url("https://host/logo.webp");
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["capabilities"], serde_json::json!(["metadata_fetch"]));
        assert_eq!(value["iconURL"], serde_json::json!("https://host/logo.webp"));
        assert_eq!(value["maxPages"], serde_json::json!(1));
    }
}
