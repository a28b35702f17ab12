//! Fakes for unit tests: a scripted [`RawFetcher`] and a stub [`SiteExtractor`].

pub mod socket_guard;

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::agent::{AgentSchemas, ExtractionError, ParseContext, SiteExtractor, Stage};
use crate::fetch::{FetchError, FetchOptions, RawFetcher};
use crate::schema::{CandidateRecord, SchemaTable};

/// Turns a JSON object literal into a candidate record.
///
/// # Panics
///
/// Panics if `value` is not an object.
#[must_use]
pub fn candidate(value: Value) -> CandidateRecord {
    match value {
        Value::Object(record) => record,
        other => panic!("candidate must be a JSON object, got {other}"),
    }
}

/// Fetcher answering from a script keyed by URL suffix; records every call.
///
/// URLs with no scripted answer fail with [`FetchError::Unavailable`].
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    script: Vec<(String, String)>,
    failures: Mutex<Vec<(String, FetchError)>>,
    calls: Mutex<Vec<String>>,
    options: Mutex<Vec<FetchOptions>>,
}

impl ScriptedFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers URLs ending in `suffix` with `body`.
    #[must_use]
    pub fn respond(mut self, suffix: &str, body: &str) -> Self {
        self.script.push((suffix.to_string(), body.to_string()));
        self
    }

    /// Fails URLs ending in `suffix` with `error` (once; later calls are unavailable).
    #[must_use]
    pub fn fail(self, suffix: &str, error: FetchError) -> Self {
        self.failures
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((suffix.to_string(), error));
        self
    }

    /// URLs fetched so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Options passed with each call, in call order.
    #[must_use]
    pub fn options(&self) -> Vec<FetchOptions> {
        self.options
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl RawFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<String, FetchError> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(url.to_string());
        self.options
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(options.clone());

        {
            let mut failures = self
                .failures
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(index) = failures.iter().position(|(suffix, _)| url.ends_with(suffix.as_str())) {
                return Err(failures.remove(index).1);
            }
        }

        self.script
            .iter()
            .find(|(suffix, _)| url.ends_with(suffix.as_str()))
            .map(|(_, body)| body.clone())
            .ok_or_else(|| FetchError::unavailable(url, "no scripted response"))
    }
}

/// Extractor returning canned candidates; URLs are `{host}/search?q=..`,
/// `{host}/item/{id}`, `{host}/chapters/{id}` and `{host}/pages/{id}`.
#[derive(Debug, Clone, Default)]
pub struct StubExtractor {
    search: Vec<CandidateRecord>,
    item: CandidateRecord,
    sub_items: Vec<CandidateRecord>,
    pages: Vec<CandidateRecord>,
    failing: bool,
    rejecting_urls: bool,
}

impl StubExtractor {
    #[must_use]
    pub fn with_search(mut self, records: Vec<CandidateRecord>) -> Self {
        self.search = records;
        self
    }

    #[must_use]
    pub fn with_item(mut self, record: CandidateRecord) -> Self {
        self.item = record;
        self
    }

    #[must_use]
    pub fn with_sub_items(mut self, records: Vec<CandidateRecord>) -> Self {
        self.sub_items = records;
        self
    }

    #[must_use]
    pub fn with_pages(mut self, records: Vec<CandidateRecord>) -> Self {
        self.pages = records;
        self
    }

    /// Every parse fails with [`ExtractionError::UnexpectedShape`].
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// No reference URL is recognised; stages always build from the id.
    #[must_use]
    pub fn rejecting_urls(mut self) -> Self {
        self.rejecting_urls = true;
        self
    }

    fn answer<T: Clone>(&self, value: &T) -> Result<T, ExtractionError> {
        if self.failing {
            Err(ExtractionError::unexpected_shape("stub configured to fail"))
        } else {
            Ok(value.clone())
        }
    }
}

impl SiteExtractor for StubExtractor {
    fn search_url(&self, host: &str, query: &str, _offset: u32, _page: u32) -> String {
        format!("{host}/search?q={query}")
    }

    fn item_url(&self, host: &str, id: &str) -> String {
        format!("{host}/item/{id}")
    }

    fn sub_items_url(
        &self,
        host: &str,
        id: &str,
        _offset: u32,
        _page: u32,
        _lang: Option<&str>,
    ) -> String {
        format!("{host}/chapters/{id}")
    }

    fn pages_url(&self, host: &str, id: &str) -> String {
        format!("{host}/pages/{id}")
    }

    fn recognizes_url(&self, _stage: Stage, _url: &str) -> bool {
        !self.rejecting_urls
    }

    fn parse_search(
        &self,
        _raw: &str,
        _ctx: &ParseContext<'_>,
    ) -> Result<Vec<CandidateRecord>, ExtractionError> {
        self.answer(&self.search)
    }

    fn parse_item(
        &self,
        _raw: &str,
        _ctx: &ParseContext<'_>,
    ) -> Result<CandidateRecord, ExtractionError> {
        self.answer(&self.item)
    }

    fn parse_sub_items(
        &self,
        _raw: &str,
        _ctx: &ParseContext<'_>,
    ) -> Result<Vec<CandidateRecord>, ExtractionError> {
        self.answer(&self.sub_items)
    }

    fn parse_pages(
        &self,
        _raw: &str,
        _ctx: &ParseContext<'_>,
    ) -> Result<Vec<CandidateRecord>, ExtractionError> {
        self.answer(&self.pages)
    }
}

/// Schema tables matching the [`StubExtractor`] candidate field names.
///
/// # Panics
///
/// Panics if a table is malformed.
#[must_use]
pub fn stub_schemas(agent_id: &str) -> AgentSchemas {
    let lookup = SchemaTable::builder("lookup")
        .field("id", "id")
        .field("title", "name")
        .field("status", "state")
        .field("url", "url")
        .external_id(agent_id, "id")
        .external_link(agent_id, "url")
        .build();
    let item = SchemaTable::builder("manga")
        .field("id", "id")
        .field("canonicalTitle", "title")
        .field("genres", "genres")
        .external_id(agent_id, "id")
        .build();
    let sub_item = SchemaTable::builder("chapter")
        .field("id", "id")
        .field("chapter", "chapter")
        .field("langAvailable", "lang")
        .external_id(agent_id, "id")
        .external_link(agent_id, "uri")
        .source_tag(agent_id)
        .build();
    let page = SchemaTable::builder("page")
        .field("page", "page")
        .field("pageURL", "url")
        .field("chapterId", "chapterId")
        .field("mangaId", "")
        .field("referer", "referer")
        .build();

    match (lookup, item, sub_item, page) {
        (Ok(lookup), Ok(item), Ok(sub_item), Ok(page)) => AgentSchemas {
            lookup,
            item,
            sub_item,
            page,
        },
        _ => panic!("stub schema tables must be well formed"),
    }
}
