//! The four retrieval stages shared by every agent.
//!
//! Each stage takes a limiter slot, fetches raw content, hands it to the
//! site extractor and normalizes every candidate through the stage's schema
//! table. Search, item detail and page resolution log failures and return
//! them; chapter listing logs and returns `None`.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, info, instrument};

use super::{Agent, AgentError, ExtractionError, ItemRef, ParseContext, Stage};
use crate::model::{ItemRecord, LookupRecord, PageRecord, SubItemRecord};
use crate::schema::{CandidateRecord, FieldPath, MappingError, SchemaTable, external_id_path};

impl Agent {
    /// Searches the catalog.
    ///
    /// Pages are 1-based; a page outside `1..=max_pages` yields an empty
    /// result without touching the network. Records come back in extractor
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if the fetch, extraction or normalization fails.
    #[instrument(skip(self), fields(agent = %self.id()))]
    pub async fn search(
        &self,
        query: &str,
        offset: u32,
        page: u32,
    ) -> Result<Vec<LookupRecord>, AgentError> {
        if !self.profile().page_in_range(page) {
            debug!(page, max_pages = self.profile().max_pages, "page out of range");
            return Ok(Vec::new());
        }

        let url = self.extractor.search_url(self.host(), query, offset, page);
        let result = self.run_search(&url).await;
        self.report(Stage::Search, &url, result)
    }

    async fn run_search(&self, url: &str) -> Result<Vec<LookupRecord>, AgentError> {
        let stage = Stage::Search;
        let raw = self.fetch_raw(stage, url).await?;
        let ctx = self.parse_context(url, None);
        let candidates = self
            .extractor
            .parse_search(&raw, &ctx)
            .map_err(|source| AgentError::extraction(self.id(), stage, url, source))?;
        let records = self.materialize_all(stage, url, &candidates)?;
        info!(agent = %self.id(), count = records.len(), "search complete");
        Ok(records)
    }

    /// Fetches full metadata for one item.
    ///
    /// Deterministic for identical raw content.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if the fetch, extraction or normalization fails,
    /// or if the record has no external id for this agent.
    #[instrument(skip(self), fields(agent = %self.id(), id = %item.id))]
    pub async fn item(&self, item: &ItemRef) -> Result<ItemRecord, AgentError> {
        let stage = Stage::ItemDetail;
        let url = self.target_url(stage, item, || self.extractor.item_url(self.host(), &item.id));
        let result = self.run_item(&url, item).await;
        self.report(stage, &url, result)
    }

    async fn run_item(&self, url: &str, item: &ItemRef) -> Result<ItemRecord, AgentError> {
        let stage = Stage::ItemDetail;
        let raw = self.fetch_raw(stage, url).await?;
        let ctx = self.parse_context(url, Some(item));
        let candidate = self
            .extractor
            .parse_item(&raw, &ctx)
            .map_err(|source| AgentError::extraction(self.id(), stage, url, source))?;
        let mut record: ItemRecord = self.materialize(stage, url, &candidate)?;

        // Fall back to the profile's link template when the page gave none.
        if !record.external_links.contains_key(self.id())
            && let Some(link) = self.source_link(&record.id)
        {
            record.external_links.insert(self.id().to_string(), link);
        }
        Ok(record)
    }

    /// Lists the chapters of one item.
    ///
    /// Returns `Some(vec![])` for a page outside `1..=max_pages`. When `lang`
    /// is given, chapters published in another language are dropped. Any
    /// failure is logged and reported as `None`, never as an error.
    #[instrument(skip(self), fields(agent = %self.id(), id = %item.id))]
    pub async fn sub_items(
        &self,
        item: &ItemRef,
        offset: u32,
        page: u32,
        lang: Option<&str>,
    ) -> Option<Vec<SubItemRecord>> {
        if !self.profile().page_in_range(page) {
            debug!(page, max_pages = self.profile().max_pages, "page out of range");
            return Some(Vec::new());
        }

        let stage = Stage::SubItemListing;
        let url = self.target_url(stage, item, || {
            self.extractor
                .sub_items_url(self.host(), &item.id, offset, page, lang)
        });

        match self.run_sub_items(&url, item, lang).await {
            Ok(records) => Some(records),
            Err(error) => {
                error!(
                    agent = %self.id(),
                    stage = %stage,
                    url = %url,
                    error = %error,
                    "chapter listing failed"
                );
                None
            }
        }
    }

    async fn run_sub_items(
        &self,
        url: &str,
        item: &ItemRef,
        lang: Option<&str>,
    ) -> Result<Vec<SubItemRecord>, AgentError> {
        let stage = Stage::SubItemListing;
        let raw = self.fetch_raw(stage, url).await?;
        let ctx = self.parse_context(url, Some(item));
        let candidates = self
            .extractor
            .parse_sub_items(&raw, &ctx)
            .map_err(|source| AgentError::extraction(self.id(), stage, url, source))?;
        let records: Vec<SubItemRecord> = self.materialize_all(stage, url, &candidates)?;

        let total = records.len();
        let kept: Vec<SubItemRecord> = records
            .into_iter()
            .filter(|record| language_matches(record, lang))
            .collect();
        info!(
            agent = %self.id(),
            count = kept.len(),
            filtered = total - kept.len(),
            "chapter listing complete"
        );
        Ok(kept)
    }

    /// Resolves the page images of one chapter.
    ///
    /// Pages keep extractor order. A page without an extracted ordinal is
    /// numbered by its position, starting at 1.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if the fetch, extraction or normalization fails.
    #[instrument(skip(self), fields(agent = %self.id(), id = %chapter.id))]
    pub async fn pages(&self, chapter: &ItemRef) -> Result<Vec<PageRecord>, AgentError> {
        let stage = Stage::LeafContent;
        let url = self.target_url(stage, chapter, || {
            self.extractor.pages_url(self.host(), &chapter.id)
        });
        let result = self.run_pages(&url, chapter).await;
        self.report(stage, &url, result)
    }

    async fn run_pages(&self, url: &str, chapter: &ItemRef) -> Result<Vec<PageRecord>, AgentError> {
        let stage = Stage::LeafContent;
        let raw = self.fetch_raw(stage, url).await?;
        let ctx = self.parse_context(url, Some(chapter));
        let candidates = self
            .extractor
            .parse_pages(&raw, &ctx)
            .map_err(|source| AgentError::extraction(self.id(), stage, url, source))?;
        let mut pages: Vec<PageRecord> = self.materialize_all(stage, url, &candidates)?;

        for (position, page) in (1u32..).zip(pages.iter_mut()) {
            if page.page == 0 {
                page.page = position;
            }
        }
        info!(agent = %self.id(), count = pages.len(), "page resolution complete");
        Ok(pages)
    }

    // ==================== Shared plumbing ====================

    /// Uses the reference's URL when the extractor recognises it for `stage`.
    fn target_url(&self, stage: Stage, item: &ItemRef, build: impl FnOnce() -> String) -> String {
        match item.url.as_deref() {
            Some(url) if self.extractor.recognizes_url(stage, url) => url.to_string(),
            _ => build(),
        }
    }

    fn parse_context<'a>(&'a self, url: &'a str, item: Option<&'a ItemRef>) -> ParseContext<'a> {
        ParseContext {
            agent_id: self.id(),
            host: self.host(),
            url,
            item,
        }
    }

    /// Fetches `url` through this agent's limiter.
    async fn fetch_raw(&self, stage: Stage, url: &str) -> Result<String, AgentError> {
        let options = self.extractor.fetch_options(stage);
        let fetcher = Arc::clone(&self.fetcher);
        let target = url.to_string();
        debug!(agent = %self.id(), stage = %stage, url, "fetching");

        self.limiter
            .schedule(move || async move { fetcher.fetch(&target, &options).await })
            .await
            .map_err(|source| AgentError::fetch(self.id(), stage, url, source))
    }

    fn materialize_all<T: DeserializeOwned>(
        &self,
        stage: Stage,
        url: &str,
        candidates: &[CandidateRecord],
    ) -> Result<Vec<T>, AgentError> {
        candidates
            .iter()
            .map(|candidate| self.materialize(stage, url, candidate))
            .collect()
    }

    /// Normalizes one candidate through the stage's table and types it.
    fn materialize<T: DeserializeOwned>(
        &self,
        stage: Stage,
        url: &str,
        candidate: &CandidateRecord,
    ) -> Result<T, AgentError> {
        let table = self.schemas().for_stage(stage);
        let canonical = table
            .normalize(candidate)
            .map_err(|source| AgentError::mapping(self.id(), stage, url, source))?;

        if declares_missing_external_id(table, self.id(), &canonical) {
            return Err(AgentError::extraction(
                self.id(),
                stage,
                url,
                ExtractionError::MissingExternalId {
                    agent: self.id().to_string(),
                    entity: table.entity().to_string(),
                },
            ));
        }

        serde_json::from_value(Value::Object(canonical)).map_err(|source| {
            AgentError::mapping(self.id(), stage, url, MappingError::shape(table.entity(), source))
        })
    }

    /// Logs a failed stage with its context and hands the result back.
    fn report<T>(&self, stage: Stage, url: &str, result: Result<T, AgentError>) -> Result<T, AgentError> {
        if let Err(error) = &result {
            error!(
                agent = %self.id(),
                stage = %stage,
                url = %url,
                error = %error,
                "stage failed"
            );
        }
        result
    }
}

fn declares_missing_external_id(
    table: &SchemaTable,
    agent_id: &str,
    canonical: &serde_json::Map<String, Value>,
) -> bool {
    let path = external_id_path(agent_id);
    if !table.contains(&path) {
        return false;
    }
    FieldPath::parse(&path)
        .ok()
        .and_then(|path| path.lookup(canonical).cloned())
        .is_none_or(|value| match value {
            Value::Null => true,
            Value::String(text) => text.trim().is_empty(),
            _ => false,
        })
}

fn language_matches(record: &SubItemRecord, lang: Option<&str>) -> bool {
    match (lang, record.lang_available.as_deref()) {
        (Some(wanted), Some(available)) => wanted.eq_ignore_ascii_case(available),
        _ => true,
    }
}
