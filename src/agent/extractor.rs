//! The site-specific half of an agent.

use super::{ExtractionError, ItemRef, Stage};
use crate::fetch::FetchOptions;
use crate::schema::CandidateRecord;

/// What an extractor knows about the content it is parsing.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    /// Id of the agent the extractor belongs to.
    pub agent_id: &'a str,
    /// Base URL of the agent's site.
    pub host: &'a str,
    /// URL the content was fetched from.
    pub url: &'a str,
    /// The item or chapter being resolved (absent for search).
    pub item: Option<&'a ItemRef>,
}

/// URL construction and content parsing for one catalog site.
///
/// Extractors are pure: they never fetch, and the same raw content always
/// yields the same candidate records. Candidates use the site's own field
/// names; the agent's schema tables map them onto canonical records.
///
/// Pagination and URL selection are decided by the pipeline. URL builders
/// receive ids and cursors only.
pub trait SiteExtractor: Send + Sync {
    /// URL of the search results page for `query`.
    fn search_url(&self, host: &str, query: &str, offset: u32, page: u32) -> String;

    /// URL of the detail page for item `id`.
    fn item_url(&self, host: &str, id: &str) -> String;

    /// URL listing the chapters of item `id`.
    fn sub_items_url(
        &self,
        host: &str,
        id: &str,
        offset: u32,
        page: u32,
        lang: Option<&str>,
    ) -> String;

    /// URL of the page-image listing for chapter `id`.
    fn pages_url(&self, host: &str, id: &str) -> String;

    /// Returns true if `url` can be fetched directly for `stage`.
    ///
    /// When an [`ItemRef`] carries a URL the pipeline uses it only if this
    /// returns true; otherwise it builds one from the id.
    fn recognizes_url(&self, stage: Stage, url: &str) -> bool {
        let _ = (stage, url);
        true
    }

    /// Fetch options for `stage`. Defaults to browser-like headers.
    fn fetch_options(&self, stage: Stage) -> FetchOptions {
        let _ = stage;
        FetchOptions::browser()
    }

    /// Parses a search results page.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError`] if the content cannot be parsed.
    fn parse_search(
        &self,
        raw: &str,
        ctx: &ParseContext<'_>,
    ) -> Result<Vec<CandidateRecord>, ExtractionError>;

    /// Parses an item detail page.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError`] if the content cannot be parsed.
    fn parse_item(&self, raw: &str, ctx: &ParseContext<'_>)
    -> Result<CandidateRecord, ExtractionError>;

    /// Parses a chapter listing.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError`] if the content cannot be parsed.
    fn parse_sub_items(
        &self,
        raw: &str,
        ctx: &ParseContext<'_>,
    ) -> Result<Vec<CandidateRecord>, ExtractionError>;

    /// Parses a chapter's page-image listing, in reading order.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError`] if the content cannot be parsed.
    fn parse_pages(
        &self,
        raw: &str,
        ctx: &ParseContext<'_>,
    ) -> Result<Vec<CandidateRecord>, ExtractionError>;
}
