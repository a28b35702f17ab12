//! Asura Scans (`asuracomic.net`) agent.
//!
//! Series pages live at `/series/<slug>`; chapter pages at
//! `/series/<slug>/chapter/<n>`. Search is a single page of results.

use std::sync::Arc;
use std::time::Duration;

use scraper::Html;
use serde_json::{Map, Value, json};
use tracing::debug;

use super::AgentSettings;
use super::utils::{
    absolutize_url, clean_str, element_text, first_attr, first_text, selector, text_value,
};
use crate::agent::{
    Agent, AgentProfile, AgentSchemas, BuildError, Capability, ExtractionError, ParseContext,
    SiteExtractor, Stage,
};
use crate::fetch::{FetchOptions, RawFetcher};
use crate::schema::{CandidateRecord, MappingError, SchemaTable};

/// Agent id.
pub const ID: &str = "asurascans";
/// Production site.
pub const HOST: &str = "https://asuracomic.net";

const MAX_CONCURRENT: usize = 1;
const MIN_TIME: Duration = Duration::from_millis(1000);

selector!(SEARCH_CARD, "div.grid.grid-cols-2.gap-3.p-4 a");
selector!(SEARCH_COVER, "img");
selector!(SEARCH_NAME, "span.block.font-bold");
selector!(SEARCH_STATUS, "span.status");

selector!(ITEM_TITLE, "span.text-xl.font-bold");
selector!(ITEM_SCORE, ".rating-star > p");
selector!(ITEM_GENRE, "div.flex.flex-row.flex-wrap.gap-3 button");
selector!(ITEM_DESCRIPTION, "span.font-medium.text-sm p");
selector!(ITEM_COVER, r#"img[alt="poster"]"#);

selector!(
    CHAPTER_ROW,
    "div.overflow-y-auto.scrollbar-thumb-themecolor.scrollbar-track-transparent > div.cursor-pointer"
);
selector!(CHAPTER_LINK, "h3.font-medium a");

selector!(PAGE_IMAGE, r#"img[class*="object-cover mx-auto"]"#);

/// Builds the agent against the production site.
///
/// # Errors
///
/// Returns [`BuildError`] if a schema table or the limiter settings are invalid.
pub fn agent(fetcher: Arc<dyn RawFetcher>, settings: &AgentSettings) -> Result<Agent, BuildError> {
    agent_with_host(fetcher, settings, HOST)
}

/// Builds the agent against `host` (used by tests with a mock server).
///
/// # Errors
///
/// Returns [`BuildError`] if a schema table or the limiter settings are invalid.
pub fn agent_with_host(
    fetcher: Arc<dyn RawFetcher>,
    settings: &AgentSettings,
    host: &str,
) -> Result<Agent, BuildError> {
    let schemas = schemas().map_err(|source| BuildError::schema(ID, source))?;
    let limiter = settings
        .limiter(MAX_CONCURRENT, MIN_TIME)
        .map_err(|source| BuildError::limiter(ID, source))?;
    Ok(Agent::new(
        profile(host),
        schemas,
        limiter,
        fetcher,
        Box::new(AsurascansExtractor),
    ))
}

/// Static profile of the agent served from `host`.
#[must_use]
pub fn profile(host: &str) -> AgentProfile {
    let host = host.trim_end_matches('/');
    AgentProfile::new(ID, "Asurascans", host)
        .with_languages(["en"])
        .with_capabilities([Capability::MetadataFetch, Capability::ChapterFetch])
        .with_priority(40, 45)
        .with_pagination(100, 1)
        .with_credits("Asurascans")
        .with_icon_url(format!("{host}/images/logo.webp"))
        .with_source_url(format!("{host}/series/[id]"))
}

/// The four schema tables, keyed by the candidate names the extractor emits.
///
/// # Errors
///
/// Returns [`MappingError`] if a table is malformed.
pub fn schemas() -> Result<AgentSchemas, MappingError> {
    let lookup = SchemaTable::from_declarations(
        "lookup",
        &[
            ("id", "id"),
            ("title", "name"),
            ("altTitles", "synonyms"),
            ("desc", ""),
            ("url", "url"),
            ("year", "year"),
            ("cover", "cover"),
            ("genre", ""),
            ("score", ""),
            ("status", "state"),
            ("lastChapter", ""),
            ("authors", ""),
            ("externalIds.asurascans", "id"),
            ("externalLinks.asurascans", "uri"),
        ],
    )?;

    let item = SchemaTable::from_declarations(
        "manga",
        &[
            ("id", "id"),
            ("type", ""),
            ("canonicalTitle", "title"),
            ("altTitles", "altTitle"),
            ("genres", "genres"),
            ("description.en_us", "desc"),
            ("coverImage.asurascans", "cover"),
            ("chapterCount", "chapterCount"),
            ("startYear", "year"),
            ("status", "status"),
            ("authors", "authors"),
            ("externalIds.asurascans", "id"),
            ("externalLinks.asurascans", "uri"),
        ],
    )?;

    let sub_item = SchemaTable::builder("chapter")
        .omit("id")
        .field("titles.en", "title")
        .omit("mangaId")
        .field("langAvailable", "lang")
        .omit("posterImage")
        .field("volume", "volume")
        .field("chapter", "chapter")
        .omit("pages")
        .omit("publishAt")
        .omit("readableAt")
        .external_id(ID, "id")
        .external_link(ID, "uri")
        .source_tag(ID)
        .build()?;

    let page = SchemaTable::from_declarations(
        "page",
        &[
            ("page", "page"),
            ("pageURL", "url"),
            ("chapterId", "chapterId"),
            ("mangaId", ""),
            ("referer", "referer"),
        ],
    )?;

    Ok(AgentSchemas {
        lookup,
        item,
        sub_item,
        page,
    })
}

/// Series slug from an id such as `/series/tower-of-god`, `tower-of-god`
/// or a full series URL.
fn series_slug(id: &str) -> &str {
    let path = id
        .split_once("/series/")
        .map_or(id, |(_, rest)| rest)
        .trim_matches('/');
    path.split('/').next().unwrap_or(path)
}

/// Selectors and URL layout of the Asura Scans site.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsurascansExtractor;

impl SiteExtractor for AsurascansExtractor {
    fn search_url(&self, host: &str, query: &str, _offset: u32, _page: u32) -> String {
        format!("{host}/series?name={}", urlencoding::encode(query))
    }

    fn item_url(&self, host: &str, id: &str) -> String {
        format!("{host}/series/{}", series_slug(id))
    }

    fn sub_items_url(
        &self,
        host: &str,
        id: &str,
        _offset: u32,
        _page: u32,
        _lang: Option<&str>,
    ) -> String {
        self.item_url(host, id)
    }

    fn pages_url(&self, host: &str, id: &str) -> String {
        absolutize_url(id, &format!("{host}/series/")).unwrap_or_else(|| format!("{host}{id}"))
    }

    fn recognizes_url(&self, stage: Stage, url: &str) -> bool {
        let absolute = url.starts_with("http://") || url.starts_with("https://");
        match stage {
            Stage::Search => false,
            Stage::ItemDetail | Stage::SubItemListing => {
                absolute && url.contains("/series/") && !url.contains("/chapter/")
            }
            Stage::LeafContent => absolute && url.contains("/chapter/"),
        }
    }

    fn fetch_options(&self, stage: Stage) -> FetchOptions {
        match stage {
            Stage::LeafContent => FetchOptions::plain(),
            Stage::Search => FetchOptions::browser(),
            // Series slugs carry a rotating suffix; stale ones redirect.
            Stage::ItemDetail | Stage::SubItemListing => {
                FetchOptions::browser().follow_redirects(true)
            }
        }
    }

    fn parse_search(
        &self,
        raw: &str,
        ctx: &ParseContext<'_>,
    ) -> Result<Vec<CandidateRecord>, ExtractionError> {
        let document = Html::parse_document(raw);
        let base = format!("{}/", ctx.host);

        let results: Vec<CandidateRecord> = document
            .select(&SEARCH_CARD)
            .filter_map(|card| {
                let href = card.value().attr("href").map(clean_str)?;
                let id = if href.starts_with('/') {
                    href
                } else {
                    format!("/{href}")
                };
                let url = absolutize_url(&id, &base)?;

                let mut record = Map::new();
                record.insert("id".to_string(), json!(id));
                record.insert("url".to_string(), json!(url));
                record.insert("uri".to_string(), json!(url));
                record.insert(
                    "cover".to_string(),
                    text_value(first_attr(card, &SEARCH_COVER, "src")),
                );
                record.insert("name".to_string(), text_value(first_text(card, &SEARCH_NAME)));
                record.insert(
                    "state".to_string(),
                    text_value(first_text(card, &SEARCH_STATUS)),
                );
                Some(record)
            })
            .collect();

        debug!(count = results.len(), "parsed search results");
        Ok(results)
    }

    fn parse_item(
        &self,
        raw: &str,
        ctx: &ParseContext<'_>,
    ) -> Result<CandidateRecord, ExtractionError> {
        let document = Html::parse_document(raw);
        let root = document.root_element();

        let title =
            first_text(root, &ITEM_TITLE).ok_or_else(|| ExtractionError::missing_field("title"))?;
        let genres: Vec<Value> = document
            .select(&ITEM_GENRE)
            .map(element_text)
            .filter(|genre| !genre.is_empty())
            .map(Value::String)
            .collect();
        let id = ctx.item.map_or(ctx.url, |item| item.id.as_str());

        let mut record = Map::new();
        record.insert("id".to_string(), json!(id));
        record.insert("uri".to_string(), json!(ctx.url));
        record.insert("title".to_string(), json!(title));
        record.insert("score".to_string(), text_value(first_text(root, &ITEM_SCORE)));
        record.insert("genres".to_string(), Value::Array(genres));
        record.insert("desc".to_string(), text_value(first_text(root, &ITEM_DESCRIPTION)));
        record.insert(
            "cover".to_string(),
            text_value(first_attr(root, &ITEM_COVER, "src")),
        );
        Ok(record)
    }

    fn parse_sub_items(
        &self,
        raw: &str,
        ctx: &ParseContext<'_>,
    ) -> Result<Vec<CandidateRecord>, ExtractionError> {
        let document = Html::parse_document(raw);
        let base = format!("{}/series/", ctx.host);

        let results: Vec<CandidateRecord> = document
            .select(&CHAPTER_ROW)
            .filter_map(|row| {
                let link = row.select(&CHAPTER_LINK).next()?;
                let uri = link
                    .value()
                    .attr("href")
                    .and_then(|href| absolutize_url(href, &base))?;

                let mut record = Map::new();
                record.insert("id".to_string(), json!(uri));
                record.insert("uri".to_string(), json!(uri));
                record.insert("chapter".to_string(), json!(element_text(link)));
                record.insert("lang".to_string(), json!("en"));
                Some(record)
            })
            .collect();

        debug!(count = results.len(), "parsed chapter rows");
        Ok(results)
    }

    fn parse_pages(
        &self,
        raw: &str,
        ctx: &ParseContext<'_>,
    ) -> Result<Vec<CandidateRecord>, ExtractionError> {
        let document = Html::parse_document(raw);
        let chapter_id = ctx
            .item
            .map_or(ctx.url, |chapter| chapter.url.as_deref().unwrap_or(&chapter.id));
        let referer = format!("{}/", ctx.host);

        let results: Vec<CandidateRecord> = document
            .select(&PAGE_IMAGE)
            .filter_map(|image| {
                let src = image.value().attr("src").map(str::trim).filter(|src| !src.is_empty())?;
                let mut record = Map::new();
                record.insert("url".to_string(), json!(src));
                record.insert("chapterId".to_string(), json!(chapter_id));
                record.insert("title".to_string(), json!(image.value().attr("alt")));
                record.insert("referer".to_string(), json!(referer));
                Some(record)
            })
            .zip(1u32..)
            .map(|(mut record, page)| {
                record.insert("page".to_string(), json!(page));
                record
            })
            .collect();

        debug!(count = results.len(), "parsed page images");
        Ok(results)
    }
}
