//! CLI argument definitions using clap derive macros.

use clap::{Parser, Subcommand};

/// Query external catalog sites through rate-limited agents.
///
/// Every command prints normalized records as pretty JSON on stdout.
#[derive(Parser, Debug)]
#[command(name = "aggregator")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Maximum simultaneous requests per agent (1-16)
    #[arg(short = 'c', long, global = true, value_parser = clap::value_parser!(u8).range(1..=16))]
    pub max_concurrent: Option<u8>,

    /// Minimum spacing between requests to one agent in milliseconds (0 to disable, max 60000)
    #[arg(short = 'l', long, global = true, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub min_time_ms: Option<u64>,

    /// HTTP connect timeout in seconds (1-3600)
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout: Option<u64>,

    /// HTTP request timeout in seconds (1-3600)
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub read_timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List registered agents with capabilities and limiter settings
    Agents,

    /// Search one agent, or every search-capable agent, for a title
    Search {
        /// Free-text title query
        query: String,

        /// Restrict the search to one agent id
        #[arg(short, long)]
        agent: Option<String>,

        /// Result page (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Result offset passed to the site
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },

    /// Fetch series metadata by id or URL
    Item {
        /// Site-specific id or absolute series URL
        id: String,

        /// Agent id (inferred from a URL host when omitted)
        #[arg(short, long)]
        agent: Option<String>,
    },

    /// List chapters of a series by id or URL
    Chapters {
        /// Site-specific id or absolute series URL
        id: String,

        /// Agent id (inferred from a URL host when omitted)
        #[arg(short, long)]
        agent: Option<String>,

        /// Keep only chapters in this language
        #[arg(long)]
        lang: Option<String>,

        /// Listing page (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Listing offset passed to the site
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },

    /// List page images of a chapter
    Pages {
        /// Absolute chapter URL or site-specific chapter id
        chapter: String,

        /// Agent id (inferred from a URL host when omitted)
        #[arg(short, long)]
        agent: Option<String>,
    },
}
