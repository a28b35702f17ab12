//! Merges file config and CLI flags into the settings the binary runs with.

use std::time::Duration;

use aggregator_core::{AgentSettings, FetcherSettings};

use crate::app_config::{FileConfig, VerbositySetting};
use crate::cli::Args;

/// Settings resolved from CLI flags over file config over built-in defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ResolvedSettings {
    pub(crate) fetcher: FetcherSettings,
    pub(crate) agents: AgentSettings,
    pub(crate) default_level: &'static str,
}

pub(crate) fn resolve_settings(args: &Args, file_config: Option<&FileConfig>) -> ResolvedSettings {
    let file = file_config.cloned().unwrap_or_default();
    let defaults = FetcherSettings::default();

    let fetcher = FetcherSettings {
        connect_timeout_secs: args
            .connect_timeout
            .or(file.connect_timeout_secs)
            .unwrap_or(defaults.connect_timeout_secs),
        read_timeout_secs: args
            .read_timeout
            .or(file.read_timeout_secs)
            .unwrap_or(defaults.read_timeout_secs),
    };

    let agents = AgentSettings {
        max_concurrent: args
            .max_concurrent
            .or(file.max_concurrent)
            .map(usize::from),
        min_time: args
            .min_time_ms
            .or(file.min_time_ms)
            .map(Duration::from_millis),
    };

    ResolvedSettings {
        fetcher,
        agents,
        default_level: resolve_default_level(args, file.verbosity),
    }
}

/// Quiet flag > verbose flags > file verbosity > info.
fn resolve_default_level(args: &Args, file_verbosity: Option<VerbositySetting>) -> &'static str {
    if args.quiet {
        return "error";
    }
    match args.verbose {
        0 => file_verbosity.map_or("info", VerbositySetting::default_level),
        1 => "debug",
        _ => "trace",
    }
}
