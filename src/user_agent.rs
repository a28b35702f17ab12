//! Shared User-Agent string for catalog requests.
//!
//! Single source for the tool's UA format so every agent's non-browser
//! traffic identifies itself the same way.

/// Product token used in the User-Agent header.
const PRODUCT: &str = "aggregator";

/// Default User-Agent for fetches that do not ask for browser-like headers.
///
/// Shared by all agents; the agent id is not part of the header.
#[must_use]
pub(crate) fn default_fetch_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{PRODUCT}/{version} (catalog-aggregator)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_carries_crate_version() {
        let ua = default_fetch_user_agent();
        assert_eq!(
            env!("CARGO_PKG_VERSION"),
            ua.strip_prefix("aggregator/")
                .and_then(|s| s.split(' ').next())
                .expect("UA has version"),
            "UA must contain crate version"
        );
    }

    #[test]
    fn test_user_agent_identifies_tool() {
        let ua = default_fetch_user_agent();
        assert!(
            ua.contains("catalog-aggregator"),
            "UA must identify the tool: {ua}"
        );
    }
}
