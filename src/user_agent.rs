//! Shared User-Agent strings for forge and geocoder HTTP clients.
//!
//! The geocoding service's usage policy requires an identifying agent, and
//! forge APIs reject anonymous agents, so both share one format.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/forge-harvest";

/// User-Agent for forge API requests.
#[must_use]
pub fn forge_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("forge-harvest/{version} (+{PROJECT_UA_URL})")
}

/// User-Agent for geocoding requests.
#[must_use]
pub fn geocoder_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("forge-harvest/{version} (country-lookup; +{PROJECT_UA_URL})")
}
