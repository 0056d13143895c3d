//! User-Agent string for our own HTTP traffic.
//!
//! The upstream User-Agent a relay should present is a per-asset hint sent
//! as a query parameter; this module only covers the header we send.

const PROJECT_UA_URL: &str = "https://github.com/fierce/media-acquire";

/// Default User-Agent for relay, quota, parse and identity requests.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("media-acquire/{version} (+{PROJECT_UA_URL})")
}
