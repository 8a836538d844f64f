//! Fallback User-Agent for HTTP clients built without a page session.
//!
//! Adapters that drive a real browser report the browser's own User-Agent
//! through [`SessionInfo`](crate::page::SessionInfo); signed URLs are only
//! honoured for that value, so this string is used solely when none is known.

/// Project URL for User-Agent identification (RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/vidloader/vidloader";

/// Default User-Agent for segment and manifest requests.
#[must_use]
pub(crate) fn default_download_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("vidloader/{version} (+{PROJECT_UA_URL})")
}
