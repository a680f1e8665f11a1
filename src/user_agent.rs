//! User-Agent string sent with every request.

/// Product token identifying the tool.
const PRODUCT: &str = "parallel-downloader";

/// Default User-Agent for probe and range requests (identifies the tool).
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("{PRODUCT}/{version} (ranged-http-client)")
}
