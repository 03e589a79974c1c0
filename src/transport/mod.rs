//! Capabilities the pipeline consumes: plain HTTP and a stateful browser session.
//!
//! Everything above this module talks to the traits only, so tests can swap in
//! in-memory fakes.

pub mod chrome;
pub mod http;

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;

/// A response body plus the URL it was finally served from (after redirects).
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        headers: &[(String, String)],
    ) -> Result<FetchedPage>;

    async fn post_form(&self, url: &str, form: &BTreeMap<String, String>) -> Result<FetchedPage>;
}

#[async_trait]
pub trait Browser: Send + Sync {
    /// Navigate and wait for the load to settle.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Rendered DOM of the top-level document.
    async fn page_source(&self) -> Result<String>;

    /// URLs of every resource the current document has requested.
    async fn network_log(&self) -> Result<Vec<String>>;

    async fn execute(&self, script: &str) -> Result<serde_json::Value>;

    /// Rendered DOM of an embedded frame, `None` when the frame is absent or cross-origin.
    async fn frame_source(&self, frame_selector: &str) -> Result<Option<String>>;
}
