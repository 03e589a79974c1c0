use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use reqwest::{Client, Response};

use super::{FetchedPage, HttpTransport};
use crate::config::CrawlConfig;

/// reqwest session shared by every HTTP strategy for the whole run.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(cfg: &CrawlConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("ko-KR,ko;q=0.9"));

        let client = Client::builder()
            .user_agent(cfg.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_secs(cfg.http_timeout_secs))
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ReqwestTransport { client })
    }

    async fn read(response: Response) -> Result<FetchedPage> {
        let status = response.status();
        let url = response.url().to_string();
        if !status.is_success() {
            bail!("HTTP {} for {}", status.as_u16(), url);
        }
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?;
        Ok(FetchedPage {
            url,
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        headers: &[(String, String)],
    ) -> Result<FetchedPage> {
        let mut request = self.client.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;
        Self::read(response).await
    }

    async fn post_form(&self, url: &str, form: &BTreeMap<String, String>) -> Result<FetchedPage> {
        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;
        Self::read(response).await
    }
}
