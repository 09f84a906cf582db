use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Keyword-based news search capability.
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<Article>>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub source: Option<ArticleSource>,
    #[serde(rename = "publishedAt", default)]
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleSource {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Deserialize, Debug)]
struct NewsResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

const NEWS_URL: &str = "https://newsapi.org/v2/everything";

pub struct NewsClient {
    client: Client,
    api_key: Option<String>,
}

impl NewsClient {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl NewsSource for NewsClient {
    async fn search(&self, query: &str) -> Result<Vec<Article>> {
        let Some(api_key) = self.api_key.as_deref() else {
            bail!("NEWSAPI_API_KEY is not configured");
        };

        let response = self
            .client
            .get(NEWS_URL)
            .query(&[
                ("q", query),
                ("sortBy", "publishedAt"),
                ("language", "en"),
                ("apiKey", api_key),
            ])
            .send()
            .await
            .context("news request failed")?
            .error_for_status()
            .context("news provider rejected the request")?;

        let data: NewsResponse = response.json().await.context("invalid news payload")?;
        Ok(data.articles)
    }
}
