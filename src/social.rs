use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Symbol/keyword social-mention search capability.
#[async_trait]
pub trait SocialSource: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<Post>>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub text: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub public_metrics: Option<PublicMetrics>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicMetrics {
    #[serde(default)]
    pub retweet_count: u64,
    #[serde(default)]
    pub reply_count: u64,
    #[serde(default)]
    pub like_count: u64,
}

#[derive(Deserialize, Debug)]
struct RecentSearchResponse {
    // Absent entirely when the query matches nothing.
    #[serde(default)]
    data: Option<Vec<Post>>,
}

const RECENT_SEARCH_URL: &str = "https://api.x.com/2/tweets/search/recent";

pub struct SocialClient {
    client: Client,
    bearer_token: Option<String>,
}

impl SocialClient {
    pub fn new(client: Client, bearer_token: Option<String>) -> Self {
        Self { client, bearer_token }
    }
}

#[async_trait]
impl SocialSource for SocialClient {
    async fn search(&self, query: &str) -> Result<Vec<Post>> {
        let Some(token) = self.bearer_token.as_deref() else {
            bail!("X_BEARER_TOKEN is not configured");
        };

        let response = self
            .client
            .get(RECENT_SEARCH_URL)
            .bearer_auth(token)
            .query(&[
                ("query", query),
                ("max_results", "10"),
                ("tweet.fields", "created_at,lang,public_metrics"),
            ])
            .send()
            .await
            .context("social request failed")?
            .error_for_status()
            .context("social provider rejected the request")?;

        let data: RecentSearchResponse =
            response.json().await.context("invalid social payload")?;
        Ok(data.data.unwrap_or_default())
    }
}
