use std::time::Duration;

use anyhow::{bail, Context};
use reqwest::RequestBuilder;
use serde_json::Value;
use url::Url;

use super::GithubApi;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_WEB_URL: &str = "https://github.com";

const USER_AGENT: &str = "github-repo-explorer";
const ACCEPT: &str = "application/vnd.github+json";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(serde::Serialize)]
struct ListReposQuery {
    per_page: u32,
    sort: &'static str,
}

#[derive(Clone)]
pub struct GithubClient {
    client: reqwest::Client,
    api_url: Url,
}

impl GithubClient {
    pub fn new(token: Option<String>, api_url: Url) -> Result<Self, anyhow::Error> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static(ACCEPT),
        );
        if let Some(token) = token {
            headers.insert(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", token)
                    .parse()
                    .context("Invalid Github auth token")?,
            );
        }

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("could not build http client")?;

        if api_url.cannot_be_a_base() {
            bail!("invalid Github API url: {}", api_url);
        }

        Ok(GithubClient { client, api_url })
    }

    /// Build an API url from raw path segments. Segments are percent-encoded,
    /// but `.` and `..` are still resolved as dot segments.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.api_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Send the request and parse the body as JSON, regardless of the status
    /// code. Only objects and arrays count as a successful response.
    async fn fetch_json(&self, builder: RequestBuilder) -> Result<Value, anyhow::Error> {
        let res = builder.send().await?;
        let status = res.status();
        tracing::debug!(url = %res.url(), %status, "Github API response");

        let body = res.text().await?;
        let value: Value = match deserialize_json(&body) {
            Ok(v) => v,
            Err(err) => Err(err).context("failed to parse json response")?,
        };

        if !value.is_object() && !value.is_array() {
            bail!("unexpected json response with status {}: {}", status, value);
        }

        Ok(value)
    }

    async fn get(&self, url: Url) -> Result<Value, anyhow::Error> {
        tracing::trace!(%url, "Github API request");
        let req = self.client.get(url.clone());
        self.fetch_json(req)
            .await
            .with_context(|| format!("request to {} failed", url))
    }
}

#[async_trait::async_trait]
impl GithubApi for GithubClient {
    async fn list_repositories(&self, owner: &str) -> Result<Value, anyhow::Error> {
        let mut url = self.url(&["users", owner, "repos"]);
        let query = serde_urlencoded::to_string(ListReposQuery {
            per_page: 100,
            sort: "updated",
        })?;
        url.set_query(Some(&query));
        self.get(url).await
    }

    async fn repository(&self, owner: &str, repo: &str) -> Result<Value, anyhow::Error> {
        self.get(self.url(&["repos", owner, repo])).await
    }

    async fn readme(&self, owner: &str, repo: &str) -> Result<Value, anyhow::Error> {
        self.get(self.url(&["repos", owner, repo, "readme"])).await
    }

    async fn user(&self, owner: &str) -> Result<Value, anyhow::Error> {
        self.get(self.url(&["users", owner])).await
    }
}

fn deserialize_json<T>(raw: &str) -> Result<T, serde_path_to_error::Error<serde_json::Error>>
where
    T: serde::de::DeserializeOwned,
{
    let jd = &mut serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize(jd)
}
