use base64::Engine;
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;

pub mod github;

/// Read access to the four GitHub resources the repository page is built from.
///
/// Each call returns the parsed JSON body, or an error for transport and
/// parse failures. HTTP error statuses are not failures: their body is
/// returned like any other.
#[async_trait::async_trait]
pub trait GithubApi: Send + Sync {
    /// Repositories of `owner`, most recently updated first.
    async fn list_repositories(&self, owner: &str) -> Result<Value, anyhow::Error>;

    async fn repository(&self, owner: &str, repo: &str) -> Result<Value, anyhow::Error>;

    async fn readme(&self, owner: &str, repo: &str) -> Result<Value, anyhow::Error>;

    async fn user(&self, owner: &str) -> Result<Value, anyhow::Error>;
}

/// Extract the repository names from a repository list response.
///
/// Entries without a non-empty string `name` are skipped.
pub fn repository_names(list: &Value) -> Vec<String> {
    let Some(entries) = list.as_array() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| entry.get("name")?.as_str())
        .filter(|name| !name.is_empty())
        .map(|name| name.to_string())
        .collect()
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct RepositoryDetail {
    #[serde(default, deserialize_with = "lenient")]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub html_url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub default_branch: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub stargazers_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub forks_count: Option<i64>,
    /// Watchers in the sense of the web UI. `watchers_count` mirrors the
    /// star count in the REST API.
    #[serde(default, deserialize_with = "lenient")]
    pub subscribers_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub open_issues_count: Option<i64>,
}

impl RepositoryDetail {
    /// Returns `None` unless `value` is a non-empty JSON object.
    pub fn from_json(value: Value) -> Option<Self> {
        from_non_empty_object(value)
    }
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct OwnerProfile {
    #[serde(default, deserialize_with = "lenient")]
    pub login: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub avatar_url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub bio: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub html_url: Option<String>,
}

impl OwnerProfile {
    /// Returns `None` unless `value` is a non-empty JSON object.
    pub fn from_json(value: Value) -> Option<Self> {
        from_non_empty_object(value)
    }
}

/// Decode the base64 `content` of a README response.
///
/// Missing or undecodable content yields an empty string.
pub fn readme_text(readme: &Value) -> String {
    let Some(content) = readme.get("content").and_then(|x| x.as_str()) else {
        return String::new();
    };

    // GitHub wraps the payload at 60 columns.
    let compact: String = content.split_ascii_whitespace().collect();

    match base64::engine::general_purpose::STANDARD.decode(compact) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(err) => {
            tracing::warn!("failed to decode README base64: {}", err);
            String::new()
        }
    }
}

fn from_non_empty_object<T: DeserializeOwned>(value: Value) -> Option<T> {
    match &value {
        Value::Object(map) if !map.is_empty() => serde_json::from_value(value).ok(),
        _ => None,
    }
}

/// Treat a field of unexpected type like a missing one.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}
