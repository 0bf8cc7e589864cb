use std::path::Path;

use anyhow::{bail, Context};

pub const DEFAULT_OWNER: &str = "symfony";
pub const DEFAULT_TITLE: &str = "GitHub Repository Explorer";
pub const DEFAULT_WELCOME_MESSAGE: &str =
    "Explore GitHub repositories including owner information and README.";

/// Page configuration.
///
/// Loaded once at startup and shared read-only between requests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageConfig {
    /// Account whose repositories are listed. Never empty.
    pub owner: String,
    /// Repository shown when the request does not name one. May be empty.
    pub default_repository: String,
    pub title: String,
    pub welcome_message: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            owner: DEFAULT_OWNER.to_string(),
            default_repository: String::new(),
            title: DEFAULT_TITLE.to_string(),
            welcome_message: DEFAULT_WELCOME_MESSAGE.to_string(),
        }
    }
}

/// Optional settings, as found in a config file or on the command line.
#[derive(serde::Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    pub owner: Option<String>,
    pub default_repository: Option<String>,
    pub title: Option<String>,
    pub welcome_message: Option<String>,
}

impl ConfigOverrides {
    /// Parse a JSON config file.
    pub fn parse_json(raw: &str) -> Result<Self, anyhow::Error> {
        let jd = &mut serde_json::Deserializer::from_str(raw);
        let overrides = serde_path_to_error::deserialize(jd)?;
        Ok(overrides)
    }

    pub async fn load_file(path: &Path) -> Result<Self, anyhow::Error> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("could not read config file '{}'", path.display()))?;

        Self::parse_json(&raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))
    }

    /// Values set in `self` win over values set in `other`.
    pub fn or(self, other: Self) -> Self {
        Self {
            owner: self.owner.or(other.owner),
            default_repository: self.default_repository.or(other.default_repository),
            title: self.title.or(other.title),
            welcome_message: self.welcome_message.or(other.welcome_message),
        }
    }

    /// Fill in defaults for everything that was not set.
    pub fn resolve(self) -> Result<PageConfig, anyhow::Error> {
        let defaults = PageConfig::default();
        let trimmed = |value: Option<String>, default: String| {
            value.map(|x| x.trim().to_string()).unwrap_or(default)
        };

        let config = PageConfig {
            owner: trimmed(self.owner, defaults.owner),
            default_repository: trimmed(self.default_repository, defaults.default_repository),
            title: trimmed(self.title, defaults.title),
            welcome_message: trimmed(self.welcome_message, defaults.welcome_message),
        };

        if config.owner.is_empty() {
            bail!("repository owner must not be empty");
        }

        Ok(config)
    }
}
