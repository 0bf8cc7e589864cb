use std::sync::Arc;

use url::Url;

use crate::{
    config::PageConfig,
    source::{readme_text, repository_names, GithubApi, OwnerProfile, RepositoryDetail},
};

const FALLBACK_BRANCH: &str = "main";

/// Clean up a repository name taken from the query string.
///
/// HTML special characters and control characters are dropped, surrounding
/// whitespace is trimmed.
pub fn sanitize_repo_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '<' | '>' | '&' | '"' | '\'') && !c.is_ascii_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Pick the repository to show.
///
/// The requested name wins, then the configured default, then the most
/// recently updated repository. A name that is not among `available` is
/// replaced by the first available repository, unless the list is empty.
pub fn resolve_repository(
    requested: &str,
    default_repository: &str,
    available: &[String],
) -> String {
    // `.` and `..` would be resolved away when used as a url path segment.
    let name = [requested, default_repository]
        .into_iter()
        .find(|x| !matches!(*x, "" | "." | ".."))
        .unwrap_or_default();

    match available.first() {
        Some(first) if name.is_empty() || !available.iter().any(|x| x == name) => {
            if !name.is_empty() {
                tracing::debug!(
                    requested = %name,
                    fallback = %first,
                    "unknown repository, using fallback"
                );
            }
            first.clone()
        }
        _ => name.to_string(),
    }
}

/// Format a counter for display: `999`, `2.5k`, `1,234.6k` or `N/A`.
pub fn format_count(count: Option<i64>) -> String {
    let Some(count) = count else {
        return "N/A".to_string();
    };

    if count < 1_000 {
        return count.to_string();
    }

    // Round half up to a tenth of a thousand.
    let tenths = count / 100 + i64::from(count % 100 >= 50);
    format!("{}.{}k", group_thousands(tenths / 10), tenths % 10)
}

fn group_thousands(n: i64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Branch used for the archive download: the default branch, or `main`.
pub fn download_branch(detail: &RepositoryDetail) -> String {
    detail
        .default_branch
        .as_deref()
        .map(str::trim)
        .filter(|x| !x.is_empty())
        .unwrap_or(FALLBACK_BRANCH)
        .to_string()
}

/// Link to the zip archive of `branch`.
pub fn archive_url(web_url: &Url, owner: &str, repo: &str, branch: &str) -> Url {
    let archive = format!("{}.zip", branch);
    web_url_for(web_url, &[owner, repo, "archive", "refs", "heads", archive.as_str()])
}

/// Link to a page on the GitHub website.
///
/// Segments are percent-encoded; `.` and `..` are still treated as dot
/// segments, so callers must not pass them.
pub fn web_url_for(web_url: &Url, segments: &[&str]) -> Url {
    let mut url = web_url.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

/// Everything the repository page shows, resolved and fetched.
#[derive(Clone, Debug, PartialEq)]
pub struct PageData {
    pub config: Arc<PageConfig>,
    pub web_url: Url,
    /// Repositories of the owner, most recently updated first.
    pub repositories: Vec<String>,
    /// Effective repository name. Empty if nothing could be selected.
    pub selected: String,
    pub view: RepositoryView,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RepositoryView {
    /// No repository selected.
    NoSelection,
    /// The repository details could not be loaded.
    LoadFailed,
    Loaded(Box<LoadedRepository>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoadedRepository {
    pub detail: RepositoryDetail,
    /// Decoded README, empty if there is none.
    pub readme: String,
    pub owner: Option<OwnerProfile>,
}

/// Loads the data for the repository page.
#[derive(Clone)]
pub struct PageController {
    config: Arc<PageConfig>,
    api: Arc<dyn GithubApi>,
    web_url: Url,
}

impl PageController {
    pub fn new(config: Arc<PageConfig>, api: Arc<dyn GithubApi>, web_url: Url) -> Self {
        Self {
            config,
            api,
            web_url,
        }
    }

    pub fn config(&self) -> &PageConfig {
        &self.config
    }

    /// Fetch and merge everything for one page view.
    ///
    /// Remote failures never fail the page; they turn into missing data.
    #[tracing::instrument(skip(self))]
    pub async fn load(&self, requested: &str) -> PageData {
        let owner = self.config.owner.as_str();
        let requested = sanitize_repo_name(requested);

        let repositories = self
            .api
            .list_repositories(owner)
            .await
            .map(|list| repository_names(&list))
            .unwrap_or_else(|err| {
                tracing::warn!("could not load repository list: {:#}", err);
                Vec::new()
            });

        let selected =
            resolve_repository(&requested, &self.config.default_repository, &repositories);

        let (detail, readme) = if selected.is_empty() {
            (None, String::new())
        } else {
            let detail = self
                .api
                .repository(owner, &selected)
                .await
                .map_err(|err| tracing::warn!("could not load repository: {:#}", err))
                .ok()
                .and_then(RepositoryDetail::from_json);

            let readme = self
                .api
                .readme(owner, &selected)
                .await
                .map(|x| readme_text(&x))
                .unwrap_or_else(|err| {
                    tracing::warn!("could not load README: {:#}", err);
                    String::new()
                });

            (detail, readme)
        };

        let profile = self
            .api
            .user(owner)
            .await
            .map_err(|err| tracing::warn!("could not load owner profile: {:#}", err))
            .ok()
            .and_then(OwnerProfile::from_json);

        let view = match detail {
            _ if selected.is_empty() => RepositoryView::NoSelection,
            None => RepositoryView::LoadFailed,
            Some(detail) => RepositoryView::Loaded(Box::new(LoadedRepository {
                detail,
                readme,
                owner: profile,
            })),
        };

        PageData {
            config: self.config.clone(),
            web_url: self.web_url.clone(),
            repositories,
            selected,
            view,
        }
    }
}
