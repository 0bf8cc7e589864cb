use anyhow::Context;
use handlebars::Handlebars;
use url::Url;

use crate::page::{
    archive_url, download_branch, format_count, web_url_for, LoadedRepository, PageData,
    RepositoryView,
};

use super::HtmlError;

const PAGE_TEMPLATE: &str = "page";
const FALLBACK_DESCRIPTION: &str = "No description available.";

/// Compiled page templates.
///
/// Every interpolation goes through the default handlebars HTML escaping.
pub struct Templates {
    registry: Handlebars<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, anyhow::Error> {
        let mut registry = Handlebars::new();
        registry
            .register_template_string(PAGE_TEMPLATE, include_str!("page.hbs"))
            .context("invalid page template")?;

        Ok(Self { registry })
    }

    pub fn render_page(&self, page: &PageData) -> Result<String, anyhow::Error> {
        let context = PageContext::new(page);
        self.registry
            .render(PAGE_TEMPLATE, &context)
            .context("could not render page")
    }
}

#[derive(serde::Serialize, Debug)]
struct PageContext<'a> {
    title: &'a str,
    welcome_message: &'a str,
    owner: &'a str,
    owner_url: String,
    owner_display_url: String,
    repositories: Vec<RepositoryOption<'a>>,
    selected: &'a str,
    no_selection: bool,
    load_failed: bool,
    repository: Option<RepositoryContext>,
}

#[derive(serde::Serialize, Debug)]
struct RepositoryOption<'a> {
    name: &'a str,
    selected: bool,
}

#[derive(serde::Serialize, Debug)]
struct RepositoryContext {
    full_name: String,
    html_url: String,
    description: String,
    archive_url: String,
    branch: String,
    stars: String,
    forks: String,
    watchers: String,
    open_issues: String,
    profile: Option<ProfileContext>,
    readme: String,
}

#[derive(serde::Serialize, Debug)]
struct ProfileContext {
    avatar_url: Option<String>,
    avatar_alt: String,
    display_name: String,
    bio: Option<String>,
    profile_url: String,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|x| !x.trim().is_empty())
}

/// Only http(s) urls from the API are used as link or image targets.
fn web_link(value: &Option<String>) -> Option<&str> {
    non_empty(value).filter(|x| {
        Url::parse(x)
            .map(|url| matches!(url.scheme(), "http" | "https"))
            .unwrap_or(false)
    })
}

impl<'a> PageContext<'a> {
    fn new(page: &'a PageData) -> Self {
        let owner = page.config.owner.as_str();
        let owner_url = web_url_for(&page.web_url, &[owner]);
        let owner_display_url = format!(
            "{}/{}",
            page.web_url.host_str().unwrap_or_default(),
            owner
        );

        let repository = match &page.view {
            RepositoryView::Loaded(repo) => Some(RepositoryContext::new(page, repo)),
            RepositoryView::NoSelection | RepositoryView::LoadFailed => None,
        };

        Self {
            title: &page.config.title,
            welcome_message: &page.config.welcome_message,
            owner,
            owner_url: owner_url.to_string(),
            owner_display_url,
            repositories: page
                .repositories
                .iter()
                .map(|name| RepositoryOption {
                    name,
                    selected: *name == page.selected,
                })
                .collect(),
            selected: &page.selected,
            no_selection: page.view == RepositoryView::NoSelection,
            load_failed: page.view == RepositoryView::LoadFailed,
            repository,
        }
    }
}

impl RepositoryContext {
    fn new(page: &PageData, repo: &LoadedRepository) -> Self {
        let owner = page.config.owner.as_str();
        let detail = &repo.detail;
        let branch = download_branch(detail);

        let profile = repo.owner.as_ref().map(|profile| {
            let login = non_empty(&profile.login).unwrap_or(owner);
            ProfileContext {
                avatar_url: web_link(&profile.avatar_url).map(|x| x.to_string()),
                avatar_alt: format!("Avatar of {}", login),
                display_name: non_empty(&profile.name).unwrap_or(login).to_string(),
                bio: non_empty(&profile.bio).map(|x| x.to_string()),
                profile_url: web_link(&profile.html_url)
                    .map(|x| x.to_string())
                    .unwrap_or_else(|| web_url_for(&page.web_url, &[owner]).to_string()),
            }
        });

        Self {
            full_name: non_empty(&detail.full_name)
                .map(|x| x.to_string())
                .unwrap_or_else(|| format!("{}/{}", owner, page.selected)),
            html_url: web_link(&detail.html_url).unwrap_or("#").to_string(),
            description: non_empty(&detail.description)
                .unwrap_or(FALLBACK_DESCRIPTION)
                .to_string(),
            archive_url: archive_url(&page.web_url, owner, &page.selected, &branch).to_string(),
            branch,
            stars: format_count(detail.stargazers_count),
            forks: format_count(detail.forks_count),
            watchers: format_count(detail.subscribers_count),
            open_issues: format_count(detail.open_issues_count),
            profile,
            readme: repo.readme.clone(),
        }
    }
}

/// Standalone error page. Does not depend on the templates, so it also
/// works when rendering them failed.
pub fn render_html_error(error: &HtmlError) -> String {
    let details = error
        .source
        .as_ref()
        .map(|err| format!("<hr><pre>{}</pre>", handlebars::html_escape(&format!("{:#}", err))))
        .unwrap_or_default();

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"UTF-8\"><title>Error</title></head>\n<body><p class=\"error\">{}</p>{}</body>\n</html>\n",
        handlebars::html_escape(&error.message),
        details
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        config::PageConfig,
        source::{OwnerProfile, RepositoryDetail},
    };

    fn page(view: RepositoryView, repositories: &[&str], selected: &str) -> PageData {
        PageData {
            config: Arc::new(PageConfig::default()),
            web_url: "https://github.com".parse().unwrap(),
            repositories: repositories.iter().map(|x| x.to_string()).collect(),
            selected: selected.to_string(),
            view,
        }
    }

    fn loaded(detail: RepositoryDetail, readme: &str, owner: Option<OwnerProfile>) -> RepositoryView {
        RepositoryView::Loaded(Box::new(LoadedRepository {
            detail,
            readme: readme.to_string(),
            owner,
        }))
    }

    fn render(page: &PageData) -> String {
        Templates::new().unwrap().render_page(page).unwrap()
    }

    #[test]
    fn test_render_no_selection_with_text_input() {
        let html = render(&page(RepositoryView::NoSelection, &[], ""));

        assert!(html.contains("<title>GitHub Repository Explorer</title>"));
        assert!(html.contains("Please select a repository from the list."));
        assert!(html.contains(r#"<input type="text" id="repo" name="repo" value="" required>"#));
        assert!(!html.contains("<select"));
        assert!(!html.contains("repository-meta"));
        assert!(html.contains(r#"<a href="https://github.com/symfony" target="_blank" rel="noopener">github.com/symfony</a>"#));
    }

    #[test]
    fn test_render_load_failure() {
        let html = render(&page(RepositoryView::LoadFailed, &["console", "yaml"], "yaml"));

        assert!(html.contains("The repository could not be loaded. Please try again later."));
        assert!(!html.contains("Please select a repository"));
        assert!(!html.contains("repository-meta"));
        assert!(html.contains(r#"<option value="console">console</option>"#));
        assert!(html.contains(r#"<option value="yaml" selected>yaml</option>"#));
    }

    #[test]
    fn test_render_loaded_repository() {
        let detail = RepositoryDetail {
            full_name: Some("symfony/console".to_string()),
            html_url: Some("https://github.com/symfony/console".to_string()),
            description: None,
            default_branch: Some("7.2".to_string()),
            stargazers_count: Some(9712),
            forks_count: Some(262),
            subscribers_count: None,
            open_issues_count: Some(0),
        };
        let owner = OwnerProfile {
            login: Some("symfony".to_string()),
            name: Some("".to_string()),
            avatar_url: None,
            bio: Some("Framework".to_string()),
            html_url: None,
        };
        let html = render(&page(loaded(detail, "", Some(owner)), &["console"], "console"));

        assert!(html.contains(r#"<a href="https://github.com/symfony/console" target="_blank" rel="noopener">symfony/console</a>"#));
        assert!(html.contains("<p>No description available.</p>"));
        assert!(html.contains(
            r#"href="https://github.com/symfony/console/archive/refs/heads/7.2.zip""#
        ));
        assert!(html.contains("Branch: 7.2"));
        assert!(html.contains("<div>9.7k</div>"));
        assert!(html.contains("<div>262</div>"));
        assert!(html.contains("<div>N/A</div>"));
        assert!(html.contains("<div>0</div>"));
        assert!(html.contains("<div><strong>symfony</strong></div>"));
        assert!(html.contains("<div>Framework</div>"));
        assert!(!html.contains("<img"));
        assert!(html.contains("No README found for this repository."));
    }

    #[test]
    fn test_render_fallbacks_and_readme() {
        let owner = OwnerProfile::default();
        let html = render(&page(
            loaded(RepositoryDetail::default(), "Hello\nWorld", Some(owner)),
            &[],
            "custom",
        ));

        assert!(html.contains(r##"<a href="#" target="_blank" rel="noopener">symfony/custom</a>"##));
        assert!(html.contains("archive/refs/heads/main.zip"));
        assert!(html.contains("<pre>Hello\nWorld</pre>"));
        assert!(html.contains("<div><strong>symfony</strong></div>"));
        assert!(html.contains(r#"<a href="https://github.com/symfony" target="_blank" rel="noopener">GitHub profile</a>"#));
        assert!(html.contains(r#"value="custom""#));
    }

    #[test]
    fn test_render_without_profile() {
        let html = render(&page(
            loaded(RepositoryDetail::default(), "", None),
            &["console"],
            "console",
        ));

        assert!(html.contains("repository-meta"));
        assert!(!html.contains("<h2>Owner</h2>"));
    }

    #[test]
    fn test_render_escapes_remote_text() {
        let detail = RepositoryDetail {
            full_name: Some("<b>evil</b>".to_string()),
            html_url: Some("javascript:alert(\"x\")".to_string()),
            description: Some("Tom & Jerry's <script>".to_string()),
            ..Default::default()
        };
        let owner = OwnerProfile {
            name: Some("<img src=x>".to_string()),
            bio: Some("\"quoted\"".to_string()),
            ..Default::default()
        };
        let html = render(&page(
            loaded(detail, "<h1>README</h1> & more", Some(owner)),
            &["a<b"],
            "a<b",
        ));

        assert!(!html.contains("<b>evil</b>"));
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<img src=x>"));
        assert!(!html.contains("<h1>README</h1>"));
        assert!(!html.contains("a<b"));
        assert!(html.contains("&lt;b&gt;evil&lt;/b&gt;"));
        assert!(html.contains("Tom &amp; Jerry"));
        assert!(html.contains("&lt;h1&gt;README&lt;/h1&gt; &amp; more"));
        assert!(html.contains("&quot;quoted&quot;"));
        assert!(!html.contains("\"x\""));
    }

    #[test]
    fn test_render_only_links_web_urls() {
        let detail = RepositoryDetail {
            full_name: Some("symfony/console".to_string()),
            html_url: Some("javascript:alert(1)".to_string()),
            ..Default::default()
        };
        let owner = OwnerProfile {
            login: Some("symfony".to_string()),
            avatar_url: Some("data:image/svg+xml,<svg/>".to_string()),
            html_url: Some("javascript:alert(2)".to_string()),
            ..Default::default()
        };
        let html = render(&page(loaded(detail, "", Some(owner)), &["console"], "console"));

        assert!(!html.contains("javascript:"));
        assert!(!html.contains("data:image"));
        assert!(!html.contains("<img"));
        assert!(html.contains(r##"<a href="#" target="_blank" rel="noopener">symfony/console</a>"##));
        assert!(html.contains(r#"<a href="https://github.com/symfony" target="_blank" rel="noopener">GitHub profile</a>"#));
    }

    #[test]
    fn test_web_link() {
        assert_eq!(web_link(&Some("https://github.com/x".to_string())), Some("https://github.com/x"));
        assert_eq!(web_link(&Some("http://example.com".to_string())), Some("http://example.com"));
        assert_eq!(web_link(&Some("JavaScript:alert(1)".to_string())), None);
        assert_eq!(web_link(&Some("/relative".to_string())), None);
        assert_eq!(web_link(&Some(" ".to_string())), None);
        assert_eq!(web_link(&None), None);
    }

    #[test]
    fn test_render_html_error() {
        let error = HtmlError {
            message: "<boom>".to_string(),
            status: axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            source: Some(anyhow::anyhow!("a & b")),
        };
        let html = render_html_error(&error);

        assert_eq!(
            html,
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"UTF-8\"><title>Error</title></head>\n<body><p class=\"error\">&lt;boom&gt;</p><hr><pre>a &amp; b</pre></body>\n</html>\n"
        );
    }
}
