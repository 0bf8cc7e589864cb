use axum::{
    extract::{Query, State},
    response::Html,
};

use crate::server::{Ctx, HtmlError};

pub const PATH_REPO_PAGE: &str = "/";

#[derive(serde::Deserialize, Debug, Clone, Default)]
pub struct RepoPageQuery {
    pub repo: Option<String>,
}

/// Repository page. Data that could not be fetched is reported inside the
/// page, so this only fails on rendering bugs.
pub async fn handler_repo_page(
    State(ctx): State<Ctx>,
    query: Option<Query<RepoPageQuery>>,
) -> Result<Html<String>, HtmlError> {
    let requested = query
        .and_then(|Query(q)| q.repo)
        .unwrap_or_default();

    let page = ctx.controller.load(&requested).await;
    let html = ctx.templates.render_page(&page)?;

    Ok(Html(html))
}
