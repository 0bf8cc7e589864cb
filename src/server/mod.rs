mod routes;
mod ui;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{http::StatusCode, routing::get, Router};
use tower_http::trace::TraceLayer;
use url::Url;

use crate::{
    config::PageConfig,
    page::PageController,
    source::{
        github::{GithubClient, DEFAULT_API_URL, DEFAULT_WEB_URL},
        GithubApi,
    },
};

pub struct CtxBuilder {
    pub config: PageConfig,
    pub github_token: Option<String>,
    pub api_url: Option<Url>,
    pub web_url: Option<Url>,
}

impl CtxBuilder {
    pub fn new(config: PageConfig) -> Self {
        Self {
            config,
            github_token: None,
            api_url: None,
            web_url: None,
        }
    }

    pub fn github_token(mut self, token: Option<String>) -> Self {
        self.github_token = token;
        self
    }

    pub fn api_url(mut self, url: Option<Url>) -> Self {
        self.api_url = url;
        self
    }

    pub fn web_url(mut self, url: Option<Url>) -> Self {
        self.web_url = url;
        self
    }

    pub fn build(self) -> Result<Ctx, anyhow::Error> {
        let api_url = match self.api_url {
            Some(url) => url,
            None => DEFAULT_API_URL.parse()?,
        };
        let web_url = match self.web_url {
            Some(url) => url,
            None => DEFAULT_WEB_URL.parse()?,
        };

        let github = GithubClient::new(self.github_token, api_url)?;
        Ctx::new(self.config, Arc::new(github), web_url)
    }
}

/// Server context.
#[derive(Clone)]
pub struct Ctx {
    controller: PageController,
    templates: Arc<ui::Templates>,
}

impl Ctx {
    pub fn new(
        config: PageConfig,
        api: Arc<dyn GithubApi>,
        web_url: Url,
    ) -> Result<Self, anyhow::Error> {
        let controller = PageController::new(Arc::new(config), api, web_url);
        let templates = Arc::new(ui::Templates::new()?);

        Ok(Ctx {
            controller,
            templates,
        })
    }

    pub async fn run_server(self, port: u16) -> Result<(), anyhow::Error> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        run_server(addr, self).await
    }
}

pub const DEFAULT_PORT: u16 = 3333;

fn build_router(ctx: Ctx) -> Router {
    Router::new()
        .route(
            routes::repo_page::PATH_REPO_PAGE,
            get(routes::repo_page::handler_repo_page),
        )
        .with_state(ctx)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .layer(
            // A page load makes up to four sequential API calls of 10 seconds each.
            tower_http::timeout::TimeoutLayer::new(Duration::from_secs(60)),
        )
}

async fn run_server(addr: SocketAddr, ctx: Ctx) -> Result<(), anyhow::Error> {
    tracing::info!(owner = %ctx.controller.config().owner, "starting server: {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("could not bind port")?;

    let app = build_router(ctx);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("received shutdown signal");
}

struct HtmlError {
    message: String,
    status: StatusCode,
    source: Option<anyhow::Error>,
}

impl From<anyhow::Error> for HtmlError {
    fn from(source: anyhow::Error) -> Self {
        Self {
            message: "Internal server error".to_string(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
            source: Some(source),
        }
    }
}

impl axum::response::IntoResponse for HtmlError {
    fn into_response(self) -> axum::response::Response<axum::body::Body> {
        if let Some(source) = &self.source {
            tracing::error!("request failed: {:#}", source);
        }

        let body = ui::render_html_error(&self);
        (self.status, axum::response::Html(body)).into_response()
    }
}

#[cfg(test)]
fn test_router(api: Arc<dyn GithubApi>) -> Router {
    let ctx = Ctx::new(
        PageConfig::default(),
        api,
        DEFAULT_WEB_URL.parse().unwrap(),
    )
    .unwrap();
    build_router(ctx)
}
