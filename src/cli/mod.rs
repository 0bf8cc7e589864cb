use std::path::PathBuf;

use tracing_subscriber::EnvFilter;
use url::Url;

use repo_explorer::config::ConfigOverrides;

#[derive(clap::Parser)]
#[clap(about = "Browse the repositories of a GitHub account")]
pub struct Args {
    #[clap(subcommand)]
    pub cmd: Cmd,
}

impl Args {
    pub fn run(self) -> Result<(), anyhow::Error> {
        match self.cmd {
            Cmd::Serve(cmd) => cmd.run(),
        }
    }
}

#[derive(clap::Subcommand)]
pub enum Cmd {
    /// Serve the repository page.
    Serve(CmdServe),
}

#[derive(clap::Parser)]
pub struct CmdServe {
    #[clap(long, env = "PORT", default_value_t = repo_explorer::server::DEFAULT_PORT)]
    port: u16,

    /// JSON file with `owner`, `default_repository`, `title` and `welcome_message`.
    #[clap(long, env = "EXPLORER_CONFIG")]
    config: Option<PathBuf>,

    /// Account whose repositories are shown.
    #[clap(long, env = "GITHUB_OWNER")]
    owner: Option<String>,

    /// Repository shown when none is requested.
    #[clap(long, env = "DEFAULT_REPOSITORY")]
    default_repository: Option<String>,

    #[clap(long, env = "PAGE_TITLE")]
    title: Option<String>,

    #[clap(long, env = "WELCOME_MESSAGE")]
    welcome_message: Option<String>,

    /// Github token to use for Github API requests.
    #[clap(long, env = "GITHUB_TOKEN")]
    github_token: Option<String>,

    /// Base url of the Github REST API.
    #[clap(long, env = "GITHUB_API_URL")]
    api_url: Option<Url>,

    /// Base url of the Github website, used for links.
    #[clap(long, env = "GITHUB_WEB_URL")]
    web_url: Option<Url>,
}

impl CmdServe {
    #[tokio::main]
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::fmt().with_env_filter(filter).init();

        let file = match &self.config {
            Some(path) => ConfigOverrides::load_file(path).await?,
            None => ConfigOverrides::default(),
        };
        let config = ConfigOverrides {
            owner: self.owner,
            default_repository: self.default_repository,
            title: self.title,
            welcome_message: self.welcome_message,
        }
        .or(file)
        .resolve()?;

        repo_explorer::server::CtxBuilder::new(config)
            .github_token(self.github_token)
            .api_url(self.api_url)
            .web_url(self.web_url)
            .build()?
            .run_server(self.port)
            .await?;

        Ok(())
    }
}
