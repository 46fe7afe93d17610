use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use log::{info, warn};
use std::io::IsTerminal;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

use crate::concourse::{ConcourseClient, TokenAcquirer};
use crate::config::{Config, DashboardSettings};
use crate::error::BoardError;
use crate::matrix::{build_matrix, MatrixQuery};
use crate::output::{link, print_matrix, FetchProgress};
use crate::server::{self, Dashboard};
use crate::target::{Target, TargetStore, DEFAULT_TARGET_NAME};

#[derive(Parser)]
#[command(name = "progress-board")]
#[command(
    author,
    version,
    about = "Shows which jobs consumed the latest versions of a Concourse resource",
    long_about = None
)]
#[command(group(
    ArgGroup::new("login")
        .required(true)
        .args(["target", "username"])
))]
pub struct Cli {
    /// Previously saved Concourse target
    #[arg(short, long, conflicts_with_all = ["username", "password", "url"])]
    target: Option<String>,

    /// Username (logs in and saves a new target)
    #[arg(short, long, requires_all = ["password", "url"])]
    username: Option<String>,

    /// Password
    #[arg(short, long)]
    password: Option<String>,

    /// Concourse team name (only needed when logging in with username and password)
    #[arg(long, default_value = "main")]
    teamname: String,

    /// Concourse URL (only needed when logging in with username and password)
    #[arg(long)]
    url: Option<String>,

    /// Skip TLS verification when logging in
    #[arg(short = 'k', long, default_value_t = false)]
    insecure: bool,

    /// Pipeline
    #[arg(short = 'n', long)]
    pipeline: String,

    /// Resource to track
    #[arg(short, long)]
    resource: String,

    /// Jobs to show, separated by '|' (read from standard input when omitted)
    #[arg(short, long, value_delimiter = '|')]
    jobs: Vec<String>,

    /// Listen on the local address instead of $PORT
    #[arg(short, long, default_value_t = false)]
    local: bool,

    /// Automatically open browser window
    #[arg(short = 'a', long, default_value_t = false)]
    open: bool,

    /// Port to listen on without --local
    #[arg(long, env = "PORT")]
    port: Option<String>,

    /// Settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the matrix once to the terminal and exit
    #[arg(long, default_value_t = false)]
    print: bool,
}

impl Cli {
    async fn resolve_target(&self, store: &TargetStore) -> Result<Target> {
        if let Some(name) = &self.target {
            return store
                .load(name)
                .with_context(|| format!("Failed to load target '{name}'"));
        }

        let (Some(username), Some(password), Some(url)) =
            (&self.username, &self.password, &self.url)
        else {
            return Err(BoardError::Config(
                "Please provide either --target or --username, --password and --url".into(),
            )
            .into());
        };

        info!("Logging in to {url} as {username}");

        let token = TokenAcquirer::new(url, self.insecure)?
            .acquire(username, password)
            .await
            .with_context(|| format!("Failed to log in to {url}"))?;

        store.save(
            DEFAULT_TARGET_NAME,
            url,
            &self.teamname,
            &token.token_type,
            &token.value,
            self.insecure,
        )?;
        info!("Credentials saved to {}", store.path().display());

        Ok(store.load(DEFAULT_TARGET_NAME)?)
    }

    async fn resolve_jobs(&self, config: &Config) -> Result<Vec<String>> {
        let jobs = if !self.jobs.is_empty() {
            clean_job_names(self.jobs.iter().map(String::as_str))
        } else if !config.dashboard.jobs.is_empty() {
            clean_job_names(config.dashboard.jobs.iter().map(String::as_str))
        } else if !std::io::stdin().is_terminal() {
            let mut input = String::new();
            tokio::io::stdin()
                .read_to_string(&mut input)
                .await
                .context("Failed to read job names from standard input")?;
            clean_job_names(input.lines())
        } else {
            Vec::new()
        };

        if jobs.is_empty() {
            warn!("No jobs given; the dashboard at / will only list versions");
        } else {
            info!("Tracking jobs: {}", jobs.join(", "));
        }

        Ok(jobs)
    }

    fn bind_addr(&self, config: &Config) -> Result<String> {
        if self.local {
            return Ok(config.server.local_addr.clone());
        }

        let port = match self.port.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => raw.parse::<u16>().map_err(|_| {
                BoardError::Config(format!("PORT must be a port number, got '{raw}'"))
            })?,
            _ => config.server.port.ok_or_else(|| {
                BoardError::Config("PORT must be set unless --local is given".into())
            })?,
        };

        Ok(format!("0.0.0.0:{port}"))
    }

    async fn print_snapshot(
        &self,
        client: &ConcourseClient,
        query: &MatrixQuery,
        settings: &DashboardSettings,
    ) -> Result<()> {
        let progress = FetchProgress::start(&query.resource, query.limit);

        match build_matrix(client, query, settings.max_in_flight).await {
            Ok(matrix) => {
                progress.finish(matrix.rows.len());
                print_matrix(&query.pipeline, &matrix);
                Ok(())
            }
            Err(BoardError::Unauthorized) => {
                progress.fail();
                Err(anyhow::anyhow!(server::UNAUTHORIZED_MESSAGE))
            }
            Err(e) => {
                progress.fail();
                Err(e.into())
            }
        }
    }

    pub async fn execute(&self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;
        let settings = DashboardSettings::from(&config.dashboard);

        // Fail on a missing port before asking the CI server for a token.
        let bind_addr = if self.print {
            None
        } else {
            Some(self.bind_addr(&config)?)
        };

        let target = self.resolve_target(&TargetStore::from_home()?).await?;
        info!("Using target '{}' ({}, team {})", target.name, target.api, target.team);

        let jobs = self.resolve_jobs(&config).await?;
        let client = ConcourseClient::new(&target)?;

        let query = MatrixQuery {
            team: target.team.clone(),
            pipeline: self.pipeline.clone(),
            resource: self.resource.clone(),
            jobs,
            limit: settings.limit,
        };

        let Some(bind_addr) = bind_addr else {
            return self.print_snapshot(&client, &query, &settings).await;
        };

        let listener = TcpListener::bind(&bind_addr)
            .await
            .with_context(|| format!("Failed to bind to {bind_addr}"))?;
        let local_addr = listener.local_addr()?;
        info!("Listening on {local_addr}");

        let page_url = if self.local {
            format!("http://{local_addr}")
        } else {
            format!("http://127.0.0.1:{}", local_addr.port())
        };

        if self.local {
            eprintln!("Server running at: {}", link(&page_url));
        }
        if self.open {
            server::open_browser(page_url);
        }

        server::serve(
            listener,
            Dashboard {
                client,
                settings,
                default_query: query,
            },
        )
        .await
        .context("Server stopped unexpectedly")
    }
}

fn clean_job_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    names
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
        .collect()
}
