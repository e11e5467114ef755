use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use clap::Parser;
use log::{debug, info};
use tokio_util::sync::CancellationToken;

use keystone_token::config::Options;
use keystone_token::{get_token, logs, Token};

/// Acquire an authentication token from an OpenStack Identity v3 service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct App {
    /// Config file path, default is `~/.config/keystone-token.toml`.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Identity endpoint, env `OS_AUTH_URL`.
    #[arg(short, long)]
    endpoint: Option<String>,

    /// User domain name, env `OS_USER_DOMAIN_NAME`.
    #[arg(short, long)]
    domain: Option<String>,

    /// User domain id, env `OS_USER_DOMAIN_ID`.
    #[arg(long)]
    domain_id: Option<String>,

    /// User name, env `OS_USERNAME`.
    #[arg(short, long)]
    user: Option<String>,

    /// Password. Prefer env `OS_PASSWORD` to keep it out of shell history.
    #[arg(long)]
    password: Option<String>,

    /// Log level, one of `error`, `warn`, `info` and `debug`.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print the token as json.
    #[arg(long)]
    json: bool,
}

impl App {
    fn build_options(&self) -> Result<Options> {
        let mut opts = Options::read(self.config.clone())?;

        let overrides = [
            (&self.endpoint, &mut opts.endpoint),
            (&self.domain, &mut opts.domain_name),
            (&self.domain_id, &mut opts.domain_id),
            (&self.user, &mut opts.username),
            (&self.password, &mut opts.password),
        ];
        for (value, field) in overrides {
            if let Some(value) = value {
                *field = value.clone();
            }
        }

        opts.merge_env(|key| env::var(key).ok());
        opts.complete().context("validate config")?;
        Ok(opts)
    }

    async fn run(&self) -> Result<()> {
        logs::init(&self.log_level)?;

        let opts = self.build_options()?;
        debug!("Use options: {:?}", opts);

        let cancel = CancellationToken::new();
        let ctrl_c = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                ctrl_c.cancel();
            }
        });

        info!(
            "Requesting token from '{}' as user '{}'",
            opts.endpoint, opts.username
        );
        let token = get_token(&cancel, &opts).await.context("get token")?;
        info!("Token acquired, expires at {}", token.expires_at());

        self.print(&token)
    }

    fn print(&self, token: &Token) -> Result<()> {
        let mut stdout = io::stdout();
        if self.json {
            let data = serde_json::to_string(token).context("encode token json")?;
            writeln!(stdout, "{data}")?;
        } else {
            writeln!(stdout, "{}", token.id())?;
            writeln!(
                stdout,
                "{}",
                token
                    .expires_at()
                    .to_rfc3339_opts(SecondsFormat::Micros, true)
            )?;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let app = App::parse();
    match app.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            _ = writeln!(io::stderr(), "Fatal: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
