use anyhow::{Context, bail};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use inquire::{Confirm, Password, PasswordDisplayMode};
use owm_core::{ClientConfig, WeatherClient};
use std::time::Duration;
use tracing::{info, warn};

use crate::{logging, runner, suite::Group};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "owm-check", version, about = "OpenWeatherMap API conformance checker")]
pub struct Cli {
    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Command,
}

/// Flags that win over the environment and the config file.
#[derive(Debug, Default, Args)]
pub struct Overrides {
    /// API base URL, e.g. a staging mirror.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Per-request and per-case timeout in milliseconds.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// One of debug, info, warn, error.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log response bodies.
    #[arg(long, global = true)]
    pub detailed_logging: bool,
}

impl Overrides {
    pub fn apply(&self, config: &mut ClientConfig) {
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Some(ms) = self.timeout_ms {
            config.timeout_ms = ms;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if self.detailed_logging {
            config.detailed_logging = true;
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the live conformance suite.
    Run {
        /// Only run these groups (repeatable). Runs everything when omitted.
        #[arg(long = "group", value_enum)]
        groups: Vec<Group>,

        /// Print the selected cases without running them.
        #[arg(long)]
        list: bool,
    },

    /// Store the API key in the config file.
    Configure,

    /// Print the config file location.
    ConfigPath,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        self.run_with_env(|key| std::env::var(key).ok()).await
    }

    /// Dispatch the subcommand. Only `run` reads the config file and the
    /// environment, so a broken config never blocks `configure` or `config-path`.
    pub async fn run_with_env<F>(self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        match self.command {
            Command::Run { groups, list } => {
                let mut config = ClientConfig::load()?;
                config.apply_env(lookup)?;
                self.overrides.apply(&mut config);
                logging::init(config.effective_log_level());

                run_suite(&config, &groups, list).await
            }
            Command::Configure => {
                let mut config = ClientConfig::default();
                self.overrides.apply(&mut config);
                logging::init(config.effective_log_level());

                configure()
            }
            Command::ConfigPath => {
                println!("{}", ClientConfig::config_file_path()?.display());
                Ok(())
            }
        }
    }
}

async fn run_suite(config: &ClientConfig, groups: &[Group], list: bool) -> anyhow::Result<()> {
    let cases = runner::select(groups);

    if list {
        for case in &cases {
            println!("{}/{}", case.group().as_str(), case.name());
        }
        return Ok(());
    }

    let client = WeatherClient::new(config)
        .context("Hint: run `owm-check configure` or set OPENWEATHER_API_KEY")?;

    info!("Starting OpenWeatherMap API conformance run against {}", client.base_url());
    println!("Run started {} ({} cases)", Utc::now().to_rfc3339(), cases.len());

    let summary =
        runner::run_cases(&client, &cases, Duration::from_millis(config.timeout_ms)).await;

    println!("\n{} passed, {} failed", summary.passed(), summary.failed());
    info!("OpenWeatherMap API conformance run completed");

    if summary.failed() > 0 {
        bail!("{} of {} cases failed", summary.failed(), summary.outcomes.len());
    }
    Ok(())
}

fn configure() -> anyhow::Result<()> {
    // Re-read the file so values coming only from env or flags are not persisted.
    let mut stored = ClientConfig::load().unwrap_or_else(|err| {
        warn!("Existing config is unreadable, starting from defaults: {err:#}");
        ClientConfig::default()
    });

    if stored.api_key().is_some() {
        let replace = Confirm::new("An API key is already configured. Replace it?")
            .with_default(false)
            .prompt()?;
        if !replace {
            return Ok(());
        }
    }

    let key = Password::new("OpenWeatherMap API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()?;

    if key.trim().is_empty() {
        bail!("API key must not be empty");
    }

    stored.upsert_api_key(key.trim().to_string());
    stored.save()?;

    println!("Saved API key to {}", ClientConfig::config_file_path()?.display());
    Ok(())
}
