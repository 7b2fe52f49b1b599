//! Run configuration: command line, environment and an optional TOML file.
//!
//! Command-line values win over environment variables (clap resolves those two),
//! which win over the file, which wins over the built-in defaults.

use crate::audit::{AuditSettings, DEFAULT_BRANCH, DEFAULT_CONCURRENCY};
use crate::render::{Encoding, Format, Layout, RenderOptions};
use crate::schema::Locale;
use anyhow::Context;
use std::path::{Path, PathBuf};

#[derive(clap::Parser, Debug, Default)]
#[command(
    name = "audit-branch-protection",
    version,
    about = "Audit branch protection and rulesets across a GitHub organization"
)]
pub struct Cli {
    #[arg(long, help = "TOML configuration file")]
    pub config: Option<PathBuf>,
    #[arg(long, env = "ORG_NAME", help = "Organization to audit")]
    pub org: Option<String>,
    #[arg(long, env = "BRANCH", help = "Branch whose protection is audited [default: main]")]
    pub branch: Option<String>,
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, help = "GitHub token")]
    pub token: Option<String>,
    #[arg(long, help = "Directory the matrices are written to [default: .]")]
    pub output_dir: Option<PathBuf>,
    #[arg(long, value_enum)]
    pub format: Option<Format>,
    #[arg(long, value_enum)]
    pub layout: Option<Layout>,
    #[arg(long, value_enum, help = "Language of the check labels")]
    pub locale: Option<Locale>,
    #[arg(long, value_enum, help = "Character encoding of the CSV files [default: utf8]")]
    pub encoding: Option<Encoding>,
    #[arg(
        long,
        action = clap::ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true",
        value_name = "BOOL",
        help = "Prefix UTF-8 CSV files with a byte order mark"
    )]
    pub bom: Option<bool>,
    #[arg(long, help = "Repositories fetched concurrently [default: 8]")]
    pub concurrency: Option<usize>,
    #[arg(
        long,
        action = clap::ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true",
        value_name = "BOOL",
        help = "Leave archived repositories out of the audit"
    )]
    pub skip_archived: Option<bool>,
    #[arg(long = "repo", help = "Audit only this repository (repeatable)")]
    pub repositories: Vec<String>,
    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,
}

/// Settings read from `--config`. The token is never read from a file.
#[derive(serde::Deserialize, Debug, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub org: Option<String>,
    pub branch: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub format: Option<Format>,
    pub layout: Option<Layout>,
    pub locale: Option<Locale>,
    pub encoding: Option<Encoding>,
    pub bom: Option<bool>,
    pub concurrency: Option<usize>,
    pub skip_archived: Option<bool>,
    pub repositories: Option<Vec<String>>,
}

impl FileConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Cannot parse config file {}", path.display()))
    }
}

pub struct Config {
    pub token: String,
    pub audit: AuditSettings,
    pub output_dir: PathBuf,
    pub format: Format,
    pub render: RenderOptions,
}

impl Config {
    pub fn resolve(cli: Cli) -> anyhow::Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::merge(cli, file)
    }

    pub fn merge(cli: Cli, file: FileConfig) -> anyhow::Result<Self> {
        let Some(token) = cli.token.filter(|token| !token.is_empty()) else {
            anyhow::bail!("GitHub token missing: pass --token or set GITHUB_TOKEN");
        };
        let Some(org) = cli.org.or(file.org).filter(|org| !org.is_empty()) else {
            anyhow::bail!("Organization missing: pass --org, set ORG_NAME or add `org` to the config file");
        };
        let concurrency = cli
            .concurrency
            .or(file.concurrency)
            .unwrap_or(DEFAULT_CONCURRENCY);
        if concurrency == 0 {
            anyhow::bail!("Concurrency must be at least 1");
        }
        let repositories = if cli.repositories.is_empty() {
            file.repositories.unwrap_or_default()
        } else {
            cli.repositories
        };

        Ok(Self {
            token,
            audit: AuditSettings {
                org,
                branch: cli
                    .branch
                    .or(file.branch)
                    .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
                concurrency,
                skip_archived: cli.skip_archived.or(file.skip_archived).unwrap_or(false),
                repositories,
            },
            output_dir: cli
                .output_dir
                .or(file.output_dir)
                .unwrap_or_else(|| PathBuf::from(".")),
            format: cli.format.or(file.format).unwrap_or_default(),
            render: RenderOptions {
                layout: cli.layout.or(file.layout).unwrap_or_default(),
                locale: cli.locale.or(file.locale).unwrap_or_default(),
                bom: cli.bom.or(file.bom).unwrap_or(false),
                encoding: cli.encoding.or(file.encoding).unwrap_or_default(),
            },
        })
    }
}
