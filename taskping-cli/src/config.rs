use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use taskping_core::AlertKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub source: SourceSection,
    pub poll: PollSection,
    pub alerts: AlertsSection,
    pub delivery: DeliverySection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSection {
    /// Status value a task must carry to be tracked.
    pub status: String,
    /// IANA timezone the "today" window is computed in.
    pub timezone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSection {
    pub refresh_secs: u64,
    pub check_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsSection {
    /// Which of the four kinds this deployment fires (1-4 of them).
    pub kinds: Vec<AlertKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliverySection {
    pub sink: SinkChoice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkChoice {
    Webhook,
    Desktop,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceSection {
                status: "To Do".to_string(),
                timezone: "America/Chicago".to_string(),
            },
            poll: PollSection {
                refresh_secs: 300,
                check_secs: 30,
            },
            alerts: AlertsSection {
                kinds: AlertKind::ALL.to_vec(),
            },
            delivery: DeliverySection {
                sink: SinkChoice::Webhook,
            },
        }
    }
}

pub fn taskping_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".taskping"))
}

pub fn ensure_taskping_home() -> Result<PathBuf> {
    let dir = taskping_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_taskping_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    Ok(toml::from_str(&s).context("parse config.toml")?)
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    let cfg = Config::default();
    save_config(&cfg)?;
    println!("Wrote {}", p.display());
    Ok(())
}

/// Credentials come from the environment (a `.env` file works too), never
/// from config.toml.
#[derive(Debug, Clone)]
pub struct Secrets {
    pub notion_token: String,
    pub database_id: String,
    pub webhook_url: Option<String>,
}

pub fn load_secrets() -> Result<Secrets> {
    let notion_token = match std::env::var("NOTION_TOKEN") {
        Ok(v) if !v.is_empty() => v,
        _ => bail!("NOTION_TOKEN must be set in the environment (or .env)"),
    };
    let database_id = match std::env::var("NOTION_DATABASE_ID") {
        Ok(v) if !v.is_empty() => v,
        _ => bail!("NOTION_DATABASE_ID must be set in the environment (or .env)"),
    };
    let webhook_url = std::env::var("DISCORD_WEBHOOK_URL")
        .ok()
        .filter(|v| !v.is_empty());

    Ok(Secrets {
        notion_token,
        database_id,
        webhook_url,
    })
}
