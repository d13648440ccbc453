use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;
use serde::Deserialize;
use std::fs;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://blob.zip";

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    base_url: Option<Url>,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigEnv {
    blobzip_url: Option<Url>,
}

#[derive(Debug)]
pub struct Config {
    pub base_url: Url,
}

fn merge_config(base: ConfigFile, override_config: ConfigEnv) -> Result<Config> {
    let base_url = match override_config.blobzip_url.or(base.base_url) {
        Some(url) => url,
        None => Url::parse(DEFAULT_BASE_URL).context("Invalid built-in base URL")?,
    };
    Ok(Config { base_url })
}

pub fn read_config() -> Result<Config> {
    let _ = dotenv();
    let env_config = envy::from_env::<ConfigEnv>().unwrap_or_default();

    let project_dirs = directories::ProjectDirs::from("zip", "blob", "blobzip")
        .ok_or(anyhow!("Unable to determine home directory"))?;
    let config_file = project_dirs.config_dir().join("config.toml");
    let file_config = if let Ok(config) = fs::read_to_string(config_file) {
        toml::from_str(&config)?
    } else {
        ConfigFile::default()
    };

    merge_config(file_config, env_config)
}
