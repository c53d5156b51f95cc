use std::{
    env,
    fs::{self, File},
    io::Write,
    path::PathBuf,
};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serde_yaml::Deserializer;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// GLM API key; the GLM_API_KEY environment variable takes precedence.
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    /// Day-keyed JSON window store.
    pub data_path: PathBuf,
    /// Rendered single-page viewer.
    pub html_path: PathBuf,
}

fn default_model() -> String {
    "glm-4.7".to_string()
}

pub struct EnsureOutcome {
    pub path: PathBuf,
    pub created: bool,
}

impl Config {
    pub fn ensure_user_config() -> Result<EnsureOutcome> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("newsreel");

        if let Some(path) = xdg_dirs.find_config_file("config.yaml") {
            return Ok(EnsureOutcome { path, created: false });
        }

        let config_path = xdg_dirs
            .place_config_file("config.yaml")
            .context("cannot create configuration directory")?;
        let mut config_file = File::create(&config_path)?;

        write!(
            &mut config_file,
            r#"# newsreel config (YAML)

# Optional here; the GLM_API_KEY environment variable wins when set.
api_key: "<your GLM API key>"

model: "glm-4.7"

# Rolling 10-day window store
data_path: "/var/lib/newsreel/all_news.json"

# Rendered stories page
html_path: "/var/www/newsreel/ai_news.html"
"#
        )?;

        Ok(EnsureOutcome {
            path: config_path,
            created: true,
        })
    }

    pub fn get_user_config() -> Result<Config> {
        let config_file = xdg::BaseDirectories::with_prefix("newsreel").find_config_file("config.yaml");

        match &config_file {
            Some(existing) => {
                let raw = fs::read_to_string(existing)
                    .with_context(|| format!("Failed to read {}", existing.display()))?;
                let deserializer = Deserializer::from_str(&raw);
                let config: Config = serde_path_to_error::deserialize(deserializer).map_err(|e| {
                    anyhow!(
                        "Invalid YAML in {} at `{}`: {}",
                        existing.display(),
                        e.path(),
                        e.inner()
                    )
                })?;
                Ok(config)
            }
            None => Err(anyhow!(
                "Could not read configuration file in config::get_user_config"
            )),
        }
    }

    /// Environment first, config file second.
    pub fn resolve_api_key(&self) -> Result<String> {
        env::var("GLM_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|key| !key.trim().is_empty()))
            .ok_or_else(|| anyhow!("No GLM API key: set GLM_API_KEY or api_key in config.yaml"))
    }
}
