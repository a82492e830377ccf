use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::actions::get_input_from;

pub const DEFAULT_MAX_PAGES: u32 = 100;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub github: GitHubConfig,
    pub trigger: TriggerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitHubConfig {
    pub token: String,
    /// Base URL of the REST API, for GitHub Enterprise Server.
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TriggerConfig {
    /// Slash-command (without the leading `/`) that triggers a dispatch.
    pub command: String,
    /// Name of the workflow to dispatch.
    pub workflow: String,
    /// Upper bound on the number of workflow list pages to scan.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

fn default_max_pages() -> u32 { DEFAULT_MAX_PAGES }

/// A partial configuration from a single source.
///
/// Layers are merged from highest to lowest priority, then resolved into a
/// [`Config`] once every source has been applied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigLayer {
    pub github: GitHubLayer,
    pub trigger: TriggerLayer,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GitHubLayer {
    pub token: Option<String>,
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TriggerLayer {
    pub command: Option<String>,
    pub workflow: Option<String>,
    pub max_pages: Option<u32>,
}

impl ConfigLayer {
    /// Load a layer from a YAML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = BufReader::new(
            File::open(path)
                .with_context(|| format!("Failed to open config file {}", path.display()))?,
        );
        serde_yaml::from_reader(file)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Load a layer from action inputs and runner variables.
    pub fn from_inputs<F>(lookup: F) -> Result<Self>
    where F: Fn(&str) -> Option<String> {
        let max_pages = get_input_from("max-pages", &lookup)
            .map(|v| v.parse::<u32>().with_context(|| format!("Invalid max-pages input {v:?}")))
            .transpose()?;
        Ok(Self {
            github: GitHubLayer {
                token: get_input_from("pat", &lookup),
                api_url: lookup("GITHUB_API_URL").filter(|v| !v.is_empty()),
            },
            trigger: TriggerLayer {
                command: get_input_from("command", &lookup),
                workflow: get_input_from("workflow", &lookup),
                max_pages,
            },
        })
    }

    /// Fill any unset values in `self` from `lower`.
    pub fn merge(self, lower: ConfigLayer) -> Self {
        Self {
            github: GitHubLayer {
                token: self.github.token.or(lower.github.token),
                api_url: self.github.api_url.or(lower.github.api_url),
            },
            trigger: TriggerLayer {
                command: self.trigger.command.or(lower.trigger.command),
                workflow: self.trigger.workflow.or(lower.trigger.workflow),
                max_pages: self.trigger.max_pages.or(lower.trigger.max_pages),
            },
        }
    }

    pub fn resolve(self) -> Result<Config> {
        fn required(value: Option<String>, name: &str) -> Result<String> {
            value
                .filter(|v| !v.is_empty())
                .ok_or_else(|| anyhow!("Input required and not supplied: {name}"))
        }
        let max_pages = self.trigger.max_pages.unwrap_or(DEFAULT_MAX_PAGES);
        if max_pages == 0 {
            return Err(anyhow!("max-pages must be at least 1"));
        }
        Ok(Config {
            github: GitHubConfig {
                token: required(self.github.token, "pat")?,
                api_url: self.github.api_url,
            },
            trigger: TriggerConfig {
                command: required(self.trigger.command, "command")?,
                workflow: required(self.trigger.workflow, "workflow")?,
                max_pages,
            },
        })
    }
}
