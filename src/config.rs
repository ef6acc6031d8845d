use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an elite software engineer with decades of experience across all programming domains.
Your expertise spans system design, algorithms, testing, and best practices.
You provide thoughtful, well-structured solutions while explaining your reasoning.

Core capabilities:
1. Code Analysis & Discussion
   - Analyze code with expert-level insight
   - Explain complex concepts clearly
   - Suggest optimizations and best practices
   - Debug issues with precision

2. File Operations:
   a) Read existing files
      - Access user-provided file contents for context
      - Analyze multiple files to understand project structure
   b) Create new files
      - Generate complete new files with proper structure
      - Create complementary files (tests, configs, etc.)
   c) Edit existing files
      - Make precise changes using diff-based editing
      - Modify specific sections while preserving context

Output Format:
You must provide responses in this JSON structure:
{
  "assistant_reply": "Your main explanation or response",
  "files_to_create": [
    {
      "path": "path/to/new/file",
      "content": "complete file content"
    }
  ],
  "files_to_edit": [
    {
      "path": "path/to/existing/file",
      "original_snippet": "exact code to be replaced",
      "new_snippet": "new code to insert"
    }
  ]
}

Guidelines:
1. For normal responses, use 'assistant_reply'
2. When creating files, include full content in 'files_to_create'
3. For editing files:
   - Use 'files_to_edit' for precise changes
   - Include enough context in original_snippet to locate the change
   - original_snippet must match the file text exactly, including whitespace
   - Ensure new_snippet maintains proper indentation
   - Prefer targeted edits over full file replacements
4. Always explain your changes and reasoning
5. Consider edge cases and potential impacts
6. Suggest tests or validation steps when appropriate
"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Replaces the built-in instruction when set.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            api_key: None,
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
            system_prompt: None,
        }
    }
}

fn default_base_url() -> String {
    "https://api.deepseek.com/chat/completions".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

fn default_api_key_env() -> String {
    "DEEPSEEK_API_KEY".to_string()
}

fn default_max_tokens() -> u32 {
    8000
}

fn default_request_timeout_secs() -> u64 {
    900
}

/// Values given on the command line (or through their env fallbacks).
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
}

impl Config {
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(v) = &overrides.base_url {
            self.base_url = v.clone();
        }
        if let Some(v) = &overrides.model {
            self.model = v.clone();
        }
        if let Some(v) = overrides.max_tokens {
            self.max_tokens = v;
        }
    }

    pub fn system_prompt(&self) -> &str {
        match &self.system_prompt {
            Some(p) if !p.trim().is_empty() => p,
            _ => DEFAULT_SYSTEM_PROMPT,
        }
    }
}

pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Cannot resolve home directory")?;
    Ok(home.join(".seaforge"))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

pub fn load_config_or_default() -> Result<Config> {
    let path = config_path()?;
    if !path.exists() {
        let cfg = Config::default();
        save_config(&cfg)?;
        debug!(path = %path.display(), "wrote default config");
        return Ok(cfg);
    }

    let text =
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse_config(&text).with_context(|| format!("Invalid config: {}", path.display()))
}

pub fn parse_config(text: &str) -> Result<Config> {
    Ok(toml::from_str(text)?)
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let path = config_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    let text = toml::to_string_pretty(cfg)?;
    fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// The credential, if any. A missing key is not an error here; the request
/// goes out unauthenticated and the endpoint reports the failure.
pub fn resolve_api_key(cfg: &Config) -> Option<String> {
    if let Ok(v) = env::var(&cfg.api_key_env)
        && !v.trim().is_empty()
    {
        return Some(v);
    }
    cfg.api_key
        .as_ref()
        .filter(|v| !v.trim().is_empty())
        .cloned()
}
