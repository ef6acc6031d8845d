use anyhow::{Context, Result};

use crate::config::Config;
use crate::llm::HttpBackend;

pub async fn run_doctor(cfg: &Config) -> Result<()> {
    println!("== seaforge doctor ==");
    println!("Model: {}", cfg.model);
    println!("Base URL: {}", cfg.base_url);

    reqwest::Url::parse(&cfg.base_url)
        .map_err(|e| anyhow::anyhow!("Invalid base_url: {e}"))?;
    println!("[ok] base_url is valid URL");

    let backend = HttpBackend::from_config(cfg)?;
    if backend.has_api_key() {
        println!("[ok] API key resolved");
    } else {
        println!(
            "[warn] no API key found (set {} or api_key in the config)",
            cfg.api_key_env
        );
    }

    let reply = backend
        .ping()
        .await
        .context("Chat completion test failed")?;
    println!("[ok] chat completion test succeeded: {}", reply.trim());
    println!("doctor finished: healthy");
    Ok(())
}
