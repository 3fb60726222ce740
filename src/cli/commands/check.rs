//! Model endpoint health check.

use console::style;

use crate::cli::icons::{arrow, error, success};
use crate::config::Settings;
use crate::llm::LlmClient;

/// Report whether the configured model endpoint is reachable.
pub async fn cmd_check(settings: &Settings) -> anyhow::Result<()> {
    let llm = &settings.llm;
    println!("{} Provider: {}", arrow(), llm.provider);
    println!("  {} Endpoint: {}", style("·").dim(), llm.endpoint);
    println!("  {} Model:    {}", style("·").dim(), llm.model);

    let client = LlmClient::new(llm.clone())?;

    let key_ok = if llm.provider.requires_api_key() {
        match client.require_key() {
            Ok(_) => {
                println!("  {} API key present", success());
                true
            }
            Err(e) => {
                println!("  {} {}", error(), e);
                false
            }
        }
    } else {
        println!("  {} No API key required", success());
        true
    };

    if !key_ok {
        anyhow::bail!("No API key configured for {}", llm.provider);
    }

    if client.is_available().await {
        println!("  {} Endpoint reachable", success());
    } else {
        println!("  {} Endpoint not reachable", error());
        anyhow::bail!("Model endpoint check failed for {}", llm.endpoint);
    }

    Ok(())
}
