//! One-shot summarise command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::icons::{arrow, success};
use crate::config::Settings;
use crate::llm::{parse_temperature, LlmClient};
use crate::loader::DocumentLoader;
use crate::summarise::{ChainType, SummaryMode};
use crate::utils::format_size;

/// Arguments of `summarist summarise`.
pub struct SummariseArgs {
    pub file: PathBuf,
    pub mode: Option<SummaryMode>,
    pub chain: Option<ChainType>,
    pub model: Option<String>,
    pub temperature: Option<String>,
    pub output: Option<PathBuf>,
    pub json: bool,
}

/// `--model` and `--temperature` win over the config file and environment.
fn apply_model_flags(settings: &mut Settings, args: &SummariseArgs) {
    if let Some(model) = &args.model {
        settings.llm.model = model.clone();
    }
    if let Some(raw) = &args.temperature {
        settings.llm.temperature = parse_temperature(raw);
    }
}

/// Summarise a file and print or save the result.
pub async fn cmd_summarise(mut settings: Settings, args: SummariseArgs) -> anyhow::Result<()> {
    apply_model_flags(&mut settings, &args);
    let mode = args.mode.unwrap_or(settings.default_mode);
    let chain = args.chain.unwrap_or(settings.default_chain);

    let path = args.file.clone();
    let document =
        tokio::task::spawn_blocking(move || DocumentLoader::new().load_path(&path)).await??;
    eprintln!(
        "{} Loaded {}: {} page(s), {} characters ({})",
        arrow(),
        document.file_name,
        document.page_count(),
        document.char_count(),
        format_size(document.content().len() as u64)
    );

    let client = LlmClient::new(settings.llm.clone())?;
    let summariser = settings.build_summariser(Arc::new(client))?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!(
        "Summarising with {} ({}, {})...",
        summariser.model_name(),
        mode,
        chain
    ));
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = summariser
        .summarise_detailed(&document.pages, mode, chain)
        .await;
    pb.finish_and_clear();
    let outcome = result?;

    let rendered = if args.json {
        serde_json::to_string_pretty(&outcome)?
    } else {
        outcome.summary.clone()
    };

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, format!("{}\n", rendered)).await?;
            eprintln!(
                "{} Summary written to {} ({} model call(s))",
                success(),
                path.display(),
                outcome.model_calls
            );
        }
        None => println!("{}", rendered),
    }

    Ok(())
}
