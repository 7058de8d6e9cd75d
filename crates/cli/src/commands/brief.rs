//! Shared plumbing for `daily`, `weekly` and `prepare-event`.
//!
//! Config → loaders → pipeline → summarizer (or the raw document).

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{info, warn};
use vea_config::AppConfig;
use vea_context::{
    ContextAssembler, ContextPipeline, EventFilter, NormalizerSettings, PipelineSettings,
    RankingWeights,
};
use vea_core::{ContextDocument, SourceBatch, SourceLoader, TaskContext};
use vea_sources::{JournalDirLoader, JsonlRecordLoader, NotesDirLoader};

use crate::summarizer::CommandSummarizer;
use crate::{OutputFormat, SourceArgs};

/// Load config from `--config` or the default location, then apply the
/// command-line source overrides.
pub fn load_config(
    config_path: Option<&Path>,
    sources: &SourceArgs,
) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = match config_path {
        Some(path) => AppConfig::load_with_env(path),
        None => AppConfig::load(),
    }
    .map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(dir) = &sources.journal_dir {
        config.sources.journal_dir = dir.clone();
    }
    if let Some(dir) = &sources.notes_dir {
        config.sources.notes_dir = dir.clone();
    }
    if let Some(dir) = &sources.records_dir {
        config.sources.records_dir = dir.clone();
    }
    if sources.full_context {
        config.ranking.full_context = true;
    }
    if let Some(tokens) = sources.token_budget {
        config.ranking.caps.tokens = Some(tokens);
    }
    if let Some(scope) = sources.budget_scope {
        config.ranking.caps.token_scope = scope.into();
    }
    config
        .sources
        .event_blacklist
        .extend(sources.event_blacklist.iter().cloned());
    if sources.skip_past_events {
        config.sources.skip_past_events = true;
    }
    Ok(config)
}

/// The current wall-clock time in the configured zone.
pub fn local_now(config: &AppConfig) -> Result<NaiveDateTime, Box<dyn std::error::Error>> {
    let tz = config.tz()?;
    Ok(chrono::Utc::now().with_timezone(&tz).naive_local())
}

/// Turn config into the explicit values each stage takes.
pub fn pipeline_settings(config: &AppConfig) -> Result<PipelineSettings, vea_config::ConfigError> {
    let w = &config.ranking.weights;
    Ok(PipelineSettings {
        normalizer: NormalizerSettings {
            tz: config.tz()?,
            markers: config.normalize.markers.clone(),
            email_body_limit: config.normalize.email_body_limit,
        },
        event_filter: EventFilter::new(
            &config.sources.event_blacklist,
            config.sources.my_email.as_deref(),
        ),
        trigger: config.trigger.trim().to_string(),
        weights: RankingWeights {
            containment: w.containment,
            proximity: w.proximity,
            marker: w.marker,
            overlap_per_term: w.overlap_per_term,
            overlap_cap: w.overlap_cap,
        },
        strip_stale_directives: config.directives.strip_stale,
    })
}

/// Every configured loader; journals are read up to `journal_until`.
pub fn build_loaders(
    config: &AppConfig,
    journal_until: NaiveDate,
) -> Result<Vec<Box<dyn SourceLoader>>, vea_core::LoadError> {
    let src = &config.sources;
    let mut loaders: Vec<Box<dyn SourceLoader>> = vec![
        Box::new(
            JournalDirLoader::new(&src.journal_dir, journal_until)
                .with_days(src.journal_days)
                .with_max_file_bytes(src.max_file_bytes),
        ),
        Box::new(
            NotesDirLoader::new(&src.notes_dir)
                .with_excluded(&src.excluded_notes)
                .with_max_file_bytes(src.max_file_bytes),
        ),
    ];
    for loader in JsonlRecordLoader::discover(&src.records_dir)? {
        loaders.push(Box::new(loader));
    }
    Ok(loaders)
}

/// Run each loader; a failing source is logged and left out.
pub async fn load_all(loaders: &[Box<dyn SourceLoader>]) -> Vec<SourceBatch> {
    let mut batches = Vec::with_capacity(loaders.len());
    for loader in loaders {
        match loader.load().await {
            Ok(batch) => batches.push(batch),
            Err(e) => warn!(source = loader.name(), error = %e, "Source failed, continuing without it"),
        }
    }
    batches
}

/// Produce and print one brief.
pub async fn execute(
    config: &AppConfig,
    task: TaskContext,
    journal_until: NaiveDate,
    sources: &SourceArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let loaders = build_loaders(config, journal_until)?;
    let batches = load_all(&loaders).await;

    let mut settings = pipeline_settings(config)?;
    if config.sources.skip_past_events {
        let now = local_now(config)?;
        if task.today == now.date() {
            settings.event_filter = settings.event_filter.with_skip_before(now);
        }
    }
    let task = if sources.focus.is_empty() {
        task
    } else {
        task.with_focus_terms(sources.focus.clone())
    };

    let pipeline = ContextPipeline::new(settings);
    let output = match pipeline.run(batches, task, &config.budget()).await {
        Ok(output) => output,
        Err(vea_core::Error::Assembly(e)) => {
            eprintln!("  ❌ Cannot build context: {e}");
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    if !output.warnings.is_empty() {
        info!(count = output.warnings.len(), "Run finished with warnings");
    }

    match (&config.summarizer.command, sources.no_summarize) {
        (Some(command), false) => {
            let summarizer = CommandSummarizer::new(command);
            let text = pipeline.summarize(&output.document, &summarizer).await?;
            println!("{}", text.trim_end());
        }
        _ => println!("{}", render(&output.document, sources.format)?),
    }
    Ok(())
}

fn render(document: &ContextDocument, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => document.to_json_pretty(),
        OutputFormat::Text => Ok(ContextAssembler::render_text(document)),
    }
}
