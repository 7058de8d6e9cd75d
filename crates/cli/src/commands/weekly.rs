//! `vea weekly`: Review of one ISO week.

use std::path::Path;

use vea_core::{TaskContext, WeekSpan};

use super::brief;
use crate::SourceArgs;

pub async fn run(
    config_path: Option<&Path>,
    week: Option<&str>,
    sources: &SourceArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = brief::load_config(config_path, sources)?;
    let today = brief::local_now(&config)?.date();
    let span = match week {
        Some(input) => WeekSpan::parse(input, today)?,
        None => WeekSpan::containing(today),
    };

    // A past week's journals end with that week, not with today.
    let journal_until = span.end.min(today);
    brief::execute(&config, TaskContext::weekly(today, span), journal_until, sources).await
}
