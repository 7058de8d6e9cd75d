//! `vea daily`: Brief for one day.

use std::path::Path;

use chrono::NaiveDate;
use vea_core::TaskContext;

use super::brief;
use crate::SourceArgs;

pub async fn run(
    config_path: Option<&Path>,
    date: Option<NaiveDate>,
    sources: &SourceArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = brief::load_config(config_path, sources)?;
    let today = match date {
        Some(d) => d,
        None => brief::local_now(&config)?.date(),
    };
    brief::execute(&config, TaskContext::daily(today), today, sources).await
}
