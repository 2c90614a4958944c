use anyhow::{ensure, Context};
use slide::prelude::{check_level, BatchSummary, MAX_LEVEL, MIN_LEVEL};
use std::path::Path;

pub fn level_legal_range(s: &str) -> Result<u8, String> {
    let level: u8 = s
        .parse()
        .map_err(|_| format!("`{s}` is not a legal conversion level ({MIN_LEVEL}..={MAX_LEVEL})"))?;
    check_level(level).map_err(|e| e.to_string())
}

pub fn ensure_dir(path: &Path, what: &str) -> anyhow::Result<()> {
    ensure!(path.is_dir(), "could not get into {what} `{}`", path.display());
    Ok(())
}

pub fn ensure_file(path: &Path, what: &str) -> anyhow::Result<()> {
    ensure!(path.is_file(), "could not find {what} `{}`", path.display());
    Ok(())
}

/// 输出汇总；如指定了`report`，同时写出JSON。
pub fn finish(summary: BatchSummary, report: Option<&Path>) -> anyhow::Result<BatchSummary> {
    summary.log();
    if let Some(path) = report {
        summary
            .write_json(path)
            .with_context(|| format!("failed to write summary `{}`", path.display()))?;
        log::info!("summary written to `{}`", path.display());
    }
    Ok(summary)
}
