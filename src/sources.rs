use crate::error::{ReportEngineError, Result};
use crate::schema::LEDGER_FILE_EXTENSION;
use futures::future;
use log::debug;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Lists ledger source files in `dir`: every file whose name ends in the
/// ledger extension and is not in `excluding`. The exclusion set is how a
/// report avoids re-ingesting its own previous output when the source and
/// output directories coincide.
///
/// Results are sorted by file name so aggregation (and with it the accounts
/// report's first-seen ordering) is deterministic across runs.
pub async fn list_sources(dir: &Path, excluding: &[&str]) -> Result<Vec<PathBuf>> {
    let read_err = |source| ReportEngineError::SourceRead {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = fs::read_dir(dir).await.map_err(read_err)?;
    let suffix = format!(".{}", LEDGER_FILE_EXTENSION);

    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
        let file_name = entry.file_name();
        if let Some(name) = file_name.to_str() {
            if name.ends_with(&suffix) && !excluding.contains(&name) {
                paths.push(entry.path());
            }
        }
    }

    paths.sort();
    debug!("Found {} ledger source file(s) in {}", paths.len(), dir.display());
    Ok(paths)
}

/// Reads every file fully, concurrently. One unreadable file fails the whole
/// batch; there is no partial-success policy at this layer.
pub async fn read_all(paths: &[PathBuf]) -> Result<Vec<String>> {
    let reads = paths.iter().map(|path| async move {
        fs::read_to_string(path)
            .await
            .map_err(|source| ReportEngineError::SourceRead {
                path: path.clone(),
                source,
            })
    });

    future::try_join_all(reads).await
}

/// Writes a formatted report as newline-joined lines, creating the output
/// directory if needed. Existing output is overwritten.
pub async fn write_report(destination: &Path, lines: &[String]) -> Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(destination, lines.join("\n")).await?;
    debug!("Wrote {} line(s) to {}", lines.len(), destination.display());
    Ok(())
}
