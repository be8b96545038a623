use std::path::Path;

#[cfg(not(feature = "with-csv"))]
use anyhow::bail;
use anyhow::{Context, Result};
use mailrisk::{BatchResult, ValidationResult};

use crate::args::{Cli, Format};

pub fn write_report(batch: &BatchResult, cli: &Cli) -> Result<()> {
    let bytes = match cli.format {
        Format::Human => human(batch).into_bytes(),
        Format::Json => {
            let mut s = serde_json::to_string_pretty(batch)?;
            s.push('\n');
            s.into_bytes()
        }
        Format::Ndjson => ndjson(&batch.results)?,
        Format::Csv => csv_bytes(&batch.results)?,
    };

    match &cli.out {
        Some(path) => write_all_atomically(path, &bytes),
        None => {
            use std::io::Write;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
            Ok(())
        }
    }
}

fn human(batch: &BatchResult) -> String {
    let mut out = String::new();
    for result in &batch.results {
        out.push_str(&human_line(result));
        out.push('\n');
    }
    let s = &batch.summary;
    out.push_str(&format!(
        "-- {} total, {} valid, {} invalid, {} errors\n",
        s.total, s.valid, s.invalid, s.errors
    ));
    out
}

fn human_line(result: &ValidationResult) -> String {
    let head = if result.is_valid { "[OK]     " } else { "[INVALID]" };
    let mut line = format!(
        "{head} {} score={:.1} risk={}",
        result.email, result.score, result.risk_level
    );
    if let Some(error) = &result.error {
        line.push_str(&format!(" :: {error}"));
    } else {
        let failed = failed_checks(result);
        if !failed.is_empty() {
            line.push_str(&format!(" :: failed {}", failed.join(", ")));
        }
    }
    line
}

fn failed_checks(result: &ValidationResult) -> Vec<&'static str> {
    result
        .checks
        .iter()
        .filter(|(_, check)| check.performed && !check.passed)
        .map(|(name, _)| name.as_str())
        .collect()
}

fn ndjson(results: &[ValidationResult]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    for result in results {
        serde_json::to_writer(&mut buf, result)?;
        buf.push(b'\n');
    }
    Ok(buf)
}

#[cfg(feature = "with-csv")]
fn csv_bytes(results: &[ValidationResult]) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(["id", "email", "is_valid", "score", "risk_level", "failed_checks", "error", "created_at"])?;
    for result in results {
        // colonnes stables, une ligne par adresse
        wtr.write_record([
            result.id.clone(),
            result.email.clone(),
            result.is_valid.to_string(),
            format!("{:.1}", result.score),
            result.risk_level.to_string(),
            failed_checks(result).join("|"),
            result.error.clone().unwrap_or_default(),
            result.created_at.to_rfc3339(),
        ])?;
    }
    wtr.into_inner().context("flush CSV writer")
}

#[cfg(not(feature = "with-csv"))]
fn csv_bytes(_: &[ValidationResult]) -> Result<Vec<u8>> {
    bail!("format=csv nécessite la feature 'with-csv'")
}

pub fn write_all_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    use std::io::Write;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);
    {
        let mut f = std::fs::File::create(&tmp).with_context(|| format!("create {}", tmp.display()))?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp, path).with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}
