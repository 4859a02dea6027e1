//! Stats reconciliation.
//!
//! The CLI's stats output exists in two incompatible shapes: the current
//! schema nests metrics (`memory.usage`), the legacy schema flattens them
//! (`MemUsage`), and field types differ (numbers vs `"12.5%"` strings).
//! Each canonical metric is read through an explicit precedence chain; a
//! candidate is accepted only if it resolves to a finite number, otherwise
//! the chain continues.

use serde_json::Value;

use crate::cli::client::CliError;
use crate::model::ContainerStats;
use crate::parser::units::try_parse_size;

/// Parse `stats --no-stream --format json` output for one container.
/// Accepts either a bare object or a single-element array.
pub fn parse_container_stats(container_id: &str, raw: &str) -> Result<ContainerStats, CliError> {
    let value: Value = serde_json::from_str(raw.trim()).map_err(|e| CliError::Parse {
        reason: format!("invalid JSON in stats output: {}", e),
        raw: raw.to_string(),
    })?;

    let record = match &value {
        Value::Array(items) => items.first().ok_or_else(|| CliError::Parse {
            reason: "empty stats array".to_string(),
            raw: raw.to_string(),
        })?,
        Value::Object(_) => &value,
        _ => {
            return Err(CliError::Parse {
                reason: "expected a stats object or single-element array".to_string(),
                raw: raw.to_string(),
            })
        }
    };

    let timestamp = chain(record, &[&["timestamp"]])
        .map(|v| v as i64)
        .unwrap_or_else(|| chrono::Utc::now().timestamp());

    Ok(ContainerStats {
        container_id: container_id.to_string(),
        cpu_percent: chain(record, &[&["cpu"], &["CPUPerc"], &["cpuPercent"]]).unwrap_or(0.0),
        memory_usage: chain_u64(
            record,
            &[&["memory", "usage"], &["MemUsage"], &["memoryUsageBytes"]],
        ),
        memory_limit: chain_u64(
            record,
            &[&["memory", "limit"], &["MemLimit"], &["memoryLimitBytes"]],
        ),
        network_rx: chain_u64(
            record,
            &[&["network", "rxBytes"], &["NetRx"], &["networkRxBytes"]],
        ),
        network_tx: chain_u64(
            record,
            &[&["network", "txBytes"], &["NetTx"], &["networkTxBytes"]],
        ),
        block_read: chain_u64(
            record,
            &[&["block", "readBytes"], &["BlockRead"], &["blockReadBytes"]],
        ),
        block_write: chain_u64(
            record,
            &[&["block", "writeBytes"], &["BlockWrite"], &["blockWriteBytes"]],
        ),
        timestamp,
    })
}

fn chain_u64(record: &Value, candidates: &[&[&str]]) -> u64 {
    chain(record, candidates).map(|v| v.max(0.0) as u64).unwrap_or(0)
}

/// Walk the candidate paths in order; the first that resolves to a finite
/// number wins.
fn chain(record: &Value, candidates: &[&[&str]]) -> Option<f64> {
    candidates
        .iter()
        .find_map(|path| lookup(record, path).and_then(as_finite))
}

fn lookup<'a>(record: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = record;
    for key in path {
        current = current.get(key)?;
    }
    Some(current)
}

/// Resolve a JSON value to a finite number.
///
/// Numbers pass through. Strings are accepted when they parse as a number
/// after stripping a `%` suffix, or as a size string ("45 MB"); a combined
/// "used / limit" string resolves to its first component. Everything else
/// is rejected so the precedence chain can continue.
fn as_finite(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => {
            let first = s.split('/').next().unwrap_or(s).trim();
            let stripped = first.strip_suffix('%').unwrap_or(first).trim();
            if let Ok(parsed) = stripped.parse::<f64>() {
                return Some(parsed).filter(|f| f.is_finite());
            }
            try_parse_size(first).map(|bytes| bytes as f64)
        }
        _ => None,
    }
}
