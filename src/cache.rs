use std::path::Path;

use serde_json::Value;
use vercel_runtime::Error;

use crate::metrics::{parse_metric_records, RawMetricRecord};

/// The backend answers with a bare array, `{ "metrics": [...] }` or
/// `{ "data": [...] }`; the dashboard caches whichever it received.
pub fn metrics_payload(value: &Value) -> &Value {
  match value {
    Value::Object(map) => map
      .get("metrics")
      .or_else(|| map.get("data"))
      .unwrap_or(value),
    _ => value,
  }
}

/// `Ok(None)` means "no usable cache" (blank, `null`, or not a list).
pub fn parse_cached_metrics(raw: &str) -> Result<Option<Vec<RawMetricRecord>>, Error> {
  if raw.trim().is_empty() {
    return Ok(None);
  }

  let value: Value = serde_json::from_str(raw)
    .map_err(|e| Box::new(std::io::Error::other(format!("invalid cached metrics json: {e}"))) as Error)?;

  Ok(parse_metric_records(metrics_payload(&value)))
}

pub fn load_cached_metrics(path: &Path) -> Result<Option<Vec<RawMetricRecord>>, Error> {
  let raw = std::fs::read_to_string(path).map_err(|e| {
    Box::new(std::io::Error::other(format!(
      "failed to read cached metrics {}: {e}",
      path.display()
    ))) as Error
  })?;

  parse_cached_metrics(&raw)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accepts_bare_arrays_and_envelopes() {
    let bare = parse_cached_metrics(r#"[{"date":"2025-01-01","views":5}]"#).unwrap().unwrap();
    assert_eq!(bare.len(), 1);

    let wrapped = parse_cached_metrics(r#"{"metrics":[{"date":"2025-01-01"},{"date":"2025-02-01"}]}"#)
      .unwrap()
      .unwrap();
    assert_eq!(wrapped.len(), 2);

    let data = parse_cached_metrics(r#"{"data":[{"date":"2025-01-01"}]}"#).unwrap().unwrap();
    assert_eq!(data.len(), 1);
  }

  #[test]
  fn blank_or_null_cache_is_not_an_error() {
    assert!(parse_cached_metrics("").unwrap().is_none());
    assert!(parse_cached_metrics("  \n").unwrap().is_none());
    assert!(parse_cached_metrics("null").unwrap().is_none());
    assert!(parse_cached_metrics(r#"{"ok":true}"#).unwrap().is_none());
  }

  #[test]
  fn malformed_json_is_an_error() {
    let err = parse_cached_metrics("[{").unwrap_err();
    assert!(err.to_string().contains("invalid cached metrics json"));
  }

  #[test]
  fn missing_file_reports_path() {
    let path = std::env::temp_dir().join("credenza-metrics-missing-cache.json");
    let err = load_cached_metrics(&path).unwrap_err();
    assert!(err.to_string().contains("credenza-metrics-missing-cache.json"));
  }

  #[test]
  fn loads_cache_from_disk() {
    let path = std::env::temp_dir().join(format!("credenza-metrics-cache-{}.json", std::process::id()));
    std::fs::write(&path, r#"[{"date":"2025-01-01","views":1},{"date":"2025-02-01","views":3}]"#).unwrap();
    let records = load_cached_metrics(&path).unwrap().unwrap();
    let _ = std::fs::remove_file(&path);
    assert_eq!(records.len(), 2);
  }
}
