use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const UNKNOWN_CHANNEL: &str = "unknown";

/// One platform's figures for one reporting period, as returned by the
/// metrics backend (or replayed from the dashboard's local cache).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMetricRecord {
  /// End of the reporting period.
  pub date: DateTime<Utc>,
  #[serde(default)]
  pub views: i64,
  #[serde(default)]
  pub audience_size: i64,
  #[serde(default)]
  pub post_count: i64,
  #[serde(default)]
  pub estimated_revenue_usd: f64,
  #[serde(default)]
  pub ad_revenue_usd: f64,
  #[serde(default)]
  pub other_revenue_usd: f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub platform_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub channel_name: Option<String>,
}

impl RawMetricRecord {
  pub fn new(date: DateTime<Utc>) -> Self {
    Self {
      date,
      views: 0,
      audience_size: 0,
      post_count: 0,
      estimated_revenue_usd: 0.0,
      ad_revenue_usd: 0.0,
      other_revenue_usd: 0.0,
      platform_id: None,
      channel_name: None,
    }
  }

  /// `platformId`, then `channelName`, then the shared "unknown" bucket.
  pub fn channel_key(&self) -> &str {
    non_blank(&self.platform_id)
      .or_else(|| non_blank(&self.channel_name))
      .unwrap_or(UNKNOWN_CHANNEL)
  }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
  value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Ascending by date. Stable, so equal dates keep their stored order.
pub fn sorted_by_date(records: &[RawMetricRecord]) -> Vec<RawMetricRecord> {
  let mut sorted = records.to_vec();
  sorted.sort_by_key(|r| r.date);
  sorted
}

fn parse_i64_field(raw: &str) -> Option<i64> {
  let cleaned = raw.trim().replace(',', "");
  cleaned.parse::<i64>().ok()
}

fn parse_f64_field(raw: &str) -> Option<f64> {
  let cleaned = raw.trim().replace(',', "");
  cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn field<'a>(obj: &'a Map<String, Value>, candidates: &[&str]) -> Option<&'a Value> {
  candidates
    .iter()
    .find_map(|c| obj.get(*c))
    .filter(|v| !v.is_null())
}

fn coerce_f64(value: Option<&Value>) -> f64 {
  match value {
    Some(Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
    Some(Value::String(s)) => parse_f64_field(s).unwrap_or(0.0),
    _ => 0.0,
  }
}

fn coerce_i64(value: Option<&Value>) -> i64 {
  match value {
    Some(Value::Number(n)) => n
      .as_i64()
      .or_else(|| n.as_f64().map(|v| v.trunc() as i64))
      .unwrap_or(0),
    Some(Value::String(s)) => parse_i64_field(s)
      .or_else(|| parse_f64_field(s).map(|v| v.trunc() as i64))
      .unwrap_or(0),
    _ => 0,
  }
}

fn coerce_label(value: Option<&Value>) -> Option<String> {
  match value {
    Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
    Some(Value::Number(n)) => Some(n.to_string()),
    _ => None,
  }
}

fn parse_date_str(raw: &str) -> Option<DateTime<Utc>> {
  let s = raw.trim();
  if s.is_empty() {
    return None;
  }
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.with_timezone(&Utc));
  }
  if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
    return Some(Utc.from_utc_datetime(&ndt));
  }
  if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
    return d.and_hms_opt(0, 0, 0).map(|ndt| Utc.from_utc_datetime(&ndt));
  }
  None
}

/// Accepts RFC 3339, bare `YYYY-MM-DD`, naive ISO timestamps (as UTC) and
/// epoch milliseconds.
pub fn parse_metric_date(value: &Value) -> Option<DateTime<Utc>> {
  match value {
    Value::String(s) => parse_date_str(s),
    Value::Number(n) => n
      .as_i64()
      .or_else(|| n.as_f64().map(|v| v as i64))
      .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
    _ => None,
  }
}

/// Loose coercion of one JSON element. Missing or malformed numbers become
/// zero; an element without a usable date is rejected.
pub fn record_from_value(value: &Value) -> Option<RawMetricRecord> {
  let obj = value.as_object()?;
  let date = field(obj, &["date", "periodEnd", "period_end"]).and_then(parse_metric_date)?;

  Some(RawMetricRecord {
    date,
    views: coerce_i64(field(obj, &["views"])),
    audience_size: coerce_i64(field(obj, &["audienceSize", "audience_size"])),
    post_count: coerce_i64(field(obj, &["postCount", "post_count"])),
    estimated_revenue_usd: coerce_f64(field(obj, &["estimatedRevenueUsd", "estimated_revenue_usd"])),
    ad_revenue_usd: coerce_f64(field(obj, &["adRevenueUsd", "ad_revenue_usd"])),
    other_revenue_usd: coerce_f64(field(obj, &["otherRevenueUsd", "other_revenue_usd"])),
    platform_id: coerce_label(field(obj, &["platformId", "platform_id"])),
    channel_name: coerce_label(field(obj, &["channelName", "channel_name"])),
  })
}

/// `None` when the payload is not a JSON array. Unusable elements are
/// skipped, so an array may still yield an empty list.
pub fn parse_metric_records(value: &Value) -> Option<Vec<RawMetricRecord>> {
  let items = value.as_array()?;
  Some(items.iter().filter_map(record_from_value).collect())
}
