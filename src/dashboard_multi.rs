use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::metrics::{parse_metric_records, RawMetricRecord};

pub const DEFAULT_CHART_WINDOW_MONTHS: usize = 6;
const MAX_CHART_WINDOW_MONTHS: usize = 24;

#[derive(Debug, Clone)]
pub struct MultiChannelConfig {
  pub chart_window_months: usize,
}

impl Default for MultiChannelConfig {
  fn default() -> Self {
    Self {
      chart_window_months: DEFAULT_CHART_WINDOW_MONTHS,
    }
  }
}

impl MultiChannelConfig {
  pub fn from_env() -> Self {
    Self::from_window_setting(std::env::var("CREDENZA_CHART_WINDOW_MONTHS").ok().as_deref())
  }

  pub fn from_window_setting(raw: Option<&str>) -> Self {
    let chart_window_months = raw
      .and_then(|v| v.trim().parse::<usize>().ok())
      .map(|v| v.clamp(1, MAX_CHART_WINDOW_MONTHS))
      .unwrap_or(DEFAULT_CHART_WINDOW_MONTHS);
    Self { chart_window_months }
  }
}

/// Calendar month bucket. Orders chronologically and renders as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
  pub year: i32,
  pub month: u32,
}

impl MonthKey {
  pub fn from_datetime(dt: &DateTime<Utc>) -> Self {
    Self {
      year: dt.year(),
      month: dt.month(),
    }
  }
}

impl fmt::Display for MonthKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:04}-{:02}", self.year, self.month)
  }
}

impl Serialize for MonthKey {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

/// One slot on the shared month axis. `record` is `None` when the channel
/// reported nothing that month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelMonthEntry {
  pub month: MonthKey,
  #[serde(flatten)]
  pub record: Option<RawMetricRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSeries {
  pub channel: String,
  pub entries: Vec<ChannelMonthEntry>,
}

impl ChannelSeries {
  fn present(&self) -> impl Iterator<Item = &RawMetricRecord> {
    self.entries.iter().filter_map(|e| e.record.as_ref())
  }

  fn subscribers_gained(&self) -> i64 {
    let first = self.present().next().map(|r| r.audience_size);
    let last = self.present().last().map(|r| r.audience_size);
    match (first, last) {
      (Some(first), Some(last)) => last.saturating_sub(first),
      _ => 0,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelBarPoint {
  pub channel: String,
  pub views: i64,
  pub cpm: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultiChannelBar {
  pub month: MonthKey,
  pub channels: Vec<ChannelBarPoint>,
  pub views: i64,
  pub cpm: f64,
}

// Chart rows are flat: `views_<channel>` / `cpm_<channel>` next to the totals.
impl Serialize for MultiChannelBar {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(3 + self.channels.len() * 2))?;
    map.serialize_entry("month", &self.month)?;
    for point in self.channels.iter() {
      map.serialize_entry(&format!("views_{}", point.channel), &point.views)?;
      map.serialize_entry(&format!("cpm_{}", point.channel), &point.cpm)?;
    }
    map.serialize_entry("views", &self.views)?;
    map.serialize_entry("cpm", &self.cpm)?;
    map.end()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiChannelSummary {
  pub months: Vec<MonthKey>,
  pub channels: Vec<String>,
  pub channel_series: Vec<ChannelSeries>,
  pub total_views_latest_month: i64,
  pub total_income_latest_month: f64,
  pub total_subscribers_gained: i64,
  pub bar_chart_data: Vec<MultiChannelBar>,
}

fn round2(v: f64) -> f64 {
  (v * 100.0).round() / 100.0
}

fn cpm(ad_revenue_usd: f64, views: i64) -> f64 {
  if views > 0 {
    round2((ad_revenue_usd / (views as f64)) * 1000.0)
  } else {
    0.0
  }
}

fn channels_in_first_seen_order(records: &[RawMetricRecord]) -> Vec<String> {
  let mut out: Vec<String> = Vec::new();
  for r in records {
    let key = r.channel_key();
    if !out.iter().any(|c| c == key) {
      out.push(key.to_string());
    }
  }
  out
}

/// Latest record per (month, channel). Ties on `date` go to the record
/// stored later in the input.
fn latest_per_month(records: &[RawMetricRecord]) -> BTreeMap<MonthKey, HashMap<&str, &RawMetricRecord>> {
  let mut by_month: BTreeMap<MonthKey, HashMap<&str, &RawMetricRecord>> = BTreeMap::new();
  for r in records {
    let slot = by_month.entry(MonthKey::from_datetime(&r.date)).or_default();
    let key = r.channel_key();
    let replace = match slot.get(key) {
      None => true,
      Some(existing) => r.date >= existing.date,
    };
    if replace {
      slot.insert(key, r);
    }
  }
  by_month
}

fn bar_for_index(month: MonthKey, idx: usize, series: &[ChannelSeries]) -> MultiChannelBar {
  let mut total_views = 0i64;
  let mut total_ad_revenue = 0.0f64;
  let mut channels = Vec::with_capacity(series.len());

  for s in series {
    let record = s.entries.get(idx).and_then(|e| e.record.as_ref());
    let views = record.map(|r| r.views).unwrap_or(0);
    let ad_revenue = record.map(|r| r.ad_revenue_usd).unwrap_or(0.0);
    total_views = total_views.saturating_add(views);
    total_ad_revenue += ad_revenue;
    channels.push(ChannelBarPoint {
      channel: s.channel.clone(),
      views,
      cpm: cpm(ad_revenue, views),
    });
  }

  MultiChannelBar {
    month,
    channels,
    views: total_views,
    cpm: cpm(total_ad_revenue, total_views),
  }
}

/// Aligns every channel onto one month axis and derives the dashboard
/// totals. Latest-month figures use only the newest axis month; subscriber
/// gains span each channel's whole history; the chart keeps the trailing
/// `chart_window_months`.
pub fn build_multi_channel_summary(
  records: &[RawMetricRecord],
  cfg: &MultiChannelConfig,
) -> Option<MultiChannelSummary> {
  if records.is_empty() {
    return None;
  }

  let channels = channels_in_first_seen_order(records);
  let by_month = latest_per_month(records);
  let months: Vec<MonthKey> = by_month.keys().copied().collect();

  let channel_series: Vec<ChannelSeries> = channels
    .iter()
    .map(|channel| ChannelSeries {
      channel: channel.clone(),
      entries: by_month
        .iter()
        .map(|(month, slot)| ChannelMonthEntry {
          month: *month,
          record: slot.get(channel.as_str()).map(|r| (*r).clone()),
        })
        .collect(),
    })
    .collect();

  let latest_records = || {
    channel_series
      .iter()
      .filter_map(|s| s.entries.last().and_then(|e| e.record.as_ref()))
  };
  let total_views_latest_month = latest_records().fold(0i64, |acc, r| acc.saturating_add(r.views));
  let total_income_latest_month: f64 = latest_records().map(|r| r.estimated_revenue_usd).sum();
  let total_subscribers_gained = channel_series
    .iter()
    .fold(0i64, |acc, s| acc.saturating_add(s.subscribers_gained()));

  let window = cfg.chart_window_months.max(1);
  let start = months.len().saturating_sub(window);
  let bar_chart_data = months
    .iter()
    .enumerate()
    .skip(start)
    .map(|(idx, month)| bar_for_index(*month, idx, &channel_series))
    .collect();

  Some(MultiChannelSummary {
    months,
    channels,
    channel_series,
    total_views_latest_month,
    total_income_latest_month,
    total_subscribers_gained,
    bar_chart_data,
  })
}

pub fn build_multi_channel_summary_from_json(
  payload: &Value,
  cfg: &MultiChannelConfig,
) -> Option<MultiChannelSummary> {
  let records = parse_metric_records(payload)?;
  build_multi_channel_summary(&records, cfg)
}
