use serde::Serialize;
use serde_json::Value;

use crate::credit_score::{synthesize_credit_score, SynthesizedCreditScore};
use crate::metrics::{parse_metric_records, sorted_by_date, RawMetricRecord};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeSummary {
  pub monthly_income: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMetricsSummary {
  pub views: i64,
  pub audience_size: i64,
  pub post_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyBar {
  pub month: String,
  pub views: i64,
  pub cpm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
  pub credit_score: SynthesizedCreditScore,
  pub yt_income: IncomeSummary,
  pub yt_metrics: ChannelMetricsSummary,
  pub subscribers_gained: i64,
  pub bar_chart_data: Vec<MonthlyBar>,
  pub total_views: i64,
  /// Not computed yet; always serialized as `null`.
  pub top_video: Option<Value>,
}

fn delta_cpm(revenue_usd: f64, views_delta: i64) -> f64 {
  if views_delta > 0 && revenue_usd != 0.0 {
    revenue_usd / ((views_delta as f64) / 1000.0)
  } else {
    0.0
  }
}

/// Month-over-month view deltas with a CPM per delta. The first period has
/// no predecessor: its delta is its raw view count and its CPM is 0.
pub fn monthly_bars(sorted: &[RawMetricRecord]) -> Vec<MonthlyBar> {
  let mut prev: Option<&RawMetricRecord> = None;
  let mut out = Vec::with_capacity(sorted.len());

  for r in sorted {
    let (views, cpm) = match prev {
      None => (r.views, 0.0),
      Some(p) => {
        let delta = r.views.saturating_sub(p.views);
        (delta, delta_cpm(r.estimated_revenue_usd, delta))
      }
    };
    out.push(MonthlyBar {
      month: r.date.format("%b %Y").to_string(),
      views,
      cpm,
    });
    prev = Some(r);
  }

  out
}

/// Single-channel dashboard. `None` means "nothing to show".
pub fn build_dashboard_summary(records: &[RawMetricRecord]) -> Option<DashboardSummary> {
  let sorted = sorted_by_date(records);
  let earliest = sorted.first()?;
  let latest = sorted.last()?;

  let bar_chart_data = monthly_bars(&sorted);
  let total_views = bar_chart_data.iter().fold(0i64, |acc, b| acc.saturating_add(b.views));

  Some(DashboardSummary {
    credit_score: synthesize_credit_score(&sorted),
    yt_income: IncomeSummary {
      monthly_income: latest.estimated_revenue_usd,
    },
    yt_metrics: ChannelMetricsSummary {
      views: total_views,
      audience_size: latest.audience_size,
      post_count: latest.post_count,
    },
    subscribers_gained: latest.audience_size.saturating_sub(earliest.audience_size),
    bar_chart_data,
    total_views,
    top_video: None,
  })
}

pub fn build_dashboard_summary_from_json(payload: &Value) -> Option<DashboardSummary> {
  let records = parse_metric_records(payload)?;
  build_dashboard_summary(&records)
}
