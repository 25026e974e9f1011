use serde::Serialize;

use crate::metrics::RawMetricRecord;

// Display placeholders until the score service returns a real result.
pub const PLACEHOLDER_OVERALL_SCORE: i64 = 80;
pub const PLACEHOLDER_CONSISTENCY: i64 = 75;
pub const PLACEHOLDER_ENGAGEMENT: i64 = 70;
const TREND_BASE_SCORE: i64 = 70;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreFactors {
  pub consistency: i64,
  pub engagement: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreTrendPoint {
  pub month: String,
  pub score: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizedCreditScore {
  pub overall_score: i64,
  pub score_factors: ScoreFactors,
  pub trend_data: Vec<ScoreTrendPoint>,
}

fn trend_score(views: i64) -> i64 {
  TREND_BASE_SCORE + views.div_euclid(1000)
}

/// Expects records already sorted ascending by date.
pub fn synthesize_credit_score(sorted: &[RawMetricRecord]) -> SynthesizedCreditScore {
  let trend_data = sorted
    .iter()
    .map(|r| ScoreTrendPoint {
      month: r.date.format("%b").to_string(),
      score: trend_score(r.views),
    })
    .collect();

  SynthesizedCreditScore {
    overall_score: PLACEHOLDER_OVERALL_SCORE,
    score_factors: ScoreFactors {
      consistency: PLACEHOLDER_CONSISTENCY,
      engagement: PLACEHOLDER_ENGAGEMENT,
    },
    trend_data,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{TimeZone, Utc};

  fn record(m: u32, views: i64) -> RawMetricRecord {
    let mut r = RawMetricRecord::new(Utc.with_ymd_and_hms(2025, m, 1, 0, 0, 0).unwrap());
    r.views = views;
    r
  }

  #[test]
  fn constants_do_not_depend_on_data() {
    let score = synthesize_credit_score(&[record(1, 9_999_999)]);
    assert_eq!(score.overall_score, 80);
    assert_eq!(score.score_factors.consistency, 75);
    assert_eq!(score.score_factors.engagement, 70);
  }

  #[test]
  fn trend_points_floor_thousands_of_views() {
    let score = synthesize_credit_score(&[record(1, 999), record(2, 1000), record(3, 25_400)]);
    let points: Vec<(&str, i64)> = score
      .trend_data
      .iter()
      .map(|p| (p.month.as_str(), p.score))
      .collect();
    assert_eq!(points, vec![("Jan", 70), ("Feb", 71), ("Mar", 95)]);
  }

  #[test]
  fn serializes_with_dashboard_field_names() {
    let value = serde_json::to_value(synthesize_credit_score(&[])).unwrap();
    assert_eq!(value["overallScore"], 80);
    assert_eq!(value["scoreFactors"]["consistency"], 75);
    assert!(value["trendData"].as_array().unwrap().is_empty());
  }
}
