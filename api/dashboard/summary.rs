use http_body_util::BodyExt;
use hyper::{HeaderMap, Method, StatusCode};
use vercel_runtime::{run, service_fn, Error, Request, Response, ResponseBody};

use credenza_metrics::cache::metrics_payload;
use credenza_metrics::dashboard::build_dashboard_summary;
use credenza_metrics::dashboard_multi::{build_multi_channel_summary, MultiChannelConfig};
use credenza_metrics::metrics::parse_metric_records;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SummaryMode {
  Single,
  Multi,
}

impl SummaryMode {
  fn parse(raw: Option<&str>) -> Option<Self> {
    match raw.map(str::trim).unwrap_or("") {
      "" | "single" => Some(Self::Single),
      "multi" => Some(Self::Multi),
      _ => None,
    }
  }

  fn as_str(self) -> &'static str {
    match self {
      Self::Single => "single",
      Self::Multi => "multi",
    }
  }
}

fn bearer_token(header_value: Option<&str>) -> Option<&str> {
  let value = header_value?;
  value.strip_prefix("Bearer ").or_else(|| value.strip_prefix("bearer "))
}

fn json_response(status: StatusCode, value: serde_json::Value) -> Result<Response<ResponseBody>, Error> {
  Ok(
    Response::builder()
      .status(status)
      .header("content-type", "application/json; charset=utf-8")
      .body(ResponseBody::from(value))?,
  )
}

fn query_param(query: Option<&str>, key: &str) -> Option<String> {
  let q = query?;
  for pair in q.split('&') {
    let mut it = pair.splitn(2, '=');
    let k = it.next().unwrap_or("");
    let v = it.next().unwrap_or("");
    if k == key {
      return Some(v.replace('+', " "));
    }
  }
  None
}

/// `Ok(Value::Null)` is a valid answer: the dashboard renders its empty state.
fn summarize_body(mode: SummaryMode, body: &[u8]) -> Result<serde_json::Value, String> {
  let payload: serde_json::Value =
    serde_json::from_slice(body).map_err(|e| format!("invalid json body: {e}"))?;
  let records = parse_metric_records(metrics_payload(&payload)).unwrap_or_default();

  let summary = match mode {
    SummaryMode::Single => serde_json::to_value(build_dashboard_summary(&records)),
    SummaryMode::Multi => {
      let cfg = MultiChannelConfig::from_env();
      serde_json::to_value(build_multi_channel_summary(&records, &cfg))
    }
  };

  summary.map_err(|e| format!("failed to encode summary: {e}"))
}

async fn handle_summary(
  method: &Method,
  headers: &HeaderMap,
  uri: &hyper::Uri,
  body: &[u8],
) -> Result<Response<ResponseBody>, Error> {
  if method != Method::POST {
    return json_response(
      StatusCode::METHOD_NOT_ALLOWED,
      serde_json::json!({"ok": false, "error": "method_not_allowed"}),
    );
  }

  let expected = std::env::var("RUST_INTERNAL_TOKEN").unwrap_or_default();
  let provided = bearer_token(headers.get("authorization").and_then(|v| v.to_str().ok())).unwrap_or("");

  if expected.is_empty() || provided != expected {
    return json_response(
      StatusCode::UNAUTHORIZED,
      serde_json::json!({"ok": false, "error": "unauthorized"}),
    );
  }

  let mode_raw = query_param(uri.query(), "mode");
  let Some(mode) = SummaryMode::parse(mode_raw.as_deref()) else {
    return json_response(
      StatusCode::BAD_REQUEST,
      serde_json::json!({"ok": false, "error": "bad_request", "message": "mode must be single or multi"}),
    );
  };

  let summary = match summarize_body(mode, body) {
    Ok(v) => v,
    Err(message) => {
      eprintln!("dashboard_summary: mode={} error={}", mode.as_str(), message);
      return json_response(
        StatusCode::BAD_REQUEST,
        serde_json::json!({"ok": false, "error": "bad_request", "message": message}),
      );
    }
  };

  eprintln!(
    "dashboard_summary: mode={} body_bytes={} empty={}",
    mode.as_str(),
    body.len(),
    summary.is_null()
  );

  json_response(
    StatusCode::OK,
    serde_json::json!({"ok": true, "mode": mode.as_str(), "summary": summary}),
  )
}

async fn handler(req: Request) -> Result<Response<ResponseBody>, Error> {
  let method = req.method().clone();
  let headers = req.headers().clone();
  let uri = req.uri().clone();
  let bytes = req.into_body().collect().await?.to_bytes();
  handle_summary(&method, &headers, &uri, &bytes).await
}

#[tokio::main]
async fn main() -> Result<(), Error> {
  run(service_fn(handler)).await
}

#[cfg(test)]
mod tests {
  use super::*;

  const TWO_MONTHS: &str = r#"[
    {"date":"2025-01-01","views":100,"estimatedRevenueUsd":10,"audienceSize":1000},
    {"date":"2025-02-01","views":150,"estimatedRevenueUsd":15,"audienceSize":1100}
  ]"#;

  fn authorized_headers() -> HeaderMap {
    std::env::set_var("RUST_INTERNAL_TOKEN", "secret");
    let mut headers = HeaderMap::new();
    headers.insert("authorization", "Bearer secret".parse().unwrap());
    headers
  }

  #[tokio::test]
  async fn returns_unauthorized_when_missing_internal_token() {
    std::env::set_var("RUST_INTERNAL_TOKEN", "secret");

    let headers = HeaderMap::new();
    let uri: hyper::Uri = "/api/dashboard/summary?mode=single".parse().unwrap();
    let response = handle_summary(&Method::POST, &headers, &uri, TWO_MONTHS.as_bytes())
      .await
      .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn rejects_non_post_methods() {
    let headers = authorized_headers();
    let uri: hyper::Uri = "/api/dashboard/summary".parse().unwrap();
    let response = handle_summary(&Method::GET, &headers, &uri, b"").await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
  }

  #[tokio::test]
  async fn rejects_unknown_mode_and_bad_json() {
    let headers = authorized_headers();

    let uri: hyper::Uri = "/api/dashboard/summary?mode=weekly".parse().unwrap();
    let response = handle_summary(&Method::POST, &headers, &uri, TWO_MONTHS.as_bytes())
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let uri: hyper::Uri = "/api/dashboard/summary?mode=multi".parse().unwrap();
    let response = handle_summary(&Method::POST, &headers, &uri, b"[{").await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn summarizes_authorized_requests() {
    let headers = authorized_headers();
    let uri: hyper::Uri = "/api/dashboard/summary?mode=multi".parse().unwrap();
    let response = handle_summary(&Method::POST, &headers, &uri, TWO_MONTHS.as_bytes())
      .await
      .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
  }

  #[test]
  fn mode_defaults_to_single() {
    assert_eq!(SummaryMode::parse(None), Some(SummaryMode::Single));
    assert_eq!(SummaryMode::parse(Some("multi")), Some(SummaryMode::Multi));
    assert_eq!(SummaryMode::parse(Some("both")), None);
  }

  #[test]
  fn single_summary_matches_dashboard_shape() {
    let summary = summarize_body(SummaryMode::Single, TWO_MONTHS.as_bytes()).unwrap();
    assert_eq!(summary["subscribersGained"], 100);
    assert_eq!(summary["totalViews"], 150);
    assert_eq!(summary["barChartData"][1]["views"], 50);
  }

  #[test]
  fn envelope_bodies_are_unwrapped() {
    let body = format!(r#"{{"metrics": {}}}"#, TWO_MONTHS);
    let summary = summarize_body(SummaryMode::Multi, body.as_bytes()).unwrap();
    assert_eq!(summary["totalViewsLatestMonth"], 150);
    assert_eq!(summary["channels"][0], "unknown");
  }

  #[test]
  fn empty_or_non_list_bodies_summarize_to_null() {
    assert!(summarize_body(SummaryMode::Single, b"[]").unwrap().is_null());
    assert!(summarize_body(SummaryMode::Multi, br#"{"ok":true}"#).unwrap().is_null());
  }
}
