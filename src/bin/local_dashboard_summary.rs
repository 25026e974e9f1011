use std::path::PathBuf;

use vercel_runtime::Error;

use credenza_metrics::cache::load_cached_metrics;
use credenza_metrics::dashboard::build_dashboard_summary;
use credenza_metrics::dashboard_multi::{build_multi_channel_summary, MultiChannelConfig};

fn parse_flag_value(args: &[String], flag: &str) -> Option<String> {
  args
    .iter()
    .position(|a| a == flag)
    .and_then(|idx| args.get(idx + 1))
    .cloned()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Error> {
  let out = serde_json::to_string_pretty(value).map_err(|e| Box::new(e) as Error)?;
  println!("{out}");
  Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
  Single,
  Multi,
}

fn parse_mode(raw: &str) -> Result<Mode, Error> {
  match raw.trim() {
    "single" => Ok(Mode::Single),
    "multi" => Ok(Mode::Multi),
    other => Err(Box::new(std::io::Error::other(format!(
      "unknown --mode {other} (expected single or multi)"
    ))) as Error),
  }
}

fn main() -> Result<(), Error> {
  let args: Vec<String> = std::env::args().collect();

  let file = parse_flag_value(&args, "--file")
    .or_else(|| parse_flag_value(&args, "--cache"))
    .unwrap_or_default();
  if file.trim().is_empty() {
    eprintln!("Missing required --file");
    eprintln!("Example: cargo run --bin local_dashboard_summary -- --file metrics.json --mode multi");
    return Ok(());
  }

  let mode = parse_mode(&parse_flag_value(&args, "--mode").unwrap_or_else(|| "single".to_string()))?;
  let path = PathBuf::from(file.trim());
  let records = load_cached_metrics(&path)?.unwrap_or_default();

  match mode {
    Mode::Single => {
      let Some(summary) = build_dashboard_summary(&records) else {
        println!("ok=true mode=single records={} summary=null", records.len());
        return Ok(());
      };
      println!(
        "ok=true mode=single records={} total_views={} subscribers_gained={} monthly_income={:.2}",
        records.len(),
        summary.total_views,
        summary.subscribers_gained,
        summary.yt_income.monthly_income
      );
      print_json(&summary)?;
    }
    Mode::Multi => {
      let cfg = match parse_flag_value(&args, "--window") {
        Some(v) => MultiChannelConfig::from_window_setting(Some(v.as_str())),
        None => MultiChannelConfig::from_env(),
      };
      let Some(summary) = build_multi_channel_summary(&records, &cfg) else {
        println!("ok=true mode=multi records={} summary=null", records.len());
        return Ok(());
      };
      println!(
        "ok=true mode=multi records={} channels={} months={} window={} total_views_latest_month={} total_subscribers_gained={}",
        records.len(),
        summary.channels.len(),
        summary.months.len(),
        cfg.chart_window_months,
        summary.total_views_latest_month,
        summary.total_subscribers_gained
      );
      print_json(&summary)?;
    }
  }

  Ok(())
}
