pub mod cache;
pub mod credit_score;
pub mod dashboard;
pub mod dashboard_multi;
pub mod metrics;
