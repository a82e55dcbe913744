pub mod usage_chart;
pub mod usage_dashboard;
