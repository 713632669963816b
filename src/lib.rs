pub mod analysis;
pub mod anomaly;
pub mod loader;
pub mod output;
pub mod reports;
pub mod types;
pub mod util;

pub use anomaly::max_past_day;
pub use reports::{build_analysis_data, build_drop_alerts, build_offer_report};
