pub mod lookback;
pub mod price_service;
pub mod report_service;
