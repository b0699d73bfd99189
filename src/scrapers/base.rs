use crate::errors::Result;
use crate::models::price::MonthPage;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Base trait for daily quote scrapers
///
/// Each exchange serves quotes in monthly pages with its own URL template,
/// response envelope and date encoding.
#[async_trait]
pub trait StockScraper {
    /// Get the exchange code this scraper is for
    fn exchange_code(&self) -> &'static str;

    /// The exact date string this exchange uses in its data rows
    fn date_match_token(&self, date: &NaiveDate) -> String;

    /// Fetch one month of daily records for a stock
    ///
    /// Returns `Ok(None)` when the exchange is reachable but reports no
    /// records for that month. Transport and envelope failures surface as
    /// `Err`; callers treat both as "month unavailable" but log them apart.
    async fn fetch_month_page(&self, stock_no: &str, month: &NaiveDate) -> Result<Option<MonthPage>>;
}
