use crate::models::price::{field, DailyRecord, LookbackRequest, PriceDelta};
use crate::scrapers::base::StockScraper;
use crate::util;
use chrono::{Datelike, NaiveDate};
use log::{debug, error};
use std::time::Duration;

/// 收盘价回溯解析器
///
/// 对单一数据源执行：抓取基准月页、定位基准日、向前回溯 N 个交易日，
/// 同页记录不足时逐月向更早翻页。每次调用独立持有自己的页缓冲，
/// 调用之间不共享状态。
pub struct LookbackResolver {
    page_delay: Duration,
    max_back_months: usize,
}

impl LookbackResolver {
    /// 创建解析器，翻页间隔 2 秒，最多向前搜索 12 个月
    pub fn new() -> Self {
        Self {
            page_delay: Duration::from_secs(2),
            max_back_months: 12,
        }
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    pub fn with_max_back_months(mut self, months: usize) -> Self {
        self.max_back_months = months;
        self
    }

    /// 解析基准日与 N 个交易日前的收盘价差
    ///
    /// 月页不可得、基准日不在页内、收盘价非法、历史不足，一律以 `None`
    /// 返回并各自记录日志，不向调用方抛错。
    pub async fn resolve(
        &self,
        scraper: &dyn StockScraper,
        request: &LookbackRequest,
    ) -> Option<PriceDelta> {
        let market = scraper.exchange_code();
        let first_of_month = request.date.with_day(1).unwrap_or(request.date);

        let page = match scraper
            .fetch_month_page(&request.stock_no, &first_of_month)
            .await
        {
            Ok(Some(page)) => page,
            Ok(None) => {
                debug!(
                    "({}) Fail to retrieve data for stock: {}",
                    market, request.stock_no
                );
                return None;
            }
            Err(e) => {
                error!(
                    "({}) Request failed for stock {}: {}",
                    market, request.stock_no, e
                );
                return None;
            }
        };

        let close_column = match page.column(field::CLOSING_PRICE) {
            Some(index) => index,
            None => {
                error!(
                    "({}) Closing Price field missing for stock: {}",
                    market, request.stock_no
                );
                return None;
            }
        };

        let token = scraper.date_match_token(&request.date);
        let reference_index = match page.position_of_date(&token) {
            Some(index) => index,
            None => {
                error!(
                    "({}) Input date not found in the data, date: {} stock: {}",
                    market, token, request.stock_no
                );
                return None;
            }
        };

        let reference_close =
            parse_close(market, &request.stock_no, &page.records[reference_index], close_column)?;

        // 同页内已有足够的较早记录时直接取值，不发出任何翻页请求
        let earlier_close = if request.sessions <= reference_index {
            let record = &page.records[reference_index - request.sessions];
            parse_close(market, &request.stock_no, record, close_column)?
        } else {
            let shortfall = request.sessions - reference_index;
            self.fetch_earlier_close(scraper, request, first_of_month, shortfall, close_column)
                .await?
        };

        Some(PriceDelta::from_prices(reference_close, earlier_close))
    }

    /// 逐月向更早翻页，累积基准月之前的交易记录
    ///
    /// 缓冲区始终保持日期升序（较早的月份插在前部），第 shortfall 个
    /// 基准月前的交易日即 `buffer[len - shortfall]`，两个数据源一致。
    async fn fetch_earlier_close(
        &self,
        scraper: &dyn StockScraper,
        request: &LookbackRequest,
        reference_month: NaiveDate,
        shortfall: usize,
        close_column: usize,
    ) -> Option<f64> {
        let market = scraper.exchange_code();
        let mut cursor = reference_month;
        let mut earlier_records: Vec<DailyRecord> = Vec::new();
        let mut fetched_months = 0;

        while earlier_records.len() < shortfall {
            if fetched_months >= self.max_back_months {
                error!(
                    "({}) Lookback exhausted after {} months for stock: {}",
                    market, fetched_months, request.stock_no
                );
                return None;
            }
            fetched_months += 1;

            // 翻页前固定等待，避免触发交易所的请求频率限制
            tokio::time::sleep(self.page_delay).await;
            cursor = util::previous_month_start(&cursor);

            match scraper.fetch_month_page(&request.stock_no, &cursor).await {
                Ok(Some(page)) => {
                    let mut merged = page.records;
                    merged.append(&mut earlier_records);
                    earlier_records = merged;
                }
                Ok(None) => {
                    debug!(
                        "({}) Fail to retrieve data for stock: {}",
                        market, request.stock_no
                    );
                    break;
                }
                Err(e) => {
                    error!(
                        "({}) Request failed for stock {}: {}",
                        market, request.stock_no, e
                    );
                    break;
                }
            }
        }

        if earlier_records.len() >= shortfall {
            let record = &earlier_records[earlier_records.len() - shortfall];
            parse_close(market, &request.stock_no, record, close_column)
        } else {
            error!("({}) Not enough records for stock: {}", market, request.stock_no);
            None
        }
    }
}

fn parse_close(
    market: &str,
    stock_no: &str,
    record: &DailyRecord,
    close_column: usize,
) -> Option<f64> {
    let raw = record.cell(close_column).unwrap_or_default();
    match util::parse_price(raw) {
        Ok(value) => Some(value),
        Err(_) => {
            error!(
                "({}) Illegal closing price in stock: {}, price string: {}",
                market, stock_no, raw
            );
            None
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{zero_delay_resolver, FakeScraper};
    use super::*;

    fn request(date: NaiveDate, sessions: usize) -> LookbackRequest {
        LookbackRequest {
            stock_no: "1303".to_string(),
            date,
            sessions,
        }
    }

    fn november_page() -> Vec<(&'static str, &'static str)> {
        // 基准日 2023/11/01 位于序号 10，序号 5 为有效较早记录
        vec![
            ("2023/10/18", "70.0"),
            ("2023/10/19", "70.5"),
            ("2023/10/20", "71.0"),
            ("2023/10/23", "72.0"),
            ("2023/10/24", "73.0"),
            ("2023/10/25", "80.0"),
            ("2023/10/26", "79.0"),
            ("2023/10/27", "79.5"),
            ("2023/10/30", "80.5"),
            ("2023/10/31", "81.0"),
            ("2023/11/01", "84.2"),
        ]
    }

    #[tokio::test]
    async fn test_in_page_lookup_issues_single_fetch() {
        // 较早记录在同页内时不应发出任何翻页请求
        let scraper = FakeScraper::new("FAKE").with_month(2023, 11, &november_page());
        let resolver = zero_delay_resolver();
        let date = NaiveDate::from_ymd_opt(2023, 11, 1).unwrap();

        let delta = resolver.resolve(&scraper, &request(date, 5)).await.unwrap();

        assert_eq!(delta.reference_closing_price, 84.2);
        assert_eq!(delta.earlier_closing_price, 80.0);
        assert_eq!(delta.price_difference, 4.2);
        assert_eq!(delta.percentage_difference, 5.25);
        assert_eq!(scraper.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_backward_paging_takes_earlier_price_from_prior_month() {
        // 同页记录不足，需向前翻一个月补足
        let scraper = FakeScraper::new("FAKE")
            .with_month(2023, 11, &[("2023/11/01", "81.0")])
            .with_month(2023, 10, &[("2023/10/30", "78.0"), ("2023/10/31", "80.0")]);
        let resolver = zero_delay_resolver();
        let date = NaiveDate::from_ymd_opt(2023, 11, 1).unwrap();

        let delta = resolver.resolve(&scraper, &request(date, 2)).await.unwrap();

        // 较早收盘价来自十月页，不是基准页
        assert_eq!(delta.earlier_closing_price, 78.0);
        assert_eq!(delta.price_difference, 3.0);
        assert_eq!(delta.percentage_difference, 3.85);
        assert_eq!(scraper.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_backward_paging_across_two_months() {
        let scraper = FakeScraper::new("FAKE")
            .with_month(2023, 11, &[("2023/11/01", "50.0")])
            .with_month(
                2023,
                10,
                &[
                    ("2023/10/27", "47.0"),
                    ("2023/10/30", "48.0"),
                    ("2023/10/31", "49.0"),
                ],
            )
            .with_month(
                2023,
                9,
                &[
                    ("2023/09/26", "44.0"),
                    ("2023/09/27", "45.0"),
                    ("2023/09/28", "45.5"),
                    ("2023/09/29", "46.0"),
                ],
            );
        let resolver = zero_delay_resolver();
        let date = NaiveDate::from_ymd_opt(2023, 11, 1).unwrap();

        // 五个交易日前：十月三日 + 九月两日，落在 09/28
        let delta = resolver.resolve(&scraper, &request(date, 5)).await.unwrap();

        assert_eq!(delta.earlier_closing_price, 45.5);
        assert_eq!(scraper.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_reference_date_absent_returns_none() {
        // 基准日（假日）不在月页内
        let scraper = FakeScraper::new("FAKE").with_month(2023, 11, &november_page());
        let resolver = zero_delay_resolver();
        let date = NaiveDate::from_ymd_opt(2023, 11, 4).unwrap();

        assert!(resolver.resolve(&scraper, &request(date, 5)).await.is_none());
    }

    #[tokio::test]
    async fn test_month_unavailable_returns_none() {
        let scraper = FakeScraper::new("FAKE");
        let resolver = zero_delay_resolver();
        let date = NaiveDate::from_ymd_opt(2023, 11, 1).unwrap();

        assert!(resolver.resolve(&scraper, &request(date, 5)).await.is_none());
    }

    #[tokio::test]
    async fn test_transport_failure_returns_none() {
        let scraper = FakeScraper::new("FAKE").with_failing_month(2023, 11);
        let resolver = zero_delay_resolver();
        let date = NaiveDate::from_ymd_opt(2023, 11, 1).unwrap();

        assert!(resolver.resolve(&scraper, &request(date, 5)).await.is_none());
    }

    #[tokio::test]
    async fn test_illegal_closing_price_returns_none() {
        let scraper = FakeScraper::new("FAKE")
            .with_month(2023, 11, &[("2023/10/31", "--"), ("2023/11/01", "84.2")]);
        let resolver = zero_delay_resolver();
        let date = NaiveDate::from_ymd_opt(2023, 11, 1).unwrap();

        assert!(resolver.resolve(&scraper, &request(date, 1)).await.is_none());
    }

    #[tokio::test]
    async fn test_insufficient_history_returns_none() {
        // 十月只有两笔，九月无资料，翻页在九月处停止
        let scraper = FakeScraper::new("FAKE")
            .with_month(2023, 11, &[("2023/11/01", "81.0")])
            .with_month(2023, 10, &[("2023/10/30", "78.0"), ("2023/10/31", "80.0")]);
        let resolver = zero_delay_resolver();
        let date = NaiveDate::from_ymd_opt(2023, 11, 1).unwrap();

        assert!(resolver.resolve(&scraper, &request(date, 5)).await.is_none());
        assert_eq!(scraper.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_month_cap_bounds_backward_search() {
        let scraper = FakeScraper::new("FAKE")
            .with_month(2023, 11, &[("2023/11/01", "81.0")])
            .with_month(2023, 10, &[("2023/10/31", "80.0")]);
        let resolver = zero_delay_resolver().with_max_back_months(1);
        let date = NaiveDate::from_ymd_opt(2023, 11, 1).unwrap();

        assert!(resolver.resolve(&scraper, &request(date, 5)).await.is_none());
        assert_eq!(scraper.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_zero_sessions_compares_reference_with_itself() {
        let scraper = FakeScraper::new("FAKE").with_month(2023, 11, &november_page());
        let resolver = zero_delay_resolver();
        let date = NaiveDate::from_ymd_opt(2023, 11, 1).unwrap();

        let delta = resolver.resolve(&scraper, &request(date, 0)).await.unwrap();
        assert_eq!(delta.price_difference, 0.0);
        assert_eq!(delta.percentage_difference, 0.0);
    }
}
