use crate::errors::{ReporterError, Result};
use crate::models::price::{field, DailyRecord, MonthPage};
use crate::scrapers::base::StockScraper;
use crate::util;
use async_trait::async_trait;
use chrono::NaiveDate;
use log::debug;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

// st43 回应不带栏位列头，栏位序号为固定约定
const FIELD_COLUMNS: [(&str, usize); 9] = [
    (field::DATE, 0),
    ("Trade Volume", 1),
    ("Trade Value", 2),
    ("Opening Price", 3),
    ("Highest Price", 4),
    ("Lowest Price", 5),
    (field::CLOSING_PRICE, 6),
    ("Change", 7),
    ("Transaction", 8),
];

/// 证券柜台买卖中心（上柜）数据抓取器
pub struct TpexScraper {
    client: Client,
}

impl TpexScraper {
    /// 创建新的柜买中心数据抓取器
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ReporterError::RequestError(e))?;

        Ok(Self { client })
    }

    /// 解析 st43 月页回应，iTotalRecords 为零表示该月无资料
    fn page_from_json(json: &Value) -> Option<MonthPage> {
        let total = json
            .get("iTotalRecords")
            .and_then(|n| n.as_i64())
            .unwrap_or_default();
        if total <= 0 {
            return None;
        }

        let field_index: HashMap<String, usize> = FIELD_COLUMNS
            .iter()
            .map(|(name, index)| (name.to_string(), *index))
            .collect();

        let mut records = Vec::new();
        if let Some(data) = json.get("aaData").and_then(|d| d.as_array()) {
            for row in data {
                if let Some(row) = row.as_array() {
                    let cells = row
                        .iter()
                        .map(|cell| match cell.as_str() {
                            Some(s) => s.to_string(),
                            None => cell.to_string(),
                        })
                        .collect();
                    records.push(DailyRecord { cells });
                }
            }
        }

        Some(MonthPage {
            field_index,
            records,
        })
    }

    /// 柜买中心三大法人买卖超日报 CSV
    pub async fn fetch_institutional_csv(&self) -> Result<String> {
        let url = "https://www.tpex.org.tw/web/stock/3insti/daily_trade/3itrade_hedge_result.php?l=zh-tw&o=csv&se=EW&t=D";
        debug!("Fetching: {}", url);

        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(body)
    }
}

#[async_trait]
impl StockScraper for TpexScraper {
    fn exchange_code(&self) -> &'static str {
        "TPEX"
    }

    fn date_match_token(&self, date: &NaiveDate) -> String {
        // st43 的日期栏为民国 Y/MM/DD
        util::roc_match_token(date)
    }

    async fn fetch_month_page(
        &self,
        stock_no: &str,
        month: &NaiveDate,
    ) -> Result<Option<MonthPage>> {
        let url = format!(
            "https://www.tpex.org.tw/web/stock/aftertrading/daily_trading_info/st43_result.php?l=zh-tw&d={}&stkno={}",
            util::roc_url_token(month),
            stock_no
        );
        debug!("Fetching: {}", url);

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let json: Value = response.json().await?;

        Ok(Self::page_from_json(&json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_from_json_ok() {
        let json = json!({
            "iTotalRecords": 2,
            "aaData": [
                ["112/12/01", "1,200", "48,000", "39.50", "40.10", "39.20", "40.00", "+0.55", 680],
                ["112/12/04", "1,350", "55,000", "40.00", "41.00", "39.80", "40.80", "+0.80", 720]
            ]
        });

        let page = TpexScraper::page_from_json(&json).unwrap();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.column(field::CLOSING_PRICE), Some(6));
        assert_eq!(page.position_of_date("112/12/04"), Some(1));
        assert_eq!(page.records[1].cell(6), Some("40.80"));
        // 数字型储存格也要保留为字符串
        assert_eq!(page.records[0].cell(8), Some("680"));
    }

    #[test]
    fn test_page_from_json_empty() {
        let json = json!({ "iTotalRecords": 0, "aaData": [] });
        assert!(TpexScraper::page_from_json(&json).is_none());
    }

    #[tokio::test]
    #[ignore] // 实际网络测试
    async fn test_fetch_month_page_live() {
        let scraper = TpexScraper::new().unwrap();
        let month = NaiveDate::from_ymd_opt(2023, 12, 1).unwrap();
        let page = scraper.fetch_month_page("1815", &month).await.unwrap();

        let page = page.expect("2023-12 should have records");
        assert!(!page.records.is_empty());
    }
}
