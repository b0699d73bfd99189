use crate::errors::{ReporterError, Result};
use crate::models::price::{DailyRecord, MonthPage};
use crate::scrapers::base::StockScraper;
use async_trait::async_trait;
use chrono::NaiveDate;
use log::debug;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// 台湾证券交易所（上市）数据抓取器
pub struct TwseScraper {
    client: Client,
}

impl TwseScraper {
    /// 创建新的证交所数据抓取器
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ReporterError::RequestError(e))?;

        Ok(Self { client })
    }

    /// 解析 STOCK_DAY 月页回应
    ///
    /// stat 不为 "OK" 表示该月无资料；栏位索引从 fields 数组发现。
    fn page_from_json(json: &Value) -> Option<MonthPage> {
        if json.get("stat").and_then(|s| s.as_str()) != Some("OK") {
            return None;
        }

        let mut field_index = HashMap::new();
        if let Some(fields) = json.get("fields").and_then(|f| f.as_array()) {
            for (i, name) in fields.iter().enumerate() {
                if let Some(name) = name.as_str() {
                    field_index.insert(name.to_string(), i);
                }
            }
        }

        let mut records = Vec::new();
        if let Some(data) = json.get("data").and_then(|d| d.as_array()) {
            for row in data {
                if let Some(row) = row.as_array() {
                    let cells = row
                        .iter()
                        .map(|cell| cell.as_str().unwrap_or_default().to_string())
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

    /// 判断指定日期是否为交易日，MI_INDEX 的 CSV 回应为空即为非交易日
    pub async fn is_trading_day(&self, date: &NaiveDate) -> Result<bool> {
        let url = format!(
            "https://www.twse.com.tw/rwd/zh/afterTrading/MI_INDEX?date={}&type=MS&response=csv",
            date.format("%Y%m%d")
        );
        debug!("Fetching: {}", url);

        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(!body.trim().is_empty())
    }

    /// 证交所三大法人买卖超日报 CSV
    pub async fn fetch_institutional_csv(&self, date: &NaiveDate) -> Result<String> {
        let url = format!(
            "https://www.twse.com.tw/rwd/zh/fund/T86?date={}&selectType=ALL&response=csv",
            date.format("%Y%m%d")
        );
        debug!("Fetching: {}", url);

        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(body)
    }
}

#[async_trait]
impl StockScraper for TwseScraper {
    fn exchange_code(&self) -> &'static str {
        "TWSE"
    }

    fn date_match_token(&self, date: &NaiveDate) -> String {
        // STOCK_DAY 英文版的日期栏为西元 YYYY/MM/DD
        date.format("%Y/%m/%d").to_string()
    }

    async fn fetch_month_page(
        &self,
        stock_no: &str,
        month: &NaiveDate,
    ) -> Result<Option<MonthPage>> {
        let url = format!(
            "https://www.twse.com.tw/rwd/en/afterTrading/STOCK_DAY?date={}&stockNo={}&response=json",
            month.format("%Y%m%d"),
            stock_no
        );
        debug!("Fetching: {}", url);

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let json: Value = response.json().await?;

        Ok(Self::page_from_json(&json))
    }
}
