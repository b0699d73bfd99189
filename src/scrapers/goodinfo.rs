use crate::errors::{ReporterError, Result};
use log::{debug, info};
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;

// 筛选页挑出「外资连续买超 – 日」的智慧选股清单
const SCREENER_URL: &str = "https://goodinfo.tw/tw2/StockList.asp?RPT_TIME=&MARKET_CAT=智慧選股&INDUSTRY_CAT=外資連買+–+日%40%40外資連續買超%40%40外資連續買超+–+日";

// goodinfo 会挡掉非浏览器的请求
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36";

/// 筛选页的表格内容
#[derive(Debug, Clone)]
pub struct ScreenerTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// goodinfo 选股页面抓取器
pub struct GoodinfoScraper {
    client: Client,
}

impl GoodinfoScraper {
    /// 创建新的选股页面抓取器
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ReporterError::RequestError(e))?;

        Ok(Self { client })
    }

    /// 抓取外资连续买超清单
    pub async fn fetch_foreign_streak_list(&self) -> Result<ScreenerTable> {
        debug!("Fetching: {}", SCREENER_URL);

        let html = self
            .client
            .get(SCREENER_URL)
            .header("user-agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let table = Self::parse_stock_table(&html)?;
        info!("筛选页共 {} 笔记录", table.rows.len());

        Ok(table)
    }

    /// 从页面 HTML 解出 tblStockList 表格
    fn parse_stock_table(html: &str) -> Result<ScreenerTable> {
        let document = Html::parse_document(html);

        let table_selector = Selector::parse("table#tblStockList")
            .map_err(|e| ReporterError::DataError(e.to_string()))?;
        let th_selector =
            Selector::parse("th").map_err(|e| ReporterError::DataError(e.to_string()))?;
        let tr_selector =
            Selector::parse("tr").map_err(|e| ReporterError::DataError(e.to_string()))?;
        let td_selector =
            Selector::parse("td").map_err(|e| ReporterError::DataError(e.to_string()))?;

        let table = document
            .select(&table_selector)
            .next()
            .ok_or_else(|| ReporterError::DataError("页面中找不到选股表格".to_string()))?;

        let headers: Vec<String> = table
            .select(&th_selector)
            .map(|th| th.text().collect::<String>().trim().to_string())
            .collect();

        // 首列为表头，资料列从第二列开始
        let mut rows = Vec::new();
        for tr in table.select(&tr_selector).skip(1) {
            let cells: Vec<String> = tr
                .select(&td_selector)
                .map(|td| td.text().collect::<String>().trim().to_string())
                .collect();

            if !cells.is_empty() {
                rows.push(cells);
            }
        }

        Ok(ScreenerTable { headers, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"
        <html><body>
        <table id="tblStockList">
            <tr><th>代號</th><th>名稱</th><th>外資連續買賣日數</th></tr>
            <tr><td>1303</td><td>南亞</td><td>6</td></tr>
            <tr><td>2330</td><td>台積電</td><td> 12 </td></tr>
        </table>
        </body></html>
    "#;

    #[test]
    fn test_parse_stock_table() {
        let table = GoodinfoScraper::parse_stock_table(SAMPLE_HTML).unwrap();
        assert_eq!(table.headers, vec!["代號", "名稱", "外資連續買賣日數"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0], vec!["1303", "南亞", "6"]);
        assert_eq!(table.rows[1][2], "12");
    }

    #[test]
    fn test_parse_stock_table_missing() {
        let result = GoodinfoScraper::parse_stock_table("<html><body></body></html>");
        assert!(result.is_err());
    }
}
