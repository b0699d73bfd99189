use crate::config::Config;
use crate::errors::{ReporterError, Result};
use crate::models::price::PriceDelta;
use crate::notify::DiscordWebhook;
use crate::scrapers::base::StockScraper;
use crate::scrapers::goodinfo::{GoodinfoScraper, ScreenerTable};
use crate::scrapers::tpex::TpexScraper;
use crate::scrapers::twse::TwseScraper;
use crate::services::lookback::LookbackResolver;
use crate::services::price_service::PriceService;
use crate::util;
use log::{info, warn};
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

// 筛选页的关键栏位
const CODE_HEADER: &str = "代號";
const STREAK_HEADER: &str = "外資連續買賣日數";

/// 每日报表服务，处理选股、回溯过滤与报表推送
pub struct ReportService {
    config: Config,
    twse: Arc<TwseScraper>,
    tpex: Arc<TpexScraper>,
    prices: PriceService,
    screener: GoodinfoScraper,
    webhook: DiscordWebhook,
}

impl ReportService {
    /// 创建新的报表服务实例
    pub fn new(config: Config) -> Result<Self> {
        let twse = Arc::new(TwseScraper::new()?);
        let tpex = Arc::new(TpexScraper::new()?);

        let scrapers: Vec<Arc<dyn StockScraper + Send + Sync>> =
            vec![twse.clone(), tpex.clone()];
        let prices = PriceService::with_scrapers(scrapers, LookbackResolver::new());

        let webhook = DiscordWebhook::new(&config.discord_webhook_url)?;

        Ok(Self {
            config,
            twse,
            tpex,
            prices,
            screener: GoodinfoScraper::new()?,
            webhook,
        })
    }

    /// 今天（台北时区）是否为交易日
    pub async fn is_trading_day(&self) -> Result<bool> {
        self.twse.is_trading_day(&util::taipei_today()).await
    }

    /// 外资连续买超日报
    ///
    /// 抓取筛选清单，逐一回溯涨跌幅，落在配置区间内的股票组成 CSV
    /// 推送到 webhook。
    pub async fn run_daily_report(&self) -> Result<()> {
        let table = self.screener.fetch_foreign_streak_list().await?;

        let code_column = column_of(&table, CODE_HEADER)?;
        let streak_column = column_of(&table, STREAK_HEADER)?;

        // 同一股票可能重复出现，只保留首笔；买超天数非数值的列直接剔除
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for row in &table.rows {
            let code = match row.get(code_column) {
                Some(code) if !code.is_empty() => code.clone(),
                _ => continue,
            };
            if !seen.insert(code) {
                continue;
            }

            let streak = row.get(streak_column).and_then(|v| v.parse::<i64>().ok());
            if matches!(streak, Some(days) if days >= self.config.min_cont_buy_days) {
                candidates.push(row.clone());
            }
        }

        info!(
            "{} stocks above {}-day streak threshold",
            candidates.len(),
            self.config.min_cont_buy_days
        );

        let mut qualified: Vec<(Vec<String>, PriceDelta)> = Vec::new();
        for row in candidates {
            let code = match row.get(code_column) {
                Some(code) => code.clone(),
                None => continue,
            };

            // 个股之间随机等待数秒，错开对交易所的连续查询
            let pause = rand::thread_rng().gen_range(3..=8);
            tokio::time::sleep(Duration::from_secs(pause)).await;

            match self
                .prices
                .resolve_today(&code, self.config.lookback_sessions)
                .await
            {
                Some(delta) if within_band(delta.percentage_difference, &self.config) => {
                    qualified.push((row, delta));
                }
                Some(delta) => {
                    info!(
                        "Stock {} change {}% outside report band",
                        code, delta.percentage_difference
                    );
                }
                None => {
                    warn!("No price data available for stock: {}", code);
                }
            }
        }

        if qualified.is_empty() {
            info!("No stock qualified for today's report");
            return Ok(());
        }

        let csv = build_report_csv(&table.headers, &qualified, self.config.lookback_sessions)?;
        let message = format!("外資連續{}日以上買超資料", self.config.min_cont_buy_days);
        self.webhook
            .send_file("filtered_stock_data.csv", csv, &message)
            .await?;

        info!("Daily report sent, {} stocks", qualified.len());
        Ok(())
    }

    /// 三大法人买卖超日报，转送证交所与柜买中心的盘后 CSV
    pub async fn run_insti_report(&self) -> Result<()> {
        let today = util::taipei_today();
        let date_tag = today.format("%Y%m%d");
        let readable = today.format("%Y年%m月%d日");

        let twse_csv = self.twse.fetch_institutional_csv(&today).await?;
        self.webhook
            .send_file(
                &format!("twse_3insti_{}.csv", date_tag),
                twse_csv.into_bytes(),
                &format!("{} 證交所-三大法人買賣超日報", readable),
            )
            .await?;

        let tpex_csv = self.tpex.fetch_institutional_csv().await?;
        self.webhook
            .send_file(
                &format!("tpex_3insti_{}.csv", date_tag),
                tpex_csv.into_bytes(),
                &format!("{} 櫃買中心-三大法人買賣超日報", readable),
            )
            .await?;

        info!("CSV data sent to Discord successfully!");
        Ok(())
    }
}

fn column_of(table: &ScreenerTable, name: &str) -> Result<usize> {
    table
        .headers
        .iter()
        .position(|header| header == name)
        .ok_or_else(|| ReporterError::DataError(format!("screener header {} not found", name)))
}

fn within_band(percentage: f64, config: &Config) -> bool {
    percentage >= config.min_change_percent && percentage <= config.max_change_percent
}

/// 组出报表 CSV：筛选页原始栏位加上回溯涨跌与涨跌幅
fn build_report_csv(
    headers: &[String],
    rows: &[(Vec<String>, PriceDelta)],
    sessions: usize,
) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header_row: Vec<String> = headers.to_vec();
    header_row.push(format!("{}日漲跌", sessions));
    header_row.push(format!("{}日漲跌幅(%)", sessions));
    writer.write_record(&header_row)?;

    for (cells, delta) in rows {
        let mut record = cells.clone();
        record.push(delta.price_difference.to_string());
        record.push(delta.percentage_difference.to_string());
        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|e| ReporterError::DataError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(min: f64, max: f64) -> Config {
        serde_json::from_str(&format!(
            r#"{{
                "discord_webhook_url": "https://example.com/hook",
                "min_change_percent": {},
                "max_change_percent": {}
            }}"#,
            min, max
        ))
        .unwrap()
    }

    #[test]
    fn test_within_band() {
        let config = test_config(0.0, 10.0);
        assert!(within_band(0.0, &config));
        assert!(within_band(5.25, &config));
        assert!(within_band(10.0, &config));
        assert!(!within_band(-0.5, &config));
        assert!(!within_band(10.01, &config));
    }

    #[test]
    fn test_column_of() {
        let table = ScreenerTable {
            headers: vec!["代號".to_string(), "名稱".to_string()],
            rows: Vec::new(),
        };
        assert_eq!(column_of(&table, "代號").unwrap(), 0);
        assert!(column_of(&table, "外資連續買賣日數").is_err());
    }

    #[test]
    fn test_build_report_csv() {
        let headers = vec!["代號".to_string(), "名稱".to_string()];
        let rows = vec![(
            vec!["1303".to_string(), "南亞".to_string()],
            PriceDelta::from_prices(84.2, 80.0),
        )];

        let bytes = build_report_csv(&headers, &rows, 5).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), "代號,名稱,5日漲跌,5日漲跌幅(%)");
        assert_eq!(lines.next().unwrap(), "1303,南亞,4.2,5.25");
        assert!(lines.next().is_none());
    }
}
