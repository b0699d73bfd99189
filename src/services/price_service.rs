use crate::errors::Result;
use crate::models::price::{LookbackRequest, PriceDelta};
use crate::scrapers::base::StockScraper;
use crate::scrapers::tpex::TpexScraper;
use crate::scrapers::twse::TwseScraper;
use crate::services::lookback::LookbackResolver;
use crate::util;
use chrono::NaiveDate;
use log::debug;
use std::sync::Arc;

/// 跨数据源收盘价查询服务
///
/// 依优先级尝试各数据源：先查上市（证交所），查无结果时以相同的
/// 股号、日期与回溯天数改查上柜（柜买中心），并直接采用其结果。
pub struct PriceService {
    scrapers: Vec<Arc<dyn StockScraper + Send + Sync>>,
    resolver: LookbackResolver,
}

impl PriceService {
    /// 创建默认的双数据源查询服务
    pub fn new() -> Result<Self> {
        let scrapers: Vec<Arc<dyn StockScraper + Send + Sync>> = vec![
            Arc::new(TwseScraper::new()?),
            Arc::new(TpexScraper::new()?),
        ];

        Ok(Self::with_scrapers(scrapers, LookbackResolver::new()))
    }

    /// 以指定数据源与解析器创建查询服务
    pub fn with_scrapers(
        scrapers: Vec<Arc<dyn StockScraper + Send + Sync>>,
        resolver: LookbackResolver,
    ) -> Self {
        Self { scrapers, resolver }
    }

    /// 查询基准日与 N 个交易日前的收盘价差
    ///
    /// 所有数据源都无法解析时返回 `None`，调用方据此分支，不会收到错误。
    pub async fn resolve(
        &self,
        stock_no: &str,
        date: NaiveDate,
        sessions: usize,
    ) -> Option<PriceDelta> {
        let request = LookbackRequest {
            stock_no: stock_no.to_string(),
            date,
            sessions,
        };

        for scraper in &self.scrapers {
            if let Some(delta) = self.resolver.resolve(scraper.as_ref(), &request).await {
                return Some(delta);
            }
            debug!(
                "({}) no result for stock {}, trying next source",
                scraper.exchange_code(),
                stock_no
            );
        }

        None
    }

    /// 以台北时区的今天为基准日查询
    pub async fn resolve_today(&self, stock_no: &str, sessions: usize) -> Option<PriceDelta> {
        self.resolve(stock_no, util::taipei_today(), sessions).await
    }
}
