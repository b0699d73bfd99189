use crate::errors::{ReporterError, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// 报表流程配置，从 config.json 读取
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Discord webhook 地址
    pub discord_webhook_url: String,

    /// 外资连续买超天数的入选门槛
    #[serde(default = "default_min_cont_buy_days")]
    pub min_cont_buy_days: i64,

    /// 回溯的交易日数
    #[serde(default = "default_lookback_sessions")]
    pub lookback_sessions: usize,

    /// 入选的涨跌幅区间下限（%）
    #[serde(default = "default_min_change_percent")]
    pub min_change_percent: f64,

    /// 入选的涨跌幅区间上限（%）
    #[serde(default = "default_max_change_percent")]
    pub max_change_percent: f64,
}

fn default_min_cont_buy_days() -> i64 {
    5
}

fn default_lookback_sessions() -> usize {
    5
}

fn default_min_change_percent() -> f64 {
    0.0
}

fn default_max_change_percent() -> f64 {
    10.0
}

impl Config {
    /// 读取并校验配置文件
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let config: Config = serde_json::from_reader(BufReader::new(file))?;

        if config.discord_webhook_url.is_empty() {
            return Err(ReporterError::DataError(
                "Discord webhook URL not found in config".to_string(),
            ));
        }

        Ok(config)
    }
}
