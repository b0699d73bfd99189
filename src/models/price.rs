use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

/// 行情栏位名称，与交易所回应中的英文栏位一致
pub mod field {
    pub const DATE: &str = "Date";
    pub const CLOSING_PRICE: &str = "Closing Price";
}

/// 收盘价涨跌结果
///
/// 仅在四个栏位全部可得且相互一致时构造；无法回溯时以 `None` 表示，
/// 不存在部分缺失的状态。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceDelta {
    pub price_difference: f64,
    pub percentage_difference: f64,
    pub reference_closing_price: f64,
    pub earlier_closing_price: f64,
}

impl PriceDelta {
    /// 由基准日与较早交易日的收盘价构造，差值与涨跌幅四舍五入到小数点后两位
    pub fn from_prices(reference: f64, earlier: f64) -> Self {
        let difference = reference - earlier;
        let percentage = difference / earlier * 100.0;

        Self {
            price_difference: round2(difference),
            percentage_difference: round2(percentage),
            reference_closing_price: reference,
            earlier_closing_price: earlier,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 单一交易日的原始行情记录，栏位顺序由所属月页的栏位索引决定
#[derive(Debug, Clone, Serialize)]
pub struct DailyRecord {
    pub cells: Vec<String>,
}

impl DailyRecord {
    pub fn cell(&self, index: usize) -> Option<&str> {
        self.cells.get(index).map(|s| s.as_str())
    }
}

/// 单一数据源单月的行情页
///
/// 记录按日期升序排列（交易所原生顺序），栏位名称到栏位序号的映射
/// 仅对本页有效。
#[derive(Debug, Clone)]
pub struct MonthPage {
    pub field_index: HashMap<String, usize>,
    pub records: Vec<DailyRecord>,
}

impl MonthPage {
    /// 查找栏位序号
    pub fn column(&self, name: &str) -> Option<usize> {
        self.field_index.get(name).copied()
    }

    /// 以日期字符串精确匹配，返回记录所在序号
    pub fn position_of_date(&self, token: &str) -> Option<usize> {
        let date_column = self.column(field::DATE)?;
        self.records
            .iter()
            .position(|record| record.cell(date_column) == Some(token))
    }
}

/// 回溯查询输入
#[derive(Debug, Clone)]
pub struct LookbackRequest {
    pub stock_no: String,
    pub date: NaiveDate,
    pub sessions: usize,
}
