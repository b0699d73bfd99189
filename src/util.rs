use chrono::{Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Asia::Taipei;

// 民国纪年（西元年 - 1911）转换工具，上柜数据源的 URL 与资料列均使用民国日期

/// URL 用的民国年月字符串，经过百分号编码，如 2023-11 -> "112%2F11"
pub fn roc_url_token(date: &NaiveDate) -> String {
    let roc_year = date.year() - 1911;
    urlencoding::encode(&format!("{}/{:02}", roc_year, date.month())).into_owned()
}

/// 资料列匹配用的民国年月日字符串，如 2023-11-01 -> "112/11/01"
pub fn roc_match_token(date: &NaiveDate) -> String {
    let roc_year = date.year() - 1911;
    format!("{}/{:02}/{:02}", roc_year, date.month(), date.day())
}

/// 上个月的第一天：先退到本月一日，再往前一天落入上月，最后归一到月初
pub fn previous_month_start(date: &NaiveDate) -> NaiveDate {
    let first = date.with_day(1).unwrap_or(*date);
    let last_of_previous = first - Duration::days(1);
    last_of_previous.with_day(1).unwrap_or(last_of_previous)
}

/// 台北时区的今天
pub fn taipei_today() -> NaiveDate {
    Utc::now().with_timezone(&Taipei).date_naive()
}

/// 解析带千分位的收盘价字符串
pub fn parse_price(raw: &str) -> std::result::Result<f64, std::num::ParseFloatError> {
    raw.trim().replace(',', "").parse::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roc_url_token() {
        let date = NaiveDate::from_ymd_opt(2023, 11, 1).unwrap();
        assert_eq!(roc_url_token(&date), "112%2F11");

        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(roc_url_token(&date), "113%2F01");
    }

    #[test]
    fn test_roc_match_token() {
        let date = NaiveDate::from_ymd_opt(2023, 12, 5).unwrap();
        assert_eq!(roc_match_token(&date), "112/12/05");

        let date = NaiveDate::from_ymd_opt(2023, 11, 1).unwrap();
        assert_eq!(roc_match_token(&date), "112/11/01");
    }

    #[test]
    fn test_previous_month_start() {
        let date = NaiveDate::from_ymd_opt(2023, 11, 15).unwrap();
        assert_eq!(
            previous_month_start(&date),
            NaiveDate::from_ymd_opt(2023, 10, 1).unwrap()
        );

        // 跨年
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(
            previous_month_start(&date),
            NaiveDate::from_ymd_opt(2023, 12, 1).unwrap()
        );
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("1,234.56").unwrap(), 1234.56);
        assert_eq!(parse_price("80.10").unwrap(), 80.10);
        assert!(parse_price("--").is_err());
        assert!(parse_price("").is_err());
    }
}
