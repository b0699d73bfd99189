use twstock_reporter::config::Config;
use twstock_reporter::services::price_service::PriceService;
use twstock_reporter::services::report_service::ReportService;
use twstock_reporter::util;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{App, Arg, SubCommand};
use log::info;
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init();

    let today = util::taipei_today().format("%Y-%m-%d").to_string();

    // 创建基本的命令行应用
    let app = App::new("twstock-reporter")
        .version("1.0.0")
        .author("twstock-reporter Team")
        .about("Taiwan stock after-market reporting system");

    // 添加子命令
    let app = app
        .subcommand(
            SubCommand::with_name("lookback")
                .about("Resolve the closing price change over the last N sessions")
                .arg(
                    Arg::with_name("stock")
                        .short('s')
                        .long("stock")
                        .value_name("STOCK")
                        .help("Stock number to resolve")
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("date")
                        .short('d')
                        .long("date")
                        .value_name("DATE")
                        .help("Reference date (YYYY-MM-DD)")
                        .takes_value(true)
                        .default_value(&today),
                )
                .arg(
                    Arg::with_name("sessions")
                        .short('n')
                        .long("sessions")
                        .value_name("SESSIONS")
                        .help("Number of sessions to look back")
                        .takes_value(true)
                        .default_value("5"),
                ),
        )
        .subcommand(
            SubCommand::with_name("daily-report")
                .about("Build and deliver the foreign-investor streak report")
                .arg(
                    Arg::with_name("config")
                        .short('c')
                        .long("config")
                        .value_name("CONFIG")
                        .help("Path to config.json")
                        .takes_value(true)
                        .default_value("config.json"),
                ),
        )
        .subcommand(
            SubCommand::with_name("insti-report")
                .about("Deliver the institutional investors daily CSV report")
                .arg(
                    Arg::with_name("config")
                        .short('c')
                        .long("config")
                        .value_name("CONFIG")
                        .help("Path to config.json")
                        .takes_value(true)
                        .default_value("config.json"),
                ),
        );

    let matches = app.get_matches();

    if let Some(matches) = matches.subcommand_matches("lookback") {
        let stock = matches.value_of("stock").unwrap();
        let date_str = matches.value_of("date").unwrap();
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")?;
        let sessions = matches
            .value_of("sessions")
            .unwrap_or("5")
            .parse::<usize>()
            .unwrap_or(5);

        let service = PriceService::new()?;

        match service.resolve(stock, date, sessions).await {
            Some(delta) => {
                println!("The price difference is: {}", delta.price_difference);
                println!(
                    "The percentage difference is: {}%",
                    delta.percentage_difference
                );
                println!(
                    "The closing price on {} is: {}",
                    date, delta.reference_closing_price
                );
                println!(
                    "The closing price {} sessions earlier is: {}",
                    sessions, delta.earlier_closing_price
                );
            }
            None => {
                println!("No stock data available.");
            }
        }
    } else if let Some(matches) = matches.subcommand_matches("daily-report") {
        let config = load_config(matches.value_of("config").unwrap_or("config.json"))?;
        let service = ReportService::new(config)?;

        service.run_daily_report().await?;
    } else if let Some(matches) = matches.subcommand_matches("insti-report") {
        let config = load_config(matches.value_of("config").unwrap_or("config.json"))?;
        let service = ReportService::new(config)?;

        // 非交易日直接跳过
        if !service.is_trading_day().await? {
            info!("Today is not a trading day. Skipping main process.");
            return Ok(());
        }

        service.run_insti_report().await?;
    } else {
        info!("No command specified. Use --help for usage information.");
    }

    Ok(())
}

fn load_config(path: &str) -> anyhow::Result<Config> {
    let config = Config::from_file(Path::new(path))
        .with_context(|| format!("failed to load config from {}", path))?;
    Ok(config)
}
