//! valuation-query - answer one valuation or listing query as JSON on stdout

use anyhow::{bail, Context, Result};
use car_market_backend::config::Config;
use car_market_backend::service::MarketService;
use car_market_backend::valuation::evaluate::EvaluationOptions;
use car_market_backend::valuation::insights::InsightScope;
use car_market_backend::valuation::ValuationQuery;
use serde::Serialize;
use std::env;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: valuation-query <command> [args]

commands:
  valuate <make> <model> <trim> <regional specs> <year> <kilometers>
  comparables <make> <model> <year>
  undervalued
  for-sale
  auctions
  insights [for_sale|sold_out|auction]
  evaluate [--standard] [--no-outliers]
  options | rules | years";

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(service: &MarketService, args: &[String]) -> Result<ExitCode> {
    let command = args.first().map(String::as_str).unwrap_or_default();
    let rest = args.get(1..).unwrap_or_default();

    match command {
        "valuate" => {
            let field = |i: usize| rest.get(i).cloned();
            let query = ValuationQuery {
                make: field(0),
                model: field(1),
                trim: field(2),
                regional_specs: field(3),
                year: field(4),
                kilometers: field(5),
            };
            match service.valuate(&query) {
                Ok(valuation) => print_json(&valuation)?,
                Err(e) => {
                    print_json(&ErrorResponse {
                        error: e.kind(),
                        message: e.to_string(),
                    })?;
                    return Ok(ExitCode::from(2));
                }
            }
        }
        "comparables" => {
            let [make, model, year] = rest else {
                bail!("comparables takes <make> <model> <year>");
            };
            let year: i32 = year
                .trim()
                .parse()
                .with_context(|| format!("Year must be numeric, got {:?}", year))?;
            print_json(&service.list_comparables(make, model, year)?)?;
        }
        "undervalued" => print_json(&service.list_undervalued()?)?,
        "for-sale" => print_json(&service.list_cars_for_sale()?)?,
        "auctions" => print_json(&service.list_auction_cars()?)?,
        "insights" => match rest.first().map(String::as_str).unwrap_or("for_sale") {
            "for_sale" => print_json(&service.market_insights(InsightScope::ForSale)?)?,
            "sold_out" => print_json(&service.market_insights(InsightScope::SoldOut)?)?,
            "auction" => print_json(&service.auction_insights()?)?,
            other => bail!("Unknown insights scope: {}", other),
        },
        "evaluate" => {
            let options = EvaluationOptions {
                standard_only: rest.iter().any(|a| a == "--standard"),
                remove_outliers: rest.iter().any(|a| a == "--no-outliers"),
            };
            print_json(&service.evaluate_model(options)?)?;
        }
        "options" => print_json(&service.options())?,
        "rules" => print_json(&service.filtering_rules())?,
        "years" => print_json(&service.years())?,
        _ => {
            eprintln!("{}", USAGE);
            return Ok(ExitCode::from(64));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout carries only the JSON answer
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();

    let result = Config::from_env()
        .and_then(|config| MarketService::open(&config))
        .and_then(|service| run(&service, &args));

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
