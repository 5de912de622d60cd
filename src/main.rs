//! settlement-engine CLI
//!
//! Apportion documents and replay settlement scenarios from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Split a document into dated obligations
//! settlement-engine schedule --input document.json
//!
//! # Replay a scenario and print the settlement summary
//! settlement-engine report --input scenario.json --as-of 2026-06-30
//!
//! # Generate a random scenario for testing
//! settlement-engine generate --documents 50 --currencies USD,EUR,CNY --seed 7
//! ```
//!
//! Set `RUST_LOG=info` to see the commands the engine executes.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use settlement_engine::config::EngineConfig;
use settlement_engine::core::currency::CurrencyCode;
use settlement_engine::core::money::to_major;
use settlement_engine::report::aggregation::PortfolioSummary;
use settlement_engine::settlement::book::{ObligationView, SettlementBook};
use settlement_engine::simulation::scenario::{
    generate_random_scenario, DocumentInput, Scenario, ScenarioConfig,
};
use std::fs;
use std::process;

fn print_usage() {
    eprintln!(
        r#"settlement-engine: multi-currency payment schedules and settlement

USAGE:
    settlement-engine <COMMAND> [OPTIONS]

COMMANDS:
    schedule    Apportion a document across its payment-term stages
    report      Replay a scenario and print its settlement summary
    generate    Generate a random scenario (for testing)
    help        Show this message

OPTIONS (schedule):
    --input <FILE>      Path to JSON document with stages
    --config <FILE>     Engine configuration (default: USD base, EUR, CNY)
    --as-of <DATE>      Evaluation date, YYYY-MM-DD (default: today)
    --format <FORMAT>   Output format: text (default) or json

OPTIONS (report):
    --input <FILE>      Path to JSON scenario
    --as-of <DATE>      Evaluation date, YYYY-MM-DD (default: today)
    --format <FORMAT>   Output format: text (default) or json

OPTIONS (generate):
    --documents <N>     Number of documents (default: 10)
    --currencies <LIST> Comma-separated currency codes, base first (default: USD,EUR,CNY)
    --seed <N>          Seed for a reproducible scenario
    --no-rates          Do not record exchange rates
    --output <FILE>     Write to file instead of stdout

EXAMPLES:
    settlement-engine schedule --input po-1001.json --format json
    settlement-engine report --input scenario.json --as-of 2026-06-30
    settlement-engine generate --documents 100 --seed 42 --output scenario.json"#
    );
}

/// Options shared by the commands that read an input file.
struct InputOptions {
    input: String,
    config: Option<String>,
    as_of: NaiveDate,
    json: bool,
}

fn parse_input_options(args: &[String]) -> InputOptions {
    let mut input = None;
    let mut config = None;
    let mut as_of = Utc::now().date_naive();
    let mut format = "text".to_string();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => {
                i += 1;
                input = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--input requires a file path");
                    process::exit(1);
                }));
            }
            "--config" => {
                i += 1;
                config = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--config requires a file path");
                    process::exit(1);
                }));
            }
            "--as-of" => {
                i += 1;
                as_of = args
                    .get(i)
                    .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
                    .unwrap_or_else(|| {
                        eprintln!("--as-of requires a date in YYYY-MM-DD form");
                        process::exit(1);
                    });
            }
            "--format" => {
                i += 1;
                format = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--format requires 'text' or 'json'");
                    process::exit(1);
                });
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let input = input.unwrap_or_else(|| {
        eprintln!("Error: --input <FILE> is required");
        process::exit(1);
    });

    InputOptions {
        input,
        config,
        as_of,
        json: format == "json",
    }
}

fn read_file(path: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{}': {}", path, e);
        process::exit(1);
    })
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serialising output: {}", e);
            process::exit(1);
        }
    }
}

fn cmd_schedule(args: &[String]) {
    let opts = parse_input_options(args);

    let config = match &opts.config {
        Some(path) => EngineConfig::from_path(path).unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            process::exit(1);
        }),
        None => EngineConfig::default(),
    };

    let content = read_file(&opts.input);
    let input: DocumentInput = serde_json::from_str(&content).unwrap_or_else(|e| {
        eprintln!("Error parsing JSON: {}", e);
        eprintln!("Expected format:");
        eprintln!(
            r#"{{
  "reference": {{ "kind": "PAYABLE", "id": "PO-1001" }},
  "total_amount": 1000000,
  "currency": "USD",
  "anchors": {{ "order_date": "2026-01-10", "shipment_etd": "2026-03-01" }},
  "stages": [
    {{ "percentage": 30, "calculation_base": "ORDER_DATE" }},
    {{ "percentage": 70, "calculation_base": "BEFORE_SHIPMENT", "days_offset": -5 }}
  ]
}}"#
        );
        process::exit(1);
    });

    let reference = input.document.reference.clone();
    let views = SettlementBook::new(&config)
        .and_then(|mut book| {
            book.register_document(input.document.clone())?;
            book.generate_schedule_from_stages(&reference, &input.stages)?;
            book.obligations(&reference, opts.as_of)
        })
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            process::exit(1);
        });

    if opts.json {
        print_json(&views);
    } else {
        print_schedule(&reference.to_string(), &views);
    }
}

fn print_schedule(title: &str, views: &[ObligationView]) {
    println!("=== Schedule for {} ===", title);
    let mut total = 0;
    for (i, view) in views.iter().enumerate() {
        let ob = &view.obligation;
        let due = ob
            .due_date()
            .map(|d| d.to_string())
            .unwrap_or_else(|| "TBD".to_string());
        let condition = ob
            .due_condition()
            .map(|c| c.to_string())
            .unwrap_or_default();
        println!(
            "  {}. {:<24} {:>3}%  {:>16} {}  due {:<10} ({})  {}",
            i + 1,
            ob.label(),
            ob.percentage(),
            to_major(ob.amount()).to_string(),
            ob.currency(),
            due,
            condition,
            view.status()
        );
        if !ob.is_credit() {
            total += ob.amount();
        }
    }
    println!("  Total: {}", to_major(total));
}

fn cmd_report(args: &[String]) {
    let opts = parse_input_options(args);
    if opts.config.is_some() {
        eprintln!("--config is not used by 'report'; scenarios carry their own configuration");
        process::exit(1);
    }

    let content = read_file(&opts.input);
    let scenario = Scenario::from_json_str(&content).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        process::exit(1);
    });
    let book = scenario.replay().unwrap_or_else(|e| {
        eprintln!("Error replaying scenario: {}", e);
        process::exit(1);
    });

    let summary = book.portfolio_summary(opts.as_of);
    if opts.json {
        print_json(&summary);
    } else {
        print_portfolio(&summary);
    }
}

fn print_portfolio(summary: &PortfolioSummary) {
    println!("### Receivables");
    println!("{}", summary.receivables);
    println!("### Payables");
    println!("{}", summary.payables);
    println!("Received: {}", summary.received());
    println!("Paid:     {}", summary.paid());
    if summary.missing_exchange_rate() {
        println!("WARNING: totals exclude currencies without an approved exchange rate");
    }
}

fn cmd_generate(args: &[String]) {
    let mut config = ScenarioConfig::default();
    let mut output_path: Option<String> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--documents" => {
                i += 1;
                config.document_count = args
                    .get(i)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(|| {
                        eprintln!("--documents requires a number");
                        process::exit(1);
                    });
            }
            "--currencies" => {
                i += 1;
                let list = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--currencies requires a comma-separated list");
                    process::exit(1);
                });
                config.currencies = list
                    .split(',')
                    .map(|s| CurrencyCode::new(s.trim()))
                    .collect();
            }
            "--seed" => {
                i += 1;
                config.seed = Some(args.get(i).and_then(|s| s.parse().ok()).unwrap_or_else(|| {
                    eprintln!("--seed requires a number");
                    process::exit(1);
                }));
            }
            "--no-rates" => config.with_rates = false,
            "--output" => {
                i += 1;
                output_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--output requires a file path");
                    process::exit(1);
                }));
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let scenario = generate_random_scenario(&config);
    let json = serde_json::to_string_pretty(&scenario).unwrap_or_else(|e| {
        eprintln!("Error serialising scenario: {}", e);
        process::exit(1);
    });

    if let Some(path) = output_path {
        fs::write(&path, &json).unwrap_or_else(|e| {
            eprintln!("Error writing to '{}': {}", path, e);
            process::exit(1);
        });
        eprintln!(
            "Generated {} documents and {} payments → {}",
            scenario.documents.len(),
            scenario.payments.len(),
            path
        );
    } else {
        println!("{}", json);
    }
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "schedule" => cmd_schedule(rest),
        "report" => cmd_report(rest),
        "generate" => cmd_generate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
