//! Business-rule checks and accuracy report for the price model.
//!
//! Exits with an error when any check fails.
//!
//! # Usage
//! ```sh
//! cargo run --bin evaluate_model -- --samples 1000
//! ```

use anyhow::{Result, bail};
use clap::Parser;
use fixit_pricing::application::ml::RuleOnlyModel;
use fixit_pricing::application::ml::evaluation::{self, EvaluationReport};
use fixit_pricing::application::pricing::PriceEstimationService;
use fixit_pricing::config::Config;
use fixit_pricing::domain::pricing::{Confidence, RangeWarning, TrainedBounds, travel_cost};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model directory (overrides PRICE_MODEL_DIR)
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Size of the synthetic reference set
    #[arg(long, default_value_t = 1000)]
    samples: usize,

    /// Seed of the synthetic reference set
    #[arg(long, default_value_t = 7)]
    seed: u64,
}

struct Check {
    name: &'static str,
    passed: bool,
    detail: String,
}

impl Check {
    fn new(name: &'static str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed,
            detail: detail.into(),
        }
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(dir) = args.model_dir {
        config.model_dir = dir;
    }
    config.eager_init = true;

    let service = PriceEstimationService::from_config(&config)?;
    let checks = run_checks(&service);

    println!("\nBusiness rules");
    for check in &checks {
        let mark = if check.passed { "PASS" } else { "FAIL" };
        println!("  [{}] {:<28} {}", mark, check.name, check.detail);
    }

    let cases = evaluation::generate_test_set(args.samples, args.seed);
    let price = |d: f64, r: f64| service.get_estimated_price(d, r).ok().map(|e| e.estimated_price);
    let report = evaluation::evaluate(price, &cases);
    print_report("Model", &report);

    let baseline = PriceEstimationService::new(Arc::new(RuleOnlyModel), TrainedBounds::default());
    let rule_price =
        |d: f64, r: f64| baseline.get_estimated_price(d, r).ok().map(|e| e.estimated_price);
    print_report("Rule-only baseline", &evaluation::evaluate(rule_price, &cases));

    let comparison = evaluation::compare_models(rule_price, price, &cases);
    println!(
        "\nModel vs rules: {} improved, {} regressed, {} unchanged",
        comparison.improvements, comparison.regressions, comparison.unchanged
    );
    for detail in comparison.details.iter().take(5) {
        println!(
            "  {:.1}km / {:.0}: reference {} rules {} model {} (+{})",
            detail.distance,
            detail.base_rate,
            detail.reference_price,
            detail.old_prediction,
            detail.new_prediction,
            detail.regression
        );
    }

    let passed = checks.iter().filter(|c| c.passed).count();
    info!("{}/{} business rules passed", passed, checks.len());
    if passed != checks.len() {
        bail!("{} business rule check(s) failed", checks.len() - passed);
    }
    Ok(())
}

fn print_report(label: &str, report: &EvaluationReport) {
    println!(
        "\n{} on {} cases: MAE={:.1} RMSE={:.1} MAPE={:.2}% within 30%={:.1}%",
        label,
        report.samples,
        report.mae,
        report.rmse,
        report.mape,
        report.within_tolerance * 100.0
    );
}

fn quote(service: &PriceEstimationService, distance: f64, base_rate: f64) -> Option<i64> {
    service
        .get_estimated_price(distance, base_rate)
        .ok()
        .map(|e| e.estimated_price)
}

fn run_checks(service: &PriceEstimationService) -> Vec<Check> {
    let mut checks = Vec::new();

    let travel_points = [(10.0, 80.0), (25.0, 200.0), (26.0, 204.0), (50.0, 300.0), (100.0, 500.0)];
    let wrong: Vec<String> = travel_points
        .iter()
        .filter(|(d, cost)| travel_cost(*d) != *cost)
        .map(|(d, cost)| format!("cost({})={} expected {}", d, travel_cost(*d), cost))
        .collect();
    checks.push(Check::new("travel cost", wrong.is_empty(), wrong.join("; ")));

    // before anything else touches (50, 1000)
    let before = service.cache_len();
    for _ in 0..100 {
        quote(service, 50.0, 1000.0);
    }
    let grown = service.cache_len() - before;
    checks.push(Check::new(
        "cache growth",
        grown == 1,
        format!("{} new entries for 100 identical quotes", grown),
    ));

    let mut below_floor = Vec::new();
    for distance in [0.1, 5.0, 25.0, 60.0, 120.0, 160.0] {
        for base_rate in [200.0, 500.0, 2000.0, 8000.0] {
            match quote(service, distance, base_rate) {
                Some(price) if price as f64 >= base_rate => {}
                other => below_floor.push(format!("({}, {}) -> {:?}", distance, base_rate, other)),
            }
        }
    }
    checks.push(Check::new("price floor", below_floor.is_empty(), below_floor.join("; ")));

    let prices: Vec<Option<i64>> = (1..=30).map(|i| quote(service, i as f64 * 5.0, 1000.0)).collect();
    let monotone = prices.iter().all(Option::is_some) && prices.windows(2).all(|w| w[0] <= w[1]);
    checks.push(Check::new("monotonic in distance", monotone, ""));

    let runs: Vec<Option<i64>> = (0..5).map(|_| quote(service, 50.0, 1500.0)).collect();
    let deterministic = runs[0].is_some() && runs.iter().all(|p| *p == runs[0]);
    checks.push(Check::new(
        "determinism",
        deterministic,
        format!("{:?}", runs[0]),
    ));

    for (distance, base_rate, limit) in [(100.0, 400.0, 1000), (120.0, 300.0, 900), (80.0, 600.0, 1100)] {
        let price = quote(service, distance, base_rate);
        checks.push(Check::new(
            "long-distance budget",
            price.is_some_and(|p| p <= limit),
            format!("({}, {}) -> {:?}, limit {}", distance, base_rate, price, limit),
        ));
    }

    let markup = |base_rate: f64| {
        quote(service, 50.0, base_rate)
            .map(|p| p as f64 / (base_rate + travel_cost(50.0)) - 1.0)
    };
    let (premium, budget) = (markup(5000.0), markup(500.0));
    checks.push(Check::new(
        "premium margin ordering",
        matches!((premium, budget), (Some(p), Some(b)) if p > b),
        format!("premium {:?} vs budget {:?}", premium, budget),
    ));

    let far = service.get_estimated_price(150.0, 500.0).ok().map(|e| e.confidence);
    let typical = service.get_estimated_price(50.0, 1500.0).ok().map(|e| e.confidence);
    checks.push(Check::new(
        "confidence tiers",
        far == Some(Confidence::Medium) && typical == Some(Confidence::High),
        format!("(150, 500) {:?}, (50, 1500) {:?}", far, typical),
    ));

    let negative = service.validate_inputs(-5.0, 1000.0);
    let tiny = service.validate_inputs(0.05, 1000.0);
    checks.push(Check::new(
        "validation gate",
        !negative.valid
            && tiny.valid
            && tiny.details.distance_warning == Some(RangeWarning::BelowMinimum),
        "",
    ));

    checks
}
