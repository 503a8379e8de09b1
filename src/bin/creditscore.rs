//! creditscore – score a trading account's portfolio JSON from the command line
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use creditscore::utils::init_logging;
use creditscore::{CreditEngine, CreditRating, ModelParams, ScoreInput};

#[derive(Parser, Debug)]
#[command(
    name    = "creditscore",
    version = env!("CARGO_PKG_VERSION"),
    about   = "Compute a deterministic credit score and loan sizing from portfolio JSON"
)]
struct Args {
    /// Path to the portfolio JSON file (user + closed/current positions)
    input: PathBuf,

    /// Optional TOML file overriding the default model parameters
    #[arg(short, long)]
    params: Option<PathBuf>,

    /// Emit the full ScoreResult as JSON instead of the report
    #[arg(long)]
    json: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", env = "CREDITSCORE_LOG")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let content = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read input file {}", args.input.display()))?;
    let input = ScoreInput::from_json(&content)
        .with_context(|| format!("Failed to parse portfolio JSON {}", args.input.display()))?;

    let engine = match &args.params {
        | Some(path) => {
            let params = ModelParams::from_file(path)
                .with_context(|| format!("Failed to load params from {}", path.display()))?;
            CreditEngine::with_params(params)
        }
        | None => CreditEngine::new(),
    };

    let result = engine.score_checked(&input)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let rating = CreditRating::from_score(result.credit_score);
    println!("=== CREDIT SCORE REPORT ===");
    println!("User: {} ({})", result.user_name, result.user_id);
    println!("Base Score: {:.0} / 850", result.credit_score);
    println!("Rating: {} - {}", rating.label(), rating.description());
    println!("Probability of Default: {:.2}%", result.pd * 100.0);
    println!("LTV: {:.1}%", result.ltv * 100.0);
    println!("Max Loan: {:.2}", result.max_loan);
    println!();
    println!("Win Rate: {:.1}%", result.features.win_rate * 100.0);
    println!("Realized ROI: {:.1}%", result.features.roi_real * 100.0);
    println!("Open Drawdown: {:.1}%", result.features.dd_open * 100.0);
    println!("Concentration (HHI): {:.3}", result.features.hhi_open);
    println!("Dead Exposure Share: {:.1}%", result.features.dead_share * 100.0);
    println!("Effective Collateral: {:.2}", result.features.v_eff);
    println!("===========================");

    Ok(())
}
