// src/main.rs
use anyhow::{Context, Result};
use condor_desk::config::AppConfig;
use condor_desk::connectors::{JsonFileSource, MarketDataSource};
use condor_desk::core::{CondorDesk, DeskReport};
use condor_desk::strategies::{IronCondorStrategy, StrategyProfile};
use condor_desk::utils::logging::init_tracing;
use dotenvy::dotenv;
use tracing::{info, warn};

fn print_report(report: &DeskReport) {
    let ind = &report.assessment.indicators;
    let score = &report.assessment.score;
    println!("Spot:     {:.2}  ({} DTE chain, as of {})", report.spot, report.days_to_expiry, report.as_of);
    println!(
        "RSI {:.1} | BB pos {:+.2} width {:.2}% | MACD {:+.2}% | ATR {:.2}%",
        ind.oscillator,
        ind.band_position,
        ind.band_width * 100.0,
        ind.trend_strength,
        ind.atr_percent
    );
    println!(
        "Signal:   {}  (entry {}/9, risk {}/9)",
        score.signal, score.entry, score.risk
    );
    println!("----------------------------------------");
    for candidate in &report.candidates {
        print_candidate(candidate);
    }
    if report.candidates.is_empty() {
        println!("No viable condor on this chain.");
    }
    println!("----------------------------------------");
}

fn print_candidate(ic: &IronCondorStrategy) {
    let label = StrategyProfile::from_target(ic.target_delta)
        .map(|p| p.to_string())
        .unwrap_or_else(|| format!("DELTA {:.2}", ic.target_delta));
    let greeks = ic.net_greeks();
    println!(
        "{label:<13} {}/{}P  {}/{}C  credit ${}  max loss ${}  POP {:.0}%  theta/day {:+.3}",
        ic.long_put.strike(),
        ic.short_put.strike(),
        ic.short_call.strike(),
        ic.long_call.strike(),
        ic.max_profit(1),
        ic.max_loss(1).unwrap_or_default(),
        ic.probability_of_profit() * 100.0,
        greeks.per_day_theta()
    );
}

fn main() -> Result<()> {
    dotenv().ok();

    let config = AppConfig::new().context("loading configuration")?;
    let _log_guard = init_tracing(&config.logging)?;

    println!("========================================");
    println!("       CONDOR DESK - v0.1.0");
    println!("========================================");
    println!("Underlying: {}", config.market.underlying);
    println!("Mode:       📝 PAPER TRADING");
    println!("========================================");

    let mut desk = CondorDesk::from_config(&config).context("invalid configuration")?;
    let source = JsonFileSource::open(
        &config.feeds.history_path,
        &config.feeds.chain_path,
        config.market.rate,
    )?;

    let report = desk.refresh(&source, config.market.target_dte)?;
    print_report(&report);

    if report.assessment.entry_allowed() {
        let target = StrategyProfile::Balanced.target_delta();
        match desk.open_candidate(&report, target, config.market.contracts, None) {
            Ok(position) => {
                info!(id = position.id, "paper position opened");
                let chain = source.quote_chain(report.days_to_expiry)?;
                desk.mark_all(&chain);
            }
            Err(e) => warn!("Not opening a position: {}", e),
        }
    } else {
        info!(signal = %report.assessment.score.signal, "conditions not suitable for entry");
    }

    for (id, signals) in desk.review_exits(report.as_of) {
        for signal in signals {
            println!("Position #{id}: {signal}");
        }
    }

    let summary = desk.ledger().summary();
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("serializing account summary")?
    );
    Ok(())
}
