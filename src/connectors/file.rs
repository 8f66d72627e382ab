// src/connectors/file.rs
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::connectors::messages::{ChainFileRecord, PriceBarRecord};
use crate::connectors::traits::MarketDataSource;
use crate::market::QuoteChain;
use crate::types::PricePoint;

/// Replays a price-history dump and an option-chain dump from disk. Both files
/// are read once, at construction. `fallback_rate` prices Greeks for quotes
/// that ship only an IV when the chain file names no rate.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    history: Vec<PricePoint>,
    chains: Vec<QuoteChain>,
}

impl JsonFileSource {
    pub fn open(
        history_path: impl AsRef<Path>,
        chain_path: impl AsRef<Path>,
        fallback_rate: f64,
    ) -> Result<Self> {
        let history_path = history_path.as_ref();
        let chain_path = chain_path.as_ref();

        let raw = fs::read_to_string(history_path)
            .with_context(|| format!("reading price history {}", history_path.display()))?;
        let bars: Vec<PriceBarRecord> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing price history {}", history_path.display()))?;

        let raw = fs::read_to_string(chain_path)
            .with_context(|| format!("reading option chain {}", chain_path.display()))?;
        let record: ChainFileRecord = serde_json::from_str(&raw)
            .with_context(|| format!("parsing option chain {}", chain_path.display()))?;

        let source = Self::from_records(bars, record, fallback_rate)?;
        info!(
            bars = source.history.len(),
            expiries = source.chains.len(),
            "loaded market data from files"
        );
        Ok(source)
    }

    pub fn from_records(
        bars: Vec<PriceBarRecord>,
        record: ChainFileRecord,
        fallback_rate: f64,
    ) -> Result<Self> {
        let rate = record.rate.unwrap_or(fallback_rate);
        if !rate.is_finite() || rate < 0.0 {
            bail!("chain rate must be >= 0, got {rate}");
        }
        let mut history: Vec<PricePoint> = bars.into_iter().map(PricePoint::from).collect();
        history.sort_by_key(|p| p.timestamp);

        let mut chains = Vec::with_capacity(record.expiries.len());
        for expiry in record.expiries {
            let days = expiry.days_to_expiry;
            let quotes = expiry
                .quotes
                .into_iter()
                .map(|q| q.into_quote(days, record.spot, rate))
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("converting {days} DTE quotes"))?;
            let chain = QuoteChain::new(record.underlying.clone(), record.spot, record.as_of, days, quotes)
                .with_context(|| format!("building {days} DTE chain"))?;
            chains.push(chain);
        }
        chains.sort_by_key(|c| c.days_to_expiry);
        if chains.windows(2).any(|w| w[0].days_to_expiry == w[1].days_to_expiry) {
            bail!("chain file lists the same expiry twice");
        }

        Ok(Self { history, chains })
    }
}

impl MarketDataSource for JsonFileSource {
    fn price_history(&self) -> Result<Vec<PricePoint>> {
        Ok(self.history.clone())
    }

    fn expiries(&self) -> Result<Vec<u32>> {
        Ok(self.chains.iter().map(|c| c.days_to_expiry).collect())
    }

    fn quote_chain(&self, days_to_expiry: u32) -> Result<QuoteChain> {
        self.chains
            .iter()
            .find(|c| c.days_to_expiry == days_to_expiry)
            .cloned()
            .with_context(|| format!("no {days_to_expiry} DTE expiry in the chain file"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::price_and_sensitivities;
    use crate::types::OptionKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HISTORY: &str = r#"[
        {"timestamp": "2026-03-03T21:00:00Z", "close": 582.0},
        {"timestamp": "2026-03-02T21:00:00Z", "close": 580.0, "high": 581.5, "low": 578.0}
    ]"#;

    const CHAIN: &str = r#"{
        "underlying": "SPY",
        "spot": 580.0,
        "as_of": "2026-03-03T21:00:00Z",
        "rate": 0.04,
        "expiries": [
            {"days_to_expiry": 45, "quotes": [
                {"strike": 600, "kind": "call", "bid": 3.1, "ask": 3.3, "iv": 0.17}
            ]},
            {"days_to_expiry": 30, "quotes": [
                {"strike": 600, "kind": "call", "bid": 2.0, "ask": 2.2, "iv": 0.17},
                {"strike": 560, "kind": "put", "bid": 2.4, "ask": 2.6, "iv": 0.21}
            ]}
        ]
    }"#;

    fn write(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_history_and_chains() {
        let history = write(HISTORY);
        let chain = write(CHAIN);
        let source = JsonFileSource::open(history.path(), chain.path(), 0.045).unwrap();

        let bars = source.price_history().unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 580.0);
        assert_eq!(source.expiries().unwrap(), vec![30, 45]);

        let near = source.quote_chain(30).unwrap();
        assert_eq!(near.quotes().len(), 2);
        assert_eq!(near.underlying, "SPY");
        assert!(source.quote_chain(7).is_err());
    }

    #[test]
    fn malformed_file_reports_path() {
        let history = write("not json");
        let chain = write(CHAIN);
        let err = JsonFileSource::open(history.path(), chain.path(), 0.045).unwrap_err();
        assert!(err.to_string().contains("parsing price history"));
    }

    #[test]
    fn chain_without_rate_uses_fallback() {
        let history = write(HISTORY);
        let chain = write(&CHAIN.replace(r#""rate": 0.04,"#, ""));
        let source = JsonFileSource::open(history.path(), chain.path(), 0.05).unwrap();

        let call = source.quote_chain(30).unwrap().quote(600.0, OptionKind::Call).cloned().unwrap();
        let at_fallback =
            price_and_sensitivities(580.0, 600.0, 30, 0.17, 0.05, OptionKind::Call).unwrap();
        let at_zero = price_and_sensitivities(580.0, 600.0, 30, 0.17, 0.0, OptionKind::Call).unwrap();
        assert!((call.greeks.rho - at_fallback.greeks.rho).abs() < 1e-12);
        assert!((call.greeks.delta - at_fallback.greeks.delta).abs() < 1e-12);
        assert!((call.greeks.delta - at_zero.greeks.delta).abs() > 1e-6);
    }

    #[test]
    fn chain_rate_beats_fallback() {
        let history = write(HISTORY);
        let chain = write(CHAIN);
        let source = JsonFileSource::open(history.path(), chain.path(), 0.09).unwrap();

        let call = source.quote_chain(30).unwrap().quote(600.0, OptionKind::Call).cloned().unwrap();
        let at_file_rate =
            price_and_sensitivities(580.0, 600.0, 30, 0.17, 0.04, OptionKind::Call).unwrap();
        assert!((call.greeks.delta - at_file_rate.greeks.delta).abs() < 1e-12);
    }
}
