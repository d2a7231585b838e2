#![allow(dead_code)]

use chrono::NaiveDate;
use duotrader::domain::error::DuotraderError;
use duotrader::domain::listing::{Listing, ListingEntry};
use duotrader::domain::params::{BacktestParams, Market};
use duotrader::domain::series::{DatedValue, IndexSeries, PricePoint, PriceSeries};
use duotrader::ports::data_port::DataPort;
use std::collections::{BTreeMap, HashMap};

pub struct MockDataPort {
    pub prices: HashMap<(String, Market), PriceSeries>,
    pub listings: HashMap<Market, Listing>,
    pub indices: HashMap<Market, IndexSeries>,
    pub exchange_rate: Option<IndexSeries>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            prices: HashMap::new(),
            listings: HashMap::new(),
            indices: HashMap::new(),
            exchange_rate: None,
            errors: HashMap::new(),
        }
    }

    pub fn with_series(mut self, market: Market, series: PriceSeries) -> Self {
        self.prices.insert((series.code.clone(), market), series);
        self
    }

    pub fn with_listing(mut self, market: Market, listing: Listing) -> Self {
        self.listings.insert(market, listing);
        self
    }

    pub fn with_index(mut self, market: Market, index: IndexSeries) -> Self {
        self.indices.insert(market, index);
        self
    }

    pub fn with_exchange_rate(mut self, fx: IndexSeries) -> Self {
        self.exchange_rate = Some(fx);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_prices(
        &self,
        code: &str,
        market: Market,
        _start_date: NaiveDate,
        _end_date: NaiveDate,
    ) -> Result<PriceSeries, DuotraderError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(DuotraderError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .prices
            .get(&(code.to_string(), market))
            .cloned()
            .unwrap_or_else(|| PriceSeries::new(code.to_string(), Vec::new())))
    }

    fn fetch_listing(&self, market: Market) -> Result<Listing, DuotraderError> {
        Ok(self.listings.get(&market).cloned().unwrap_or_default())
    }

    fn fetch_index(
        &self,
        market: Market,
        _start_date: NaiveDate,
        _end_date: NaiveDate,
    ) -> Result<IndexSeries, DuotraderError> {
        Ok(self
            .indices
            .get(&market)
            .cloned()
            .unwrap_or_else(|| IndexSeries::new(Vec::new())))
    }

    fn fetch_exchange_rate(
        &self,
        _start_date: NaiveDate,
        _end_date: NaiveDate,
    ) -> Result<IndexSeries, DuotraderError> {
        Ok(self
            .exchange_rate
            .clone()
            .unwrap_or_else(|| IndexSeries::new(Vec::new())))
    }

    fn list_codes(&self, market: Market) -> Result<Vec<String>, DuotraderError> {
        let mut codes: Vec<String> = self
            .prices
            .keys()
            .filter(|(_, m)| *m == market)
            .map(|(code, _)| code.clone())
            .collect();
        codes.sort();
        Ok(codes)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Daily closes starting 2024-01-01.
pub fn make_series(code: &str, closes: &[f64]) -> PriceSeries {
    let points = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PricePoint {
            date: date(2024, 1, 1) + chrono::Duration::days(i as i64),
            close,
        })
        .collect();
    PriceSeries::new(code.to_string(), points)
}

pub fn price_map(entries: Vec<PriceSeries>) -> BTreeMap<String, PriceSeries> {
    entries.into_iter().map(|s| (s.code.clone(), s)).collect()
}

pub fn make_listing(entries: &[(&str, &str, f64)]) -> Listing {
    Listing::new(
        entries
            .iter()
            .map(|(code, name, market_cap)| ListingEntry {
                code: code.to_string(),
                name: name.to_string(),
                market_cap: *market_cap,
            })
            .collect(),
    )
}

pub fn flat_fx(value: f64) -> IndexSeries {
    IndexSeries::new(vec![DatedValue {
        date: date(2024, 1, 1),
        value,
    }])
}

pub fn sample_params() -> BacktestParams {
    BacktestParams::new(
        10_000_000.0,
        date(2024, 1, 1),
        date(2024, 12, 31),
        5_000_000.0,
        1_000_000.0,
    )
}
