//! CSV file data adapter.
//!
//! Directory layout: `{CODE}_{MARKET}.csv` quote files (date,open,high,low,
//! close,volume; only close is consumed), `listing_{MARKET}.csv`
//! (code,name,market_cap), `index_{MARKET}.csv` and `usdkrw.csv`
//! (date,close).

use crate::domain::error::DuotraderError;
use crate::domain::listing::{Listing, ListingEntry};
use crate::domain::params::Market;
use crate::domain::series::{DatedValue, IndexSeries, PricePoint, PriceSeries};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn quote_path(&self, code: &str, market: Market) -> PathBuf {
        self.base_path
            .join(format!("{}_{}.csv", code, market.as_str()))
    }

    fn parse_error(reason: String) -> DuotraderError {
        DuotraderError::Data { reason }
    }

    fn read_dated_closes(
        path: &Path,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>, DuotraderError> {
        let content = fs::read_to_string(path).map_err(|e| {
            Self::parse_error(format!("failed to read {}: {}", path.display(), e))
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let close_column = rdr
            .headers()
            .map_err(|e| Self::parse_error(format!("CSV header error: {}", e)))?
            .iter()
            .position(|h| h == "close")
            .ok_or_else(|| Self::parse_error("missing close column".into()))?;

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record =
                result.map_err(|e| Self::parse_error(format!("CSV parse error: {}", e)))?;

            let date_str = record
                .get(0)
                .ok_or_else(|| Self::parse_error("missing date column".into()))?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
                .map_err(|e| Self::parse_error(format!("invalid date format: {}", e)))?;

            if date < start_date || date > end_date {
                continue;
            }

            let close: f64 = record
                .get(close_column)
                .ok_or_else(|| Self::parse_error("missing close value".into()))?
                .parse()
                .map_err(|e| Self::parse_error(format!("invalid close value: {}", e)))?;

            rows.push((date, close));
        }
        rows.sort_by_key(|(date, _)| *date);
        Ok(rows)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_prices(
        &self,
        code: &str,
        market: Market,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, DuotraderError> {
        let rows =
            Self::read_dated_closes(&self.quote_path(code, market), start_date, end_date)?;
        let points = rows
            .into_iter()
            .map(|(date, close)| PricePoint { date, close })
            .collect();
        Ok(PriceSeries::new(code.to_string(), points))
    }

    fn fetch_listing(&self, market: Market) -> Result<Listing, DuotraderError> {
        let path = self
            .base_path
            .join(format!("listing_{}.csv", market.as_str()));
        let content = fs::read_to_string(&path).map_err(|e| {
            Self::parse_error(format!("failed to read {}: {}", path.display(), e))
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut entries = Vec::new();
        for result in rdr.records() {
            let record =
                result.map_err(|e| Self::parse_error(format!("CSV parse error: {}", e)))?;

            let code = record
                .get(0)
                .ok_or_else(|| Self::parse_error("missing code column".into()))?;
            let name = record
                .get(1)
                .ok_or_else(|| Self::parse_error("missing name column".into()))?;
            let market_cap: f64 = record
                .get(2)
                .ok_or_else(|| Self::parse_error("missing market_cap column".into()))?
                .parse()
                .map_err(|e| Self::parse_error(format!("invalid market_cap value: {}", e)))?;

            entries.push(ListingEntry {
                code: code.to_string(),
                name: name.to_string(),
                market_cap,
            });
        }
        Ok(Listing::new(entries))
    }

    fn fetch_index(
        &self,
        market: Market,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<IndexSeries, DuotraderError> {
        let path = self
            .base_path
            .join(format!("index_{}.csv", market.as_str()));
        let rows = Self::read_dated_closes(&path, start_date, end_date)?;
        Ok(IndexSeries::new(
            rows.into_iter()
                .map(|(date, value)| DatedValue { date, value })
                .collect(),
        ))
    }

    fn fetch_exchange_rate(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<IndexSeries, DuotraderError> {
        let path = self.base_path.join("usdkrw.csv");
        let rows = Self::read_dated_closes(&path, start_date, end_date)?;
        Ok(IndexSeries::new(
            rows.into_iter()
                .map(|(date, value)| DatedValue { date, value })
                .collect(),
        ))
    }

    fn list_codes(&self, market: Market) -> Result<Vec<String>, DuotraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            Self::parse_error(format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let suffix = format!("_{}.csv", market.as_str());
        let mut codes = Vec::new();

        for entry in entries {
            let entry = entry
                .map_err(|e| Self::parse_error(format!("directory entry error: {}", e)))?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if name_str.ends_with(&suffix)
                && !name_str.starts_with("listing_")
                && !name_str.starts_with("index_")
            {
                let code = &name_str[..name_str.len() - suffix.len()];
                codes.push(code.to_string());
            }
        }

        codes.sort();
        Ok(codes)
    }
}
