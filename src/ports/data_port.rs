//! Data access port trait.
//!
//! The core never performs I/O; adapters materialize all series before a
//! run starts.

use crate::domain::error::DuotraderError;
use crate::domain::listing::Listing;
use crate::domain::params::Market;
use crate::domain::series::{IndexSeries, PriceSeries};
use chrono::NaiveDate;

pub trait DataPort {
    fn fetch_prices(
        &self,
        code: &str,
        market: Market,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, DuotraderError>;

    fn fetch_listing(&self, market: Market) -> Result<Listing, DuotraderError>;

    fn fetch_index(
        &self,
        market: Market,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<IndexSeries, DuotraderError>;

    /// KRW per USD rate series.
    fn fetch_exchange_rate(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<IndexSeries, DuotraderError>;

    fn list_codes(&self, market: Market) -> Result<Vec<String>, DuotraderError>;
}
