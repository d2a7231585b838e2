//! Date-indexed series types and the shared as-of lookup.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

/// One daily closing price of an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Per-instrument close-price series, strictly increasing by date.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    pub code: String,
    points: Vec<PricePoint>,
    date_index: HashMap<NaiveDate, usize>,
}

impl PriceSeries {
    /// Builds a series from (possibly unsorted) points. Points are sorted by
    /// date; later duplicates of the same date win.
    pub fn new(code: String, mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        let date_index = points
            .iter()
            .enumerate()
            .map(|(i, p)| (p.date, i))
            .collect();
        Self {
            code,
            points,
            date_index,
        }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Exact-date close, if the instrument traded that day.
    pub fn close_on(&self, date: NaiveDate) -> Option<f64> {
        self.date_index.get(&date).map(|&i| self.points[i].close)
    }

    /// Exact-date position in this instrument's own calendar.
    pub fn index_on(&self, date: NaiveDate) -> Option<usize> {
        self.date_index.get(&date).copied()
    }

    /// Forward-filled position: index of the latest observation at or before
    /// `date`. None when the series starts after `date` (or is empty).
    pub fn index_at_or_before(&self, date: NaiveDate) -> Option<usize> {
        let idx = self.points.partition_point(|p| p.date <= date);
        idx.checked_sub(1)
    }
}

/// One observation of a benchmark index or exchange-rate series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DatedValue {
    pub date: NaiveDate,
    pub value: f64,
}

/// Benchmark index or FX rate series, ordered by date. Read-only to the
/// core: benchmarks pass through results unchanged, FX rates are consumed
/// via as-of lookups.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexSeries {
    points: Vec<DatedValue>,
}

impl IndexSeries {
    pub fn new(mut points: Vec<DatedValue>) -> Self {
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        Self { points }
    }

    pub fn points(&self) -> &[DatedValue] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// As-of value: exact match, else latest before `date`, else the first
    /// available value. None only for an empty series.
    pub fn value_as_of(&self, date: NaiveDate) -> Option<f64> {
        at_or_before(&self.points, date, |p| p.date)
            .or_else(|| self.points.first())
            .map(|p| p.value)
    }
}

/// Latest element at or before `date` in a date-sorted slice. None when the
/// slice is empty or every element is dated after `date`.
pub fn at_or_before<T>(
    items: &[T],
    date: NaiveDate,
    date_of: impl Fn(&T) -> NaiveDate,
) -> Option<&T> {
    let idx = items.partition_point(|it| date_of(it) <= date);
    idx.checked_sub(1).map(|i| &items[i])
}
