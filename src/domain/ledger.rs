//! One market's portfolio ledger: cash, holdings, trades, daily snapshots.
//!
//! `buy` and `sell_all` report failure as `false` and leave the ledger
//! untouched; the day loop treats a failed order as a no-op and continues.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

use crate::domain::params::Market;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
}

/// Immutable record of one executed order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub date: NaiveDate,
    pub code: String,
    pub name: String,
    pub side: Side,
    pub price: f64,
    pub quantity: i64,
    pub amount: f64,
    pub fee: f64,
    /// Realized profit; zero for buys, signed for sells.
    pub profit: f64,
    /// Set by the dual-market composer only.
    pub market: Option<Market>,
}

/// Open position in one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub code: String,
    pub name: String,
    pub quantity: i64,
    /// Volume-weighted average cost basis.
    pub avg_price: f64,
}

/// End-of-day valuation record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySnapshot {
    pub date: NaiveDate,
    pub cash: f64,
    pub stock_value: f64,
    pub total_value: f64,
}

#[derive(Debug, Clone)]
pub struct Ledger {
    pub cash: f64,
    /// Fee rate in percent (0.015 means 0.015%).
    pub fee_rate: f64,
    pub holdings: HashMap<String, Holding>,
    pub trades: Vec<Trade>,
    pub snapshots: Vec<DailySnapshot>,
}

impl Ledger {
    pub fn new(cash: f64, fee_rate: f64) -> Self {
        Self {
            cash,
            fee_rate,
            holdings: HashMap::new(),
            trades: Vec::new(),
            snapshots: Vec::new(),
        }
    }

    pub fn holds(&self, code: &str) -> bool {
        self.holdings.contains_key(code)
    }

    fn fee_for(&self, amount: f64) -> f64 {
        amount * (self.fee_rate / 100.0)
    }

    /// Buys as many whole shares as `max_amount` and the cash floor allow.
    ///
    /// Quantity sizing runs twice: first from the spendable amount alone,
    /// then reduced if the fee would push total cost past the floor. Returns
    /// false without touching state when no positive quantity fits.
    pub fn buy(
        &mut self,
        date: NaiveDate,
        code: &str,
        name: &str,
        price: f64,
        max_amount: f64,
        min_balance: f64,
    ) -> bool {
        if price <= 0.0 {
            return false;
        }

        let available = self.cash - min_balance;
        if available <= 0.0 {
            return false;
        }

        let buy_amount = max_amount.min(available);
        let mut quantity = (buy_amount / price).floor() as i64;
        if quantity <= 0 {
            return false;
        }

        let mut amount = quantity as f64 * price;
        let mut fee = self.fee_for(amount);
        let mut total_cost = amount + fee;

        if total_cost > available {
            quantity = ((available - fee) / price).floor() as i64;
            if quantity <= 0 {
                return false;
            }
            amount = quantity as f64 * price;
            fee = self.fee_for(amount);
            total_cost = amount + fee;
        }

        if total_cost > self.cash {
            return false;
        }

        self.cash -= total_cost;

        if let Some(h) = self.holdings.get_mut(code) {
            let total_qty = h.quantity + quantity;
            h.avg_price = (h.avg_price * h.quantity as f64 + amount) / total_qty as f64;
            h.quantity = total_qty;
        } else {
            self.holdings.insert(
                code.to_string(),
                Holding {
                    code: code.to_string(),
                    name: name.to_string(),
                    quantity,
                    avg_price: price,
                },
            );
        }

        self.trades.push(Trade {
            date,
            code: code.to_string(),
            name: name.to_string(),
            side: Side::Buy,
            price,
            quantity,
            amount,
            fee,
            profit: 0.0,
            market: None,
        });
        true
    }

    /// Liquidates the full position in `code`. Partial sells are not modeled.
    pub fn sell_all(&mut self, date: NaiveDate, code: &str, name: &str, price: f64) -> bool {
        let Some(holding) = self.holdings.remove(code) else {
            return false;
        };

        let quantity = holding.quantity;
        let amount = quantity as f64 * price;
        let fee = self.fee_for(amount);
        let net_amount = amount - fee;
        let profit = net_amount - holding.avg_price * quantity as f64;

        self.cash += net_amount;

        self.trades.push(Trade {
            date,
            code: code.to_string(),
            name: name.to_string(),
            side: Side::Sell,
            price,
            quantity,
            amount,
            fee,
            profit,
            market: None,
        });
        true
    }

    /// Records the end-of-day valuation. Holdings without a quote today are
    /// valued at their average cost basis.
    pub fn snapshot(&mut self, date: NaiveDate, prices: &HashMap<String, f64>) -> DailySnapshot {
        let stock_value: f64 = self
            .holdings
            .values()
            .map(|h| h.quantity as f64 * prices.get(&h.code).copied().unwrap_or(h.avg_price))
            .sum();
        let snap = DailySnapshot {
            date,
            cash: self.cash,
            stock_value,
            total_value: self.cash + stock_value,
        };
        self.snapshots.push(snap.clone());
        snap
    }
}
