//! Cost, revenue and profit arithmetic for sale lines, sales and groups of sales.
//!
//! Amounts are `Decimal`s rounded half away from zero to two places wherever a
//! figure is reported. Group totals add the unrounded components of each sale and
//! round once at the end.

use std::ops::AddAssign;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::domain::sale::SaleLine;

pub const KG_PER_TON: Decimal = Decimal::ONE_THOUSAND;

/// Largest magnitude a form field may carry. Anything beyond falls back to the default.
pub const MAX_FORM_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Lenient numeric parse for form fields: blank or unparseable text yields `default`.
pub fn parse_with_default(text: &str, default: Decimal) -> Decimal {
    parse_decimal(text).unwrap_or(default)
}

/// Integer form fields accept decimal text and truncate toward zero (`"2.7"` is 2).
pub fn parse_count_with_default(text: &str, default: i64) -> i64 {
    parse_decimal(text).and_then(|value| value.trunc().to_i64()).unwrap_or(default)
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
        .filter(|value| value.abs() <= MAX_FORM_AMOUNT)
}

/// Only `ton` converts; any other unit tag, including blank, is already kilograms.
pub fn to_kg(quantity: Decimal, unit: &str) -> Decimal {
    if unit.trim().eq_ignore_ascii_case("ton") {
        quantity.saturating_mul(KG_PER_TON)
    } else {
        quantity
    }
}

pub fn line_cost(line: &SaleLine) -> Decimal {
    line.cost_rate().saturating_mul(line.quantity())
}

pub fn line_revenue(line: &SaleLine) -> Decimal {
    line.selling_rate().saturating_mul(line.quantity())
}

/// Physical kilograms moved by a line.
pub fn actual_kg(line: &SaleLine) -> Decimal {
    match line {
        SaleLine::Bill(bill) => bill.quantity_kg,
        SaleLine::Cash(cash) => match &cash.bottle {
            Some(pack) => pack
                .quantity_ltr
                .saturating_mul(Decimal::from(pack.bottles_in_batch))
                .saturating_mul(Decimal::from(cash.batches)),
            None => Decimal::ZERO,
        },
    }
}

/// Unrounded sums for one sale or a group of sales. `cost` includes freight.
///
/// Sums saturate at the `Decimal` bounds so stored figures can always be rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SaleTotals {
    pub quantity: Decimal,
    pub actual_kg: Decimal,
    pub revenue: Decimal,
    pub cost: Decimal,
    pub freight: Decimal,
    pub sales: usize,
}

impl SaleTotals {
    pub fn of(lines: &[SaleLine], freight: Decimal) -> Self {
        let mut totals = Self { freight, cost: freight, sales: 1, ..Self::default() };
        for line in lines {
            totals.quantity = totals.quantity.saturating_add(line.quantity());
            totals.actual_kg = totals.actual_kg.saturating_add(actual_kg(line));
            totals.revenue = totals.revenue.saturating_add(line_revenue(line));
            totals.cost = totals.cost.saturating_add(line_cost(line));
        }
        totals
    }

    pub fn valuation(&self) -> Valuation {
        let sp = round_money(self.revenue);
        let cp = round_money(self.cost);
        Valuation {
            quantity: round_money(self.quantity),
            actual_kg: round_money(self.actual_kg),
            sp,
            cp,
            freight: round_money(self.freight),
            pl: round_money(sp.saturating_sub(cp)),
        }
    }
}

impl AddAssign for SaleTotals {
    fn add_assign(&mut self, other: Self) {
        self.quantity = self.quantity.saturating_add(other.quantity);
        self.actual_kg = self.actual_kg.saturating_add(other.actual_kg);
        self.revenue = self.revenue.saturating_add(other.revenue);
        self.cost = self.cost.saturating_add(other.cost);
        self.freight = self.freight.saturating_add(other.freight);
        self.sales += other.sales;
    }
}

/// Reported figures, each rounded to two places.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Valuation {
    pub quantity: Decimal,
    pub actual_kg: Decimal,
    pub sp: Decimal,
    pub cp: Decimal,
    pub freight: Decimal,
    pub pl: Decimal,
}
