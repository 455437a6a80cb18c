//! Rollups over sales: per sale, per calendar month, per client name, and the dashboard feed.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::sale::{Sale, SaleId, SaleType};
use crate::valuation::{line_cost, line_revenue, round_money, SaleTotals, Valuation};

pub const DASHBOARD_LATEST_SALES: usize = 10;
pub const DASHBOARD_MONTHS: usize = 6;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SaleSummary {
    pub id: SaleId,
    pub date: NaiveDate,
    pub client_name: String,
    pub sale_type: SaleType,
    pub lines: usize,
    #[serde(flatten)]
    pub valuation: Valuation,
}

impl SaleSummary {
    pub fn of(sale: &Sale) -> Self {
        Self {
            id: sale.id,
            date: sale.date,
            client_name: sale.client_name.clone(),
            sale_type: sale.sale_type,
            lines: sale.lines.len(),
            valuation: sale.valuation(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PeriodRollup {
    /// `YYYY-MM`
    pub period: String,
    pub sales: usize,
    #[serde(flatten)]
    pub valuation: Valuation,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClientRollup {
    pub client_name: String,
    pub sales: usize,
    #[serde(flatten)]
    pub valuation: Valuation,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClientReport {
    pub rows: Vec<ClientRollup>,
    pub totals: Valuation,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub latest: Vec<SaleSummary>,
    pub totals: Valuation,
    pub monthly: Vec<PeriodRollup>,
    pub current_month: PeriodRollup,
}

fn period_key(year: i32, month: u32) -> String {
    format!("{year:04}-{month:02}")
}

/// Sales that own at least one line; itemless sales contribute nothing to group figures.
fn itemised(sales: &[Sale]) -> impl Iterator<Item = &Sale> {
    sales.iter().filter(|sale| !sale.lines.is_empty())
}

pub fn overall_totals(sales: &[Sale]) -> Valuation {
    let mut totals = SaleTotals::default();
    for sale in itemised(sales) {
        totals += sale.totals();
    }
    totals.valuation()
}

/// Calendar-month rollups, most recent month first.
pub fn monthly_rollups(sales: &[Sale]) -> Vec<PeriodRollup> {
    let mut months: BTreeMap<(i32, u32), SaleTotals> = BTreeMap::new();
    for sale in itemised(sales) {
        *months.entry(sale.month()).or_default() += sale.totals();
    }

    months
        .into_iter()
        .rev()
        .map(|((year, month), totals)| PeriodRollup {
            period: period_key(year, month),
            sales: totals.sales,
            valuation: totals.valuation(),
        })
        .collect()
}

pub fn current_month(sales: &[Sale], today: NaiveDate) -> PeriodRollup {
    let key = (today.year(), today.month());
    let mut totals = SaleTotals::default();
    for sale in itemised(sales).filter(|sale| sale.month() == key) {
        totals += sale.totals();
    }

    PeriodRollup {
        period: period_key(key.0, key.1),
        sales: totals.sales,
        valuation: totals.valuation(),
    }
}

/// Rollups keyed by the client name stored on each sale, highest SP first.
///
/// SP is rounded once over the group's line revenue, while CP and P/L add up each
/// sale's already rounded figures.
pub fn client_rollups(sales: &[Sale]) -> Vec<ClientRollup> {
    #[derive(Default)]
    struct ClientSums {
        totals: SaleTotals,
        cp: Decimal,
        pl: Decimal,
    }

    let mut clients: HashMap<&str, ClientSums> = HashMap::new();
    for sale in itemised(sales) {
        let valuation = sale.valuation();
        let sums = clients.entry(sale.client_name.as_str()).or_default();
        sums.totals += sale.totals();
        sums.cp = sums.cp.saturating_add(valuation.cp);
        sums.pl = sums.pl.saturating_add(valuation.pl);
    }

    let mut rows: Vec<ClientRollup> = clients
        .into_iter()
        .map(|(name, sums)| ClientRollup {
            client_name: name.to_string(),
            sales: sums.totals.sales,
            valuation: Valuation {
                cp: round_money(sums.cp),
                pl: round_money(sums.pl),
                ..sums.totals.valuation()
            },
        })
        .collect();
    rows.sort_by(|a, b| {
        b.valuation.sp.cmp(&a.valuation.sp).then_with(|| a.client_name.cmp(&b.client_name))
    });
    rows
}

/// Client rollups plus a totals row summed from the rounded rows.
pub fn client_report(sales: &[Sale]) -> ClientReport {
    let rows = client_rollups(sales);
    let mut totals = Valuation::default();
    for row in &rows {
        totals.quantity = totals.quantity.saturating_add(row.valuation.quantity);
        totals.actual_kg = totals.actual_kg.saturating_add(row.valuation.actual_kg);
        totals.sp = totals.sp.saturating_add(row.valuation.sp);
        totals.cp = totals.cp.saturating_add(row.valuation.cp);
        totals.freight = totals.freight.saturating_add(row.valuation.freight);
        totals.pl = totals.pl.saturating_add(row.valuation.pl);
    }
    totals.quantity = round_money(totals.quantity);
    totals.actual_kg = round_money(totals.actual_kg);
    totals.sp = round_money(totals.sp);
    totals.cp = round_money(totals.cp);
    totals.freight = round_money(totals.freight);
    totals.pl = round_money(totals.pl);

    ClientReport { rows, totals }
}

/// Most recent sales first: date descending, then id descending.
pub fn latest_sales(sales: &[Sale], limit: usize) -> Vec<SaleSummary> {
    let mut ordered: Vec<&Sale> = sales.iter().collect();
    ordered.sort_by_key(|sale| Reverse((sale.date, sale.id)));
    ordered.into_iter().take(limit).map(SaleSummary::of).collect()
}

pub fn dashboard(sales: &[Sale], today: NaiveDate) -> Dashboard {
    let mut monthly = monthly_rollups(sales);
    monthly.truncate(DASHBOARD_MONTHS);

    Dashboard {
        latest: latest_sales(sales, DASHBOARD_LATEST_SALES),
        totals: overall_totals(sales),
        monthly,
        current_month: current_month(sales, today),
    }
}

pub const EXPORT_HEADER: [&str; 9] = [
    "Date",
    "Client Name",
    "Quantity(kg)",
    "Cost Rate/kg",
    "Selling Rate/kg",
    "Freight",
    "SP Total",
    "CP(auto)",
    "P/L(auto)",
];

/// One CSV row per sale line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportRow {
    pub date: NaiveDate,
    pub client_name: String,
    pub quantity: Decimal,
    pub cost_rate: Decimal,
    pub selling_rate: Decimal,
    pub freight: Decimal,
    pub sp_total: Decimal,
    pub cp: Decimal,
    pub pl: Decimal,
}

impl ExportRow {
    pub fn to_record(&self) -> [String; 9] {
        [
            self.date.format("%Y-%m-%d").to_string(),
            self.client_name.clone(),
            self.quantity.to_string(),
            self.cost_rate.to_string(),
            self.selling_rate.to_string(),
            self.freight.to_string(),
            self.sp_total.to_string(),
            self.cp.to_string(),
            self.pl.to_string(),
        ]
    }
}

/// Export rows ordered by sale date then sale id, lines in stored order.
pub fn export_rows(sales: &[Sale]) -> Vec<ExportRow> {
    let mut ordered: Vec<&Sale> = sales.iter().collect();
    ordered.sort_by_key(|sale| (sale.date, sale.id));

    let mut rows = Vec::new();
    for sale in ordered {
        for line in &sale.lines {
            let sp_total = round_money(line_revenue(line));
            let cp = round_money(line_cost(line));
            rows.push(ExportRow {
                date: sale.date,
                client_name: sale.client_name.clone(),
                quantity: round_money(line.quantity()),
                cost_rate: round_money(line.cost_rate()),
                selling_rate: round_money(line.selling_rate()),
                freight: round_money(sale.freight),
                sp_total,
                cp,
                pl: round_money(sp_total.saturating_sub(cp)),
            });
        }
    }
    rows
}
