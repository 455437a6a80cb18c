use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::bottle::BottleTypeId;
use crate::errors::DomainError;
use crate::valuation::{SaleTotals, Valuation};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SaleId(pub i64);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleType {
    /// Free-form lines priced per kg.
    #[default]
    Bill,
    /// Catalog bottle batches priced per batch.
    Cash,
}

impl SaleType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bill => "bill",
            Self::Cash => "cash",
        }
    }

    /// Form input: `cash` (any case) selects cash mode, anything else is a bill.
    pub fn from_form(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("cash") {
            Self::Cash
        } else {
            Self::Bill
        }
    }
}

impl std::str::FromStr for SaleType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "bill" => Ok(Self::Bill),
            "cash" => Ok(Self::Cash),
            other => Err(DomainError::validation(format!("unknown sale type `{other}`"))),
        }
    }
}

/// Pack details of the bottle a cash line was sold from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BottlePack {
    pub label: String,
    pub quantity_ltr: Decimal,
    pub bottles_in_batch: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillLine {
    pub quantity_kg: Decimal,
    pub cost_per_kg: Decimal,
    pub sell_per_kg: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashLine {
    pub batches: i64,
    pub bottle_type_id: BottleTypeId,
    /// `None` when the referenced bottle type could not be loaded.
    pub bottle: Option<BottlePack>,
    pub cost_per_batch: Decimal,
    pub sell_per_batch: Decimal,
}

/// One sale item. Both variants share the stored `quantity`/rate columns; their units differ.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SaleLine {
    Bill(BillLine),
    Cash(CashLine),
}

impl SaleLine {
    /// Kilograms for bill lines, batch count for cash lines.
    pub fn quantity(&self) -> Decimal {
        match self {
            Self::Bill(line) => line.quantity_kg,
            Self::Cash(line) => Decimal::from(line.batches),
        }
    }

    pub fn cost_rate(&self) -> Decimal {
        match self {
            Self::Bill(line) => line.cost_per_kg,
            Self::Cash(line) => line.cost_per_batch,
        }
    }

    pub fn selling_rate(&self) -> Decimal {
        match self {
            Self::Bill(line) => line.sell_per_kg,
            Self::Cash(line) => line.sell_per_batch,
        }
    }

    pub fn bottle_type_id(&self) -> Option<BottleTypeId> {
        match self {
            Self::Bill(_) => None,
            Self::Cash(line) => Some(line.bottle_type_id),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub date: NaiveDate,
    /// Snapshot of the client name at entry time.
    pub client_name: String,
    pub freight: Decimal,
    /// Cached sum of line quantities.
    pub quantity: Decimal,
    pub sale_type: SaleType,
    pub lines: Vec<SaleLine>,
}

impl Sale {
    pub fn totals(&self) -> SaleTotals {
        SaleTotals::of(&self.lines, self.freight)
    }

    pub fn valuation(&self) -> Valuation {
        self.totals().valuation()
    }

    pub fn total_cp(&self) -> Decimal {
        self.valuation().cp
    }

    pub fn total_sp(&self) -> Decimal {
        self.valuation().sp
    }

    pub fn pl(&self) -> Decimal {
        self.valuation().pl
    }

    /// `(year, month)` of the sale date.
    pub fn month(&self) -> (i32, u32) {
        (self.date.year(), self.date.month())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaleDraft {
    pub date: NaiveDate,
    pub client_name: String,
    pub freight: Decimal,
    pub sale_type: SaleType,
    pub lines: Vec<SaleLine>,
}

impl SaleDraft {
    pub fn total_quantity(&self) -> Decimal {
        self.lines.iter().map(SaleLine::quantity).fold(Decimal::ZERO, Decimal::saturating_add)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{BillLine, CashLine, SaleLine, SaleType};
    use crate::domain::bottle::BottleTypeId;

    #[test]
    fn sale_type_form_input_is_lenient() {
        assert_eq!(SaleType::from_form(" CASH "), SaleType::Cash);
        assert_eq!(SaleType::from_form("bill"), SaleType::Bill);
        assert_eq!(SaleType::from_form(""), SaleType::Bill);
        assert_eq!(SaleType::from_form("barter"), SaleType::Bill);
    }

    #[test]
    fn stored_sale_type_is_strict() {
        assert!("cash".parse::<SaleType>().is_ok());
        assert!("Cash".parse::<SaleType>().is_err());
    }

    #[test]
    fn line_accessors_follow_the_variant_units() {
        let bill = SaleLine::Bill(BillLine {
            quantity_kg: Decimal::new(2500, 0),
            cost_per_kg: Decimal::new(42, 0),
            sell_per_kg: Decimal::new(55, 0),
        });
        let cash = SaleLine::Cash(CashLine {
            batches: 4,
            bottle_type_id: BottleTypeId(3),
            bottle: None,
            cost_per_batch: Decimal::new(180, 0),
            sell_per_batch: Decimal::new(170, 0),
        });

        assert_eq!(bill.quantity(), Decimal::new(2500, 0));
        assert_eq!(bill.bottle_type_id(), None);
        assert_eq!(cash.quantity(), Decimal::new(4, 0));
        assert_eq!(cash.cost_rate(), Decimal::new(180, 0));
        assert_eq!(cash.bottle_type_id(), Some(BottleTypeId(3)));
    }
}
