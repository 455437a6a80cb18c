use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::sale::BottlePack;
use crate::errors::DomainError;
use crate::valuation::{parse_count_with_default, parse_with_default, round_money};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BottleTypeId(pub i64);

/// A packaged product sold by the batch in cash sales.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BottleType {
    pub id: BottleTypeId,
    pub label: String,
    pub quantity_ltr: Decimal,
    pub bottles_in_batch: i64,
    pub can_price: Decimal,
    pub price_per_kg: Decimal,
    pub box_cost: Decimal,
    pub selling_price_per_batch: Decimal,
}

impl BottleType {
    /// `can_price * bottles + price_per_kg * litres * bottles + box_cost`, rounded to cents.
    pub fn cp_per_batch(&self) -> Decimal {
        let bottles = Decimal::from(self.bottles_in_batch);
        let cans = self.can_price.saturating_mul(bottles);
        let chemical = self.price_per_kg.saturating_mul(self.quantity_ltr).saturating_mul(bottles);
        round_money(cans.saturating_add(chemical).saturating_add(self.box_cost))
    }

    pub fn sp_per_batch(&self) -> Decimal {
        round_money(self.selling_price_per_batch)
    }

    pub fn kg_per_batch(&self) -> Decimal {
        self.quantity_ltr.saturating_mul(Decimal::from(self.bottles_in_batch))
    }

    pub fn pack(&self) -> BottlePack {
        BottlePack {
            label: self.label.clone(),
            quantity_ltr: self.quantity_ltr,
            bottles_in_batch: self.bottles_in_batch,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct BottleTypeForm {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub quantity_ltr: String,
    #[serde(default)]
    pub bottles_in_batch: String,
    #[serde(default)]
    pub can_price: String,
    #[serde(default)]
    pub price_per_kg: String,
    #[serde(default)]
    pub box_cost: String,
    #[serde(default)]
    pub selling_price_per_batch: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BottleTypeDraft {
    pub label: String,
    pub quantity_ltr: Decimal,
    pub bottles_in_batch: i64,
    pub can_price: Decimal,
    pub price_per_kg: Decimal,
    pub box_cost: Decimal,
    pub selling_price_per_batch: Decimal,
}

impl BottleTypeDraft {
    pub fn from_form(form: &BottleTypeForm) -> Result<Self, DomainError> {
        let label = form.label.trim();
        if label.is_empty() {
            return Err(DomainError::validation("Bottle label is required"));
        }

        Ok(Self {
            label: label.to_string(),
            quantity_ltr: parse_with_default(&form.quantity_ltr, Decimal::ZERO),
            bottles_in_batch: parse_count_with_default(&form.bottles_in_batch, 1),
            can_price: parse_with_default(&form.can_price, Decimal::ZERO),
            price_per_kg: parse_with_default(&form.price_per_kg, Decimal::ZERO),
            box_cost: parse_with_default(&form.box_cost, Decimal::ZERO),
            selling_price_per_batch: parse_with_default(
                &form.selling_price_per_batch,
                Decimal::ZERO,
            ),
        })
    }
}

/// Catalog installed by `seed-bottles`, upserted by label.
pub fn default_catalog() -> Vec<BottleTypeDraft> {
    vec![
        BottleTypeDraft {
            label: "1 ltr".to_string(),
            quantity_ltr: Decimal::new(10, 1),
            bottles_in_batch: 12,
            can_price: Decimal::new(425, 2),
            price_per_kg: Decimal::new(90, 1),
            box_cost: Decimal::new(21, 0),
            selling_price_per_batch: Decimal::new(170, 0),
        },
        BottleTypeDraft {
            label: "0.5 ltr".to_string(),
            quantity_ltr: Decimal::new(5, 1),
            bottles_in_batch: 24,
            can_price: Decimal::new(60, 1),
            price_per_kg: Decimal::new(90, 1),
            box_cost: Decimal::new(21, 0),
            selling_price_per_batch: Decimal::new(220, 0),
        },
        BottleTypeDraft {
            label: "5 ltr".to_string(),
            quantity_ltr: Decimal::new(50, 1),
            bottles_in_batch: 1,
            can_price: Decimal::new(150, 1),
            price_per_kg: Decimal::new(90, 1),
            box_cost: Decimal::ZERO,
            selling_price_per_batch: Decimal::new(80, 0),
        },
    ]
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{default_catalog, BottleType, BottleTypeDraft, BottleTypeForm, BottleTypeId};

    fn from_draft(draft: BottleTypeDraft) -> BottleType {
        BottleType {
            id: BottleTypeId(1),
            label: draft.label,
            quantity_ltr: draft.quantity_ltr,
            bottles_in_batch: draft.bottles_in_batch,
            can_price: draft.can_price,
            price_per_kg: draft.price_per_kg,
            box_cost: draft.box_cost,
            selling_price_per_batch: draft.selling_price_per_batch,
        }
    }

    #[test]
    fn one_litre_batch_cost_matches_formula() {
        let one_litre = from_draft(default_catalog().remove(0));

        // 4.25 * 12 + 9 * 1 * 12 + 21
        assert_eq!(one_litre.cp_per_batch(), Decimal::new(18000, 2));
        assert_eq!(one_litre.sp_per_batch(), Decimal::new(170, 0));
        assert_eq!(one_litre.kg_per_batch(), Decimal::new(12, 0));
    }

    #[test]
    fn half_litre_batch_cost_matches_formula() {
        let half_litre = from_draft(default_catalog().remove(1));

        // 6 * 24 + 9 * 0.5 * 24 + 21
        assert_eq!(half_litre.cp_per_batch(), Decimal::new(27300, 2));
    }

    #[test]
    fn selling_price_is_rounded_to_cents() {
        let mut bottle = from_draft(default_catalog().remove(2));
        bottle.selling_price_per_batch = Decimal::new(80125, 3);
        assert_eq!(bottle.sp_per_batch(), Decimal::new(8013, 2));
    }

    #[test]
    fn form_numbers_fall_back_to_defaults() {
        let draft = BottleTypeDraft::from_form(&BottleTypeForm {
            label: " 2 ltr ".to_string(),
            quantity_ltr: "2".to_string(),
            bottles_in_batch: "six".to_string(),
            can_price: "abc".to_string(),
            price_per_kg: "9.5".to_string(),
            box_cost: String::new(),
            selling_price_per_batch: "7.9".to_string(),
        })
        .expect("valid bottle");

        assert_eq!(draft.label, "2 ltr");
        assert_eq!(draft.bottles_in_batch, 1);
        assert_eq!(draft.can_price, Decimal::ZERO);
        assert_eq!(draft.box_cost, Decimal::ZERO);
        assert_eq!(draft.price_per_kg, Decimal::new(95, 1));
    }

    #[test]
    fn fractional_batch_size_is_truncated() {
        let draft = BottleTypeDraft::from_form(&BottleTypeForm {
            label: "odd".to_string(),
            bottles_in_batch: "6.9".to_string(),
            ..BottleTypeForm::default()
        })
        .expect("valid bottle");
        assert_eq!(draft.bottles_in_batch, 6);
    }

    #[test]
    fn blank_label_is_rejected() {
        assert!(BottleTypeDraft::from_form(&BottleTypeForm::default()).is_err());
    }
}
