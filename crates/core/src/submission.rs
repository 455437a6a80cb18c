//! Turns a submitted sale form into a [`SaleDraft`].
//!
//! Numeric fields never fail the submission; they fall back to their defaults.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::bottle::{BottleType, BottleTypeId};
use crate::domain::client::Client;
use crate::domain::sale::{BillLine, CashLine, SaleDraft, SaleLine, SaleType};
use crate::errors::DomainError;
use crate::valuation::{parse_count_with_default, parse_with_default, to_kg};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Raw sale form. Line fields arrive as parallel arrays (`quantity[]`, `unit[]`, ...).
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SaleForm {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub sale_type: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub freight: String,
    #[serde(default, rename = "quantity[]")]
    pub quantities: Vec<String>,
    #[serde(default, rename = "unit[]")]
    pub units: Vec<String>,
    #[serde(default, rename = "cost_rate[]")]
    pub cost_rates: Vec<String>,
    #[serde(default, rename = "sell_rate[]")]
    pub sell_rates: Vec<String>,
    #[serde(default, rename = "bottle_type_id[]")]
    pub bottle_type_ids: Vec<String>,
    #[serde(default, rename = "batches[]")]
    pub batches: Vec<String>,
    #[serde(default, rename = "sp_batch[]")]
    pub sp_overrides: Vec<String>,
}

impl SaleForm {
    /// Client id selected in the form, if it is numeric.
    pub fn selected_client_id(&self) -> Option<i64> {
        self.client_id.trim().parse::<i64>().ok()
    }
}

/// The selected client's name wins; otherwise the typed name is used.
pub fn resolve_client_name(selected: Option<&Client>, typed_name: &str) -> Option<String> {
    let name = match selected {
        Some(client) => client.name.trim(),
        None => typed_name.trim(),
    };
    (!name.is_empty()).then(|| name.to_string())
}

pub fn parse_sale_date(raw: &str) -> Result<NaiveDate, DomainError> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).map_err(|_| {
        DomainError::validation(format!("Invalid date `{trimmed}`; expected YYYY-MM-DD"))
    })
}

pub fn build_sale_draft(
    form: &SaleForm,
    client_name: Option<String>,
    catalog: &[BottleType],
) -> Result<SaleDraft, DomainError> {
    let date = parse_sale_date(&form.date)?;
    let client_name = client_name
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| DomainError::validation("Client is required"))?;
    let freight = parse_with_default(&form.freight, Decimal::ZERO);
    let sale_type = SaleType::from_form(&form.sale_type);

    let lines = match sale_type {
        SaleType::Cash => cash_lines(form, catalog)?,
        SaleType::Bill => bill_lines(form)?,
    };

    Ok(SaleDraft { date, client_name, freight, sale_type, lines })
}

fn bill_lines(form: &SaleForm) -> Result<Vec<SaleLine>, DomainError> {
    if form.quantities.is_empty() {
        return Err(DomainError::validation("At least one line item is required"));
    }

    let field = |values: &[String], index: usize| values.get(index).cloned().unwrap_or_default();
    let lines = form
        .quantities
        .iter()
        .enumerate()
        .map(|(index, quantity)| {
            let unit = field(&form.units, index);
            let unit = if unit.trim().is_empty() { "kg".to_string() } else { unit };
            SaleLine::Bill(BillLine {
                quantity_kg: to_kg(parse_with_default(quantity, Decimal::ZERO), &unit),
                cost_per_kg: parse_with_default(&field(&form.cost_rates, index), Decimal::ZERO),
                sell_per_kg: parse_with_default(&field(&form.sell_rates, index), Decimal::ZERO),
            })
        })
        .collect();

    Ok(lines)
}

fn cash_lines(form: &SaleForm, catalog: &[BottleType]) -> Result<Vec<SaleLine>, DomainError> {
    let mut lines = Vec::new();

    for (index, raw_id) in form.bottle_type_ids.iter().enumerate() {
        if raw_id.trim().is_empty() {
            continue;
        }

        let bottle = raw_id
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(|id| catalog.iter().find(|bottle| bottle.id == BottleTypeId(id)))
            .ok_or_else(|| DomainError::validation("Invalid bottle type selected"))?;

        let batches = form
            .batches
            .get(index)
            .map(|raw| parse_count_with_default(raw, 0))
            .unwrap_or(0);
        if batches <= 0 {
            continue;
        }

        let sell_per_batch = form
            .sp_overrides
            .get(index)
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| parse_with_default(raw, bottle.sp_per_batch()))
            .unwrap_or_else(|| bottle.sp_per_batch());

        lines.push(SaleLine::Cash(CashLine {
            batches,
            bottle_type_id: bottle.id,
            bottle: Some(bottle.pack()),
            cost_per_batch: bottle.cp_per_batch(),
            sell_per_batch,
        }));
    }

    if lines.is_empty() {
        return Err(DomainError::validation("At least one bottle line is required"));
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{build_sale_draft, resolve_client_name, SaleForm};
    use crate::domain::bottle::{BottleType, BottleTypeId};
    use crate::domain::client::{Client, ClientId};
    use crate::domain::sale::{Sale, SaleId, SaleLine, SaleType};
    use crate::errors::DomainError;
    use crate::reporting::dashboard;

    fn dec(text: &str) -> Decimal {
        text.parse().expect("decimal literal")
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn catalog() -> Vec<BottleType> {
        vec![BottleType {
            id: BottleTypeId(1),
            label: "1 ltr".to_string(),
            quantity_ltr: dec("1"),
            bottles_in_batch: 12,
            can_price: dec("4.25"),
            price_per_kg: dec("9"),
            box_cost: dec("21"),
            selling_price_per_batch: dec("170"),
        }]
    }

    fn bill_form() -> SaleForm {
        SaleForm {
            date: "2024-04-09".to_string(),
            sale_type: "bill".to_string(),
            freight: "150".to_string(),
            quantities: strings(&["2", "500"]),
            units: strings(&["ton", "kg"]),
            cost_rates: strings(&["40", "abc"]),
            sell_rates: strings(&["45.5", "50"]),
            ..SaleForm::default()
        }
    }

    #[test]
    fn bill_lines_convert_units_and_absorb_bad_numbers() {
        let draft = build_sale_draft(&bill_form(), Some("Acme".to_string()), &[]).expect("draft");

        assert_eq!(draft.sale_type, SaleType::Bill);
        assert_eq!(draft.freight, dec("150"));
        assert_eq!(draft.lines.len(), 2);
        assert_eq!(draft.lines[0].quantity(), dec("2000"));
        assert_eq!(draft.lines[1].cost_rate(), Decimal::ZERO);
        assert_eq!(draft.total_quantity(), dec("2500"));
    }

    #[test]
    fn oversized_amounts_fall_back_and_keep_reports_renderable() {
        let form = SaleForm {
            quantities: strings(&["70000000000000000000000000", "5"]),
            units: strings(&["kg", "ton"]),
            cost_rates: strings(&["10000", "1e13"]),
            sell_rates: strings(&["12000", "8"]),
            ..bill_form()
        };
        let draft = build_sale_draft(&form, Some("Acme".to_string()), &[]).expect("draft");

        assert_eq!(draft.lines[0].quantity(), Decimal::ZERO);
        assert_eq!(draft.lines[1].quantity(), dec("5000"));
        assert_eq!(draft.lines[1].cost_rate(), Decimal::ZERO);

        let sale = Sale {
            id: SaleId(1),
            date: draft.date,
            client_name: draft.client_name.clone(),
            freight: draft.freight,
            quantity: draft.total_quantity(),
            sale_type: draft.sale_type,
            lines: draft.lines.clone(),
        };
        let feed = dashboard(&[sale], draft.date);
        assert_eq!(feed.totals.sp, dec("40000"));
        assert_eq!(feed.totals.cp, dec("150"));
    }

    #[test]
    fn bill_mode_needs_at_least_one_line() {
        let form = SaleForm { quantities: Vec::new(), ..bill_form() };
        let error = build_sale_draft(&form, Some("Acme".to_string()), &[]).expect_err("no lines");
        assert_eq!(error, DomainError::validation("At least one line item is required"));
    }

    #[test]
    fn missing_parallel_fields_default_to_kg_and_zero() {
        let form = SaleForm {
            quantities: strings(&["7"]),
            units: Vec::new(),
            cost_rates: Vec::new(),
            sell_rates: Vec::new(),
            ..bill_form()
        };
        let draft = build_sale_draft(&form, Some("Acme".to_string()), &[]).expect("draft");
        assert_eq!(draft.lines[0].quantity(), dec("7"));
        assert_eq!(draft.lines[0].selling_rate(), Decimal::ZERO);
    }

    #[test]
    fn invalid_date_and_missing_client_are_rejected() {
        let bad_date = SaleForm { date: "09/04/2024".to_string(), ..bill_form() };
        assert!(matches!(
            build_sale_draft(&bad_date, Some("Acme".to_string()), &[]),
            Err(DomainError::Validation(_))
        ));

        assert_eq!(
            build_sale_draft(&bill_form(), None, &[]),
            Err(DomainError::validation("Client is required"))
        );
    }

    #[test]
    fn cash_lines_use_catalog_prices_and_overrides() {
        let form = SaleForm {
            date: "2024-04-09".to_string(),
            sale_type: "Cash".to_string(),
            bottle_type_ids: strings(&["1", "", "1", "1"]),
            batches: strings(&["3", "9", "0", "2"]),
            sp_overrides: strings(&["", "", "", "165.5"]),
            ..SaleForm::default()
        };

        let draft =
            build_sale_draft(&form, Some("Walk-in".to_string()), &catalog()).expect("draft");

        assert_eq!(draft.sale_type, SaleType::Cash);
        assert_eq!(draft.lines.len(), 2);
        assert_eq!(draft.total_quantity(), dec("5"));
        match &draft.lines[0] {
            SaleLine::Cash(line) => {
                assert_eq!(line.batches, 3);
                assert_eq!(line.cost_per_batch, dec("180"));
                assert_eq!(line.sell_per_batch, dec("170"));
            }
            other => panic!("expected cash line, got {other:?}"),
        }
        assert_eq!(draft.lines[1].selling_rate(), dec("165.5"));
    }

    #[test]
    fn unknown_bottle_is_rejected() {
        let form = SaleForm {
            date: "2024-04-09".to_string(),
            sale_type: "cash".to_string(),
            bottle_type_ids: strings(&["42"]),
            batches: strings(&["1"]),
            ..SaleForm::default()
        };
        assert_eq!(
            build_sale_draft(&form, Some("x".to_string()), &catalog()),
            Err(DomainError::validation("Invalid bottle type selected"))
        );
    }

    #[test]
    fn cash_mode_with_only_empty_batches_is_rejected() {
        let form = SaleForm {
            date: "2024-04-09".to_string(),
            sale_type: "cash".to_string(),
            bottle_type_ids: strings(&["1"]),
            batches: strings(&["-2"]),
            ..SaleForm::default()
        };
        assert_eq!(
            build_sale_draft(&form, Some("x".to_string()), &catalog()),
            Err(DomainError::validation("At least one bottle line is required"))
        );
    }

    #[test]
    fn selected_client_name_beats_typed_name() {
        let client = Client {
            id: ClientId(3),
            name: "Registered Name".to_string(),
            address: None,
            tax_id: None,
        };
        assert_eq!(
            resolve_client_name(Some(&client), "typed").as_deref(),
            Some("Registered Name")
        );
        assert_eq!(resolve_client_name(None, "  typed ").as_deref(), Some("typed"));
        assert_eq!(resolve_client_name(None, "   "), None);
    }
}
