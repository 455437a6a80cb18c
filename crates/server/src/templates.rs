use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tera::Tera;
use tracing::warn;

/// Page templates shipped with the binary, used when `templates/` is not readable.
const EMBEDDED_TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../../templates/base.html")),
    ("login.html", include_str!("../../../templates/login.html")),
    ("index.html", include_str!("../../../templates/index.html")),
    ("clients.html", include_str!("../../../templates/clients.html")),
    ("client_form.html", include_str!("../../../templates/client_form.html")),
    ("sales.html", include_str!("../../../templates/sales.html")),
    ("sale_form.html", include_str!("../../../templates/sale_form.html")),
    ("bottles.html", include_str!("../../../templates/bottles.html")),
    ("bottle_form.html", include_str!("../../../templates/bottle_form.html")),
    ("reports.html", include_str!("../../../templates/reports.html")),
    ("leads.html", include_str!("../../../templates/leads.html")),
    ("locations.html", include_str!("../../../templates/locations.html")),
];

pub fn init_templates() -> Arc<Tera> {
    let mut tera = match Tera::new("templates/**/*.html") {
        Ok(tera) => tera,
        Err(error) => {
            warn!(error = %error, "failed to load templates from filesystem, using embedded copies");
            Tera::default()
        }
    };

    let missing: Vec<(&str, &str)> = EMBEDDED_TEMPLATES
        .iter()
        .filter(|(name, _)| !tera.get_template_names().any(|loaded| loaded == *name))
        .copied()
        .collect();
    if let Err(error) = tera.add_raw_templates(missing) {
        warn!(error = %error, "embedded templates failed to parse");
    }

    register_template_filters(&mut tera);
    Arc::new(tera)
}

pub fn register_template_filters(tera: &mut Tera) {
    tera.register_filter("money", tera_money_filter);
}

/// Formats a decimal (string or number) with two places: `{{ sale.sp | money }}`.
fn tera_money_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let amount = match value {
        tera::Value::String(text) => text.parse::<Decimal>().unwrap_or_default(),
        tera::Value::Number(number) => {
            number.to_string().parse::<Decimal>().unwrap_or_default()
        }
        _ => Decimal::ZERO,
    };
    Ok(tera::Value::String(format!("{:.2}", amount)))
}
