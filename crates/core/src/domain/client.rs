use serde::{Deserialize, Serialize};

use crate::domain::optional_text;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(pub i64);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub address: Option<String>,
    pub tax_id: Option<String>,
}

/// Raw client form fields as submitted.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ClientForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, alias = "gst")]
    pub tax_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientDraft {
    pub name: String,
    pub address: Option<String>,
    pub tax_id: Option<String>,
}

impl ClientDraft {
    pub fn from_form(form: &ClientForm) -> Result<Self, DomainError> {
        let name = form.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("Client name is required"));
        }

        Ok(Self {
            name: name.to_string(),
            address: optional_text(&form.address),
            tax_id: optional_text(&form.tax_id).map(|value| value.to_uppercase()),
        })
    }
}
