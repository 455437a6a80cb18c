use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::location::LocationId;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeadId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DealStatus {
    #[serde(rename = "Need To Visit")]
    NeedToVisit,
    #[serde(rename = "In Discussion")]
    InDiscussion,
    #[serde(rename = "Deal Closed")]
    DealClosed,
    #[serde(rename = "Deal Rejected")]
    DealRejected,
}

impl DealStatus {
    pub const ALL: [DealStatus; 4] =
        [Self::NeedToVisit, Self::InDiscussion, Self::DealClosed, Self::DealRejected];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NeedToVisit => "Need To Visit",
            Self::InDiscussion => "In Discussion",
            Self::DealClosed => "Deal Closed",
            Self::DealRejected => "Deal Rejected",
        }
    }
}

impl std::str::FromStr for DealStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::ALL.into_iter().find(|status| status.as_str() == trimmed).ok_or_else(|| {
            DomainError::validation(format!(
                "deal_status must be one of: {}",
                Self::ALL.map(DealStatus::as_str).join(", ")
            ))
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub name: String,
    pub location_id: Option<LocationId>,
    pub location_name: Option<String>,
    pub indiamart_link: Option<String>,
    pub deal_status: Option<DealStatus>,
    pub comments: Option<String>,
    pub address: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Lead {
    pub fn to_draft(&self) -> LeadDraft {
        LeadDraft {
            name: self.name.clone(),
            location_id: self.location_id,
            indiamart_link: self.indiamart_link.clone(),
            deal_status: self.deal_status,
            comments: self.comments.clone(),
            address: self.address.clone(),
        }
    }
}

/// Writable lead fields.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeadDraft {
    pub name: String,
    pub location_id: Option<LocationId>,
    pub indiamart_link: Option<String>,
    pub deal_status: Option<DealStatus>,
    pub comments: Option<String>,
    pub address: Option<String>,
}

impl LeadDraft {
    pub fn from_json(payload: &Map<String, Value>) -> Result<Self, DomainError> {
        let name = payload.get("name").and_then(text_value).unwrap_or_default();
        if name.is_empty() {
            return Err(DomainError::validation("name is required"));
        }

        Ok(Self {
            name,
            location_id: payload.get("location_id").and_then(location_value),
            indiamart_link: payload.get("indiamart_link").and_then(text_value),
            deal_status: payload.get("deal_status").map(status_value).transpose()?.flatten(),
            comments: payload.get("comments").and_then(text_value),
            address: payload.get("address").and_then(text_value),
        })
    }
}

/// Partial lead update. The outer `Option` records whether a key was present; inner
/// `None` clears the column.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeadPatch {
    pub name: Option<String>,
    pub location_id: Option<Option<LocationId>>,
    pub indiamart_link: Option<Option<String>>,
    pub deal_status: Option<Option<DealStatus>>,
    pub comments: Option<Option<String>>,
    pub address: Option<Option<String>>,
}

impl LeadPatch {
    pub fn from_json(payload: &Map<String, Value>) -> Result<Self, DomainError> {
        let name = match payload.get("name") {
            Some(value) => {
                let name = text_value(value).unwrap_or_default();
                if name.is_empty() {
                    return Err(DomainError::validation("name cannot be empty"));
                }
                Some(name)
            }
            None => None,
        };

        Ok(Self {
            name,
            location_id: payload.get("location_id").map(location_value),
            indiamart_link: payload.get("indiamart_link").map(text_value),
            deal_status: payload.get("deal_status").map(status_value).transpose()?,
            comments: payload.get("comments").map(text_value),
            address: payload.get("address").map(text_value),
        })
    }

    pub fn apply(&self, draft: &mut LeadDraft) {
        if let Some(name) = &self.name {
            draft.name = name.clone();
        }
        if let Some(location_id) = self.location_id {
            draft.location_id = location_id;
        }
        if let Some(link) = &self.indiamart_link {
            draft.indiamart_link = link.clone();
        }
        if let Some(status) = self.deal_status {
            draft.deal_status = status;
        }
        if let Some(comments) = &self.comments {
            draft.comments = comments.clone();
        }
        if let Some(address) = &self.address {
            draft.address = address.clone();
        }
    }
}

/// Lead list filter; both parts are optional and combine with AND.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LeadFilter {
    pub location_id: Option<LocationId>,
    pub deal_statuses: Vec<String>,
}

impl LeadFilter {
    /// Parses the query-string form: `location_id=3&deal_status=Deal Closed,Deal Rejected`.
    pub fn from_query(location_id: Option<&str>, deal_status: Option<&str>) -> Self {
        let location_id = location_id
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|id| *id != 0)
            .map(LocationId);
        let deal_statuses = deal_status
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|status| !status.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self { location_id, deal_statuses }
    }
}

fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        other => Some(other.to_string()),
    }
}

/// Location ids from JSON; `0`, blanks and non-numeric values mean no location.
fn location_value(value: &Value) -> Option<LocationId> {
    let id = match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    id.filter(|id| *id != 0).map(LocationId)
}

fn status_value(value: &Value) -> Result<Option<DealStatus>, DomainError> {
    text_value(value).map(|text| text.parse::<DealStatus>()).transpose()
}
