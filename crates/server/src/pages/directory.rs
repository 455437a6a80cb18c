use axum::{
    extract::{Query, State},
    response::Html,
    Extension,
};
use salesbook_core::domain::lead::{DealStatus, LeadFilter};
use salesbook_db::repositories::{LeadRepository, LocationRepository};
use serde::Deserialize;

use crate::app::AppState;
use crate::auth::CurrentSession;
use crate::error::PageError;
use crate::pages::{page_context, render};

#[derive(Debug, Default, Deserialize)]
pub struct LeadQuery {
    pub location_id: Option<String>,
    pub deal_status: Option<String>,
}

impl LeadQuery {
    pub fn filter(&self) -> LeadFilter {
        LeadFilter::from_query(self.location_id.as_deref(), self.deal_status.as_deref())
    }
}

/// Lead board. Edits go through `/api/leads` from `static/leads.js`.
pub async fn leads_page(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
    Query(query): Query<LeadQuery>,
) -> Result<Html<String>, PageError> {
    let filter = query.filter();
    let leads = state.leads().list(&filter).await?;
    let locations = state.locations().list().await?;

    let mut context = page_context(&state, &session).await;
    context.insert("leads", &leads);
    context.insert("locations", &locations);
    context.insert("deal_choices", &DealStatus::ALL.map(DealStatus::as_str));
    context.insert("selected_location", &filter.location_id.map(|id| id.0));
    context.insert("selected_statuses", &filter.deal_statuses);
    render(&state, "leads.html", &context)
}

pub async fn locations_page(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> Result<Html<String>, PageError> {
    let locations = state.locations().list().await?;

    let mut context = page_context(&state, &session).await;
    context.insert("locations", &locations);
    render(&state, "locations.html", &context)
}

#[cfg(test)]
mod tests {
    use axum::{
        extract::{Query, State},
        Extension,
    };
    use salesbook_core::domain::lead::{DealStatus, LeadDraft};
    use salesbook_db::repositories::{LeadRepository, LocationRepository};

    use super::{leads_page, locations_page, LeadQuery};
    use crate::pages::test_support::{session, state_with};

    const TEMPLATES: &[(&str, &str)] = &[
        (
            "leads.html",
            "{% for lead in leads %}[{{ lead.name }}@{{ lead.location_name }}]{% endfor %}|{{ deal_choices | length }}|{{ selected_location }}",
        ),
        ("locations.html", "{% for l in locations %}[{{ l.name }}]{% endfor %}"),
    ];

    #[tokio::test]
    async fn lead_board_applies_query_filters() {
        let state = state_with(TEMPLATES).await;
        let session = session(&state).await;
        let pune = state.locations().create("Pune").await.expect("location");
        let nashik = state.locations().create("Nashik").await.expect("location");
        for (name, location, status) in [
            ("Patil Dairy", pune.id, DealStatus::DealClosed),
            ("Kale Farms", nashik.id, DealStatus::DealClosed),
            ("Joshi Foods", pune.id, DealStatus::NeedToVisit),
        ] {
            state
                .leads()
                .create(LeadDraft {
                    name: name.to_string(),
                    location_id: Some(location),
                    deal_status: Some(status),
                    ..LeadDraft::default()
                })
                .await
                .expect("lead");
        }

        let query = LeadQuery {
            location_id: Some(pune.id.0.to_string()),
            deal_status: Some("Deal Closed".to_string()),
        };
        let page = leads_page(State(state.clone()), Extension(session.clone()), Query(query))
            .await
            .expect("leads page");
        assert_eq!(page.0, format!("[Patil Dairy@Pune]|4|{}", pune.id.0));

        let locations = locations_page(State(state), Extension(session)).await.expect("page");
        assert_eq!(locations.0, "[Nashik][Pune]");
    }
}
