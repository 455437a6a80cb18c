pub mod config;
pub mod domain;
pub mod errors;
pub mod reporting;
pub mod submission;
pub mod valuation;

pub use domain::bottle::{BottleType, BottleTypeDraft, BottleTypeId};
pub use domain::client::{Client, ClientDraft, ClientId};
pub use domain::lead::{DealStatus, Lead, LeadDraft, LeadFilter, LeadId, LeadPatch};
pub use domain::location::{Location, LocationId};
pub use domain::sale::{
    BillLine, BottlePack, CashLine, Sale, SaleDraft, SaleId, SaleLine, SaleType,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use valuation::{SaleTotals, Valuation};
