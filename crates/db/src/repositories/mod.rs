use async_trait::async_trait;
use thiserror::Error;

use salesbook_core::domain::bottle::{BottleType, BottleTypeDraft, BottleTypeId};
use salesbook_core::domain::client::{Client, ClientDraft, ClientId};
use salesbook_core::domain::lead::{Lead, LeadDraft, LeadFilter, LeadId, LeadPatch};
use salesbook_core::domain::location::{Location, LocationId};
use salesbook_core::domain::sale::{Sale, SaleDraft, SaleId};
use salesbook_core::errors::{ApplicationError, DomainError};

pub mod bottle;
pub mod client;
pub mod lead;
pub mod location;
pub mod sale;

pub use bottle::SqlBottleTypeRepository;
pub use client::SqlClientRepository;
pub use lead::SqlLeadRepository;
pub use location::SqlLocationRepository;
pub use sale::SqlSaleRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound(message) => Self::NotFound(message),
            RepositoryError::Conflict(message) => Self::Domain(DomainError::Conflict(message)),
            RepositoryError::Database(error) => Self::Persistence(error.to_string()),
            RepositoryError::Decode(message) => Self::Persistence(message),
        }
    }
}

pub(crate) fn decode_error(error: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

pub(crate) fn decimal_column(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<rust_decimal::Decimal, RepositoryError> {
    use sqlx::Row;

    let raw: String = row.try_get(column).map_err(decode_error)?;
    raw.parse().map_err(|error| RepositoryError::Decode(format!("{column}: {error}")))
}

pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn list(&self, search: Option<&str>) -> Result<Vec<Client>, RepositoryError>;
    async fn find_by_id(&self, id: ClientId) -> Result<Option<Client>, RepositoryError>;
    async fn create(&self, draft: ClientDraft) -> Result<Client, RepositoryError>;
    async fn update(&self, id: ClientId, draft: ClientDraft) -> Result<Client, RepositoryError>;
    async fn delete(&self, id: ClientId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait BottleTypeRepository: Send + Sync {
    async fn list(&self, search: Option<&str>) -> Result<Vec<BottleType>, RepositoryError>;
    async fn find_by_id(&self, id: BottleTypeId) -> Result<Option<BottleType>, RepositoryError>;
    async fn create(&self, draft: BottleTypeDraft) -> Result<BottleType, RepositoryError>;
    async fn update(
        &self,
        id: BottleTypeId,
        draft: BottleTypeDraft,
    ) -> Result<BottleType, RepositoryError>;
    /// Refuses with `Conflict` while any sale item references the bottle type.
    async fn delete(&self, id: BottleTypeId) -> Result<(), RepositoryError>;
    /// Inserts or updates by label; returns `true` when a row was created.
    async fn upsert_by_label(&self, draft: BottleTypeDraft) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait SaleRepository: Send + Sync {
    /// All sales with their lines, newest first (date desc, id desc).
    async fn list(&self) -> Result<Vec<Sale>, RepositoryError>;
    async fn find_by_id(&self, id: SaleId) -> Result<Option<Sale>, RepositoryError>;
    async fn create(&self, draft: SaleDraft) -> Result<Sale, RepositoryError>;
    /// Rewrites the sale and swaps its whole item set in one transaction.
    async fn replace(&self, id: SaleId, draft: SaleDraft) -> Result<Sale, RepositoryError>;
    async fn delete(&self, id: SaleId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait LocationRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Location>, RepositoryError>;
    async fn find_by_id(&self, id: LocationId) -> Result<Option<Location>, RepositoryError>;
    async fn create(&self, name: &str) -> Result<Location, RepositoryError>;
    async fn rename(&self, id: LocationId, name: &str) -> Result<Location, RepositoryError>;
    /// Deletes the location and every lead attached to it.
    async fn delete(&self, id: LocationId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn list(&self, filter: &LeadFilter) -> Result<Vec<Lead>, RepositoryError>;
    async fn find_by_id(&self, id: LeadId) -> Result<Option<Lead>, RepositoryError>;
    async fn create(&self, draft: LeadDraft) -> Result<Lead, RepositoryError>;
    async fn update(&self, id: LeadId, patch: LeadPatch) -> Result<Lead, RepositoryError>;
    async fn delete(&self, id: LeadId) -> Result<(), RepositoryError>;
}
