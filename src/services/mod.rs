//! Business logic services

pub mod catalog;
pub mod clock;
pub mod loans;
pub mod members;

use std::sync::Arc;

use crate::{
    config::LoansConfig,
    error::{AppError, AppResult},
    repository::LibraryStore,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub members: members::MembersService,
    pub loans: loans::LoansService,
    pub store: Arc<dyn LibraryStore>,
}

impl Services {
    /// Create all services over the given store
    pub fn new(
        store: Arc<dyn LibraryStore>,
        clock: Arc<dyn clock::Clock>,
        loans_config: &LoansConfig,
    ) -> Self {
        Self {
            catalog: catalog::CatalogService::new(store.clone()),
            members: members::MembersService::new(store.clone()),
            loans: loans::LoansService::new(store.clone(), clock, loans_config),
            store,
        }
    }
}

/// Reject non-positive record ids
pub(crate) fn validate_id(what: &str, id: i32) -> AppResult<()> {
    if id <= 0 {
        return Err(AppError::Validation(format!(
            "{} id must be a positive integer, got {}",
            what, id
        )));
    }
    Ok(())
}
