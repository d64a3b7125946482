//! Member registration service

use std::sync::Arc;

use validator::Validate;

use crate::{
    error::AppResult,
    models::member::{CreateMember, Member},
    repository::LibraryStore,
};

#[derive(Clone)]
pub struct MembersService {
    store: Arc<dyn LibraryStore>,
}

impl MembersService {
    pub fn new(store: Arc<dyn LibraryStore>) -> Self {
        Self { store }
    }

    /// Register a member; membership ids are unique
    pub async fn register_member(&self, request: CreateMember) -> AppResult<Member> {
        let request = request.normalized();
        request.validate()?;
        self.store.insert_member(&Member::from(request)).await
    }

    pub async fn get_member(&self, membership_id: &str) -> AppResult<Member> {
        self.store.get_member(membership_id.trim()).await
    }
}
