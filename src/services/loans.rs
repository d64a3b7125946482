//! Loan ledger service
//!
//! Owns the loan lifecycle (`ACTIVE -> RETURNED`) and keeps each book's
//! `available_copies` equal to `total_copies` minus its active loans. Every
//! mutation pairs a copy reservation or release with exactly one ledger
//! write inside a single store transaction.

use std::sync::Arc;

use crate::{
    config::LoansConfig,
    error::{AppError, AppResult},
    models::{
        loan::{due_date_for, ActiveLoan, LoanFilter, LoanRecord, LoanStatus, NewLoan},
        member::non_blank,
    },
    repository::LibraryStore,
    services::{clock::Clock, validate_id},
};

#[derive(Clone)]
pub struct LoansService {
    store: Arc<dyn LibraryStore>,
    clock: Arc<dyn Clock>,
    duration_days: u32,
}

impl LoansService {
    pub fn new(store: Arc<dyn LibraryStore>, clock: Arc<dyn Clock>, config: &LoansConfig) -> Self {
        Self {
            store,
            clock,
            duration_days: config.duration_days,
        }
    }

    /// Lend one copy of `book_id` to `membership_id`
    pub async fn create_loan(
        &self,
        book_id: i32,
        membership_id: &str,
        note: Option<String>,
    ) -> AppResult<LoanRecord> {
        validate_id("Book", book_id)?;
        let membership_id = membership_id.trim();
        if membership_id.is_empty() {
            return Err(AppError::Validation("Membership id is required".to_string()));
        }

        let mut tx = self.store.begin().await?;

        let mut book = tx.lock_book(book_id).await?;
        tx.get_member(membership_id).await?;

        let now = self.clock.now();
        let due_date = due_date_for(now, self.duration_days).ok_or_else(|| {
            AppError::Internal(format!(
                "Loan period of {} days is out of range",
                self.duration_days
            ))
        })?;

        book.reserve_copy()?;
        tx.update_book(&book).await?;

        let record = tx
            .insert_loan(&NewLoan {
                book_id,
                membership_id: membership_id.to_string(),
                loan_date: now,
                due_date,
                note: non_blank(note),
            })
            .await?;

        tx.commit().await?;
        Ok(record)
    }

    /// Close an active loan and put the copy back on the shelf
    pub async fn return_loan(&self, loan_id: i32) -> AppResult<LoanRecord> {
        validate_id("Loan", loan_id)?;

        let mut tx = self.store.begin().await?;

        let mut loan = tx.lock_loan(loan_id).await?;
        if loan.status == LoanStatus::Returned {
            return Err(AppError::LoanAlreadyReturned(loan_id));
        }

        let mut book = tx.lock_book(loan.book_id).await?;
        book.release_copy()?;
        tx.update_book(&book).await?;

        loan.status = LoanStatus::Returned;
        loan.return_date = Some(self.clock.now());
        tx.update_loan(&loan).await?;

        tx.commit().await?;
        Ok(loan)
    }

    pub async fn get_loan(&self, loan_id: i32) -> AppResult<LoanRecord> {
        validate_id("Loan", loan_id)?;
        self.store.get_loan(loan_id).await
    }

    /// Ledger history, ascending by id
    pub async fn list_loans(&self, filter: &LoanFilter) -> AppResult<Vec<LoanRecord>> {
        self.store.list_loans(filter).await
    }

    /// Active loans in id order, each labelled ACTIVE or OVERDUE as of today.
    /// Labels are computed as the iterator is consumed.
    pub async fn list_active_loans(&self) -> AppResult<impl Iterator<Item = ActiveLoan>> {
        let today = self.clock.now().date_naive();
        let loans = self.store.list_loans(&LoanFilter::active()).await?;
        Ok(loans
            .into_iter()
            .filter(LoanRecord::is_active)
            .map(move |loan| ActiveLoan::annotate(loan, today)))
    }
}
