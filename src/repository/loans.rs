//! Loan ledger domain methods on Repository

use sqlx::{PgConnection, Postgres, QueryBuilder};

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::loan::{LoanFilter, LoanRecord, LoanStatus, NewLoan},
};

const LOAN_COLUMNS: &str =
    "id, book_id, membership_id, loan_date, due_date, return_date, status, note";

impl Repository {
    /// Get loan by ID
    pub async fn loans_get_by_id(&self, id: i32) -> AppResult<LoanRecord> {
        sqlx::query_as::<_, LoanRecord>(&format!("SELECT {} FROM loans WHERE id = $1", LOAN_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::LoanNotFound(id))
    }

    /// List ledger entries in insertion order
    pub async fn loans_list(&self, filter: &LoanFilter) -> AppResult<Vec<LoanRecord>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM loans WHERE TRUE", LOAN_COLUMNS));

        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(book_id) = filter.book_id {
            builder.push(" AND book_id = ").push_bind(book_id);
        }
        if let Some(ref membership_id) = filter.membership_id {
            builder.push(" AND membership_id = ").push_bind(membership_id.clone());
        }
        builder.push(" ORDER BY id");

        let loans = builder
            .build_query_as::<LoanRecord>()
            .fetch_all(&self.pool)
            .await?;
        Ok(loans)
    }
}

pub(super) async fn insert(conn: &mut PgConnection, loan: &NewLoan) -> AppResult<LoanRecord> {
    let record = sqlx::query_as::<_, LoanRecord>(&format!(
        r#"
        INSERT INTO loans (book_id, membership_id, loan_date, due_date, status, note)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {}
        "#,
        LOAN_COLUMNS
    ))
    .bind(loan.book_id)
    .bind(&loan.membership_id)
    .bind(loan.loan_date)
    .bind(loan.due_date)
    .bind(LoanStatus::Active)
    .bind(&loan.note)
    .fetch_one(conn)
    .await?;
    Ok(record)
}

/// Read a loan and hold its row lock until the transaction ends
pub(super) async fn lock(conn: &mut PgConnection, id: i32) -> AppResult<LoanRecord> {
    sqlx::query_as::<_, LoanRecord>(&format!(
        "SELECT {} FROM loans WHERE id = $1 FOR UPDATE",
        LOAN_COLUMNS
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or(AppError::LoanNotFound(id))
}

/// Persist the return of a loan. Only the closing fields are writable.
pub(super) async fn update(conn: &mut PgConnection, loan: &LoanRecord) -> AppResult<()> {
    let result = sqlx::query("UPDATE loans SET status = $1, return_date = $2 WHERE id = $3")
        .bind(loan.status)
        .bind(loan.return_date)
        .bind(loan.id)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::LoanNotFound(loan.id));
    }
    Ok(())
}

pub(super) async fn count_active_for_book(conn: &mut PgConnection, book_id: i32) -> AppResult<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE book_id = $1 AND status = 'active'")
            .bind(book_id)
            .fetch_one(conn)
            .await?;
    Ok(count)
}
