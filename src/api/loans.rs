//! Loan ledger endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::loan::{ActiveLoan, CreateLoan, LoanFilter, LoanRecord},
    AppState,
};

/// Lend a copy of a book to a member
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Loan created", body = LoanRecord),
        (status = 400, description = "Invalid book or membership id"),
        (status = 404, description = "Book or member not found"),
        (status = 409, description = "No copies available")
    )
)]
pub async fn create_loan(
    State(state): State<AppState>,
    Json(request): Json<CreateLoan>,
) -> AppResult<(StatusCode, Json<LoanRecord>)> {
    let loan = state
        .services
        .loans
        .create_loan(request.book_id, &request.membership_id, request.note)
        .await?;

    tracing::info!(
        "Loan {} created: book {} to member {}, due {}",
        loan.id,
        loan.book_id,
        loan.membership_id,
        loan.due_date
    );
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Return a borrowed copy
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan returned", body = LoanRecord),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_loan(
    State(state): State<AppState>,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<LoanRecord>> {
    let loan = state.services.loans.return_loan(loan_id).await?;
    tracing::info!("Loan {} returned (book {})", loan.id, loan.book_id);
    Ok(Json(loan))
}

/// Get loan by ID
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan record", body = LoanRecord),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<AppState>,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<LoanRecord>> {
    let loan = state.services.loans.get_loan(loan_id).await?;
    Ok(Json(loan))
}

/// Loan history
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    params(LoanFilter),
    responses(
        (status = 200, description = "Ledger entries in id order", body = Vec<LoanRecord>)
    )
)]
pub async fn list_loans(
    State(state): State<AppState>,
    Query(filter): Query<LoanFilter>,
) -> AppResult<Json<Vec<LoanRecord>>> {
    let loans = state.services.loans.list_loans(&filter).await?;
    Ok(Json(loans))
}

/// Active loans with their overdue status
#[utoipa::path(
    get,
    path = "/loans/active",
    tag = "loans",
    responses(
        (status = 200, description = "Active loans in id order", body = Vec<ActiveLoan>)
    )
)]
pub async fn list_active_loans(State(state): State<AppState>) -> AppResult<Json<Vec<ActiveLoan>>> {
    let loans: Vec<ActiveLoan> = state.services.loans.list_active_loans().await?.collect();
    Ok(Json(loans))
}
