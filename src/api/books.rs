//! Book catalog endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::book::{Book, BookAvailability, CreateBook, UpdateCopies},
    AppState,
};

/// Register a book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book registered", body = Book),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    Json(request): Json<CreateBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let book = state.services.catalog.register_book(request).await?;
    tracing::info!("Book {} registered with {} copies", book.id, book.total_copies);
    Ok((StatusCode::CREATED, Json(book)))
}

/// Get book by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Change the number of copies owned
#[utoipa::path(
    put,
    path = "/books/{id}/copies",
    tag = "books",
    params(("id" = i32, Path, description = "Book ID")),
    request_body = UpdateCopies,
    responses(
        (status = 200, description = "Copies updated", body = Book),
        (status = 404, description = "Book not found"),
        (status = 409, description = "More copies on loan than the new total")
    )
)]
pub async fn update_copies(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(request): Json<UpdateCopies>,
) -> AppResult<Json<Book>> {
    let book = state
        .services
        .catalog
        .set_total_copies(id, request.total_copies)
        .await?;
    tracing::info!(
        "Book {} now owns {} copies ({} available)",
        book.id,
        book.total_copies,
        book.available_copies
    );
    Ok(Json(book))
}

/// Copy accounting for a book
#[utoipa::path(
    get,
    path = "/books/{id}/availability",
    tag = "books",
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Availability", body = BookAvailability),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_availability(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<BookAvailability>> {
    let availability = state.services.catalog.availability(id).await?;
    if !availability.consistent {
        tracing::warn!(
            "Book {} availability drifted: {} available, {} total, {} on loan",
            id,
            availability.available_copies,
            availability.total_copies,
            availability.active_loans
        );
    }
    Ok(Json(availability))
}
