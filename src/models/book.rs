//! Book model and availability accounting

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Book record from the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    pub publisher: Option<String>,
    pub edition: Option<String>,
    pub year: Option<i32>,
    pub isbn: Option<String>,
    pub barcode: Option<String>,
    pub total_copies: i32,
    pub available_copies: i32,
}

impl Book {
    /// Take one copy off the shelf for a new loan.
    pub(crate) fn reserve_copy(&mut self) -> AppResult<()> {
        if self.available_copies <= 0 {
            return Err(AppError::NoCopiesAvailable(self.id));
        }
        self.available_copies -= 1;
        Ok(())
    }

    /// Put one copy back on the shelf after a return.
    pub(crate) fn release_copy(&mut self) -> AppResult<()> {
        if self.available_copies >= self.total_copies {
            return Err(AppError::InvalidState(format!(
                "Book {} already has all {} copies available",
                self.id, self.total_copies
            )));
        }
        self.available_copies += 1;
        Ok(())
    }
}

/// Register book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    pub genre: Option<String>,
    pub publisher: Option<String>,
    pub edition: Option<String>,
    pub year: Option<i32>,
    pub isbn: Option<String>,
    pub barcode: Option<String>,
    /// Number of copies acquired
    #[validate(range(min = 1, message = "Copies must be a positive integer"))]
    pub copies: i32,
}

/// Adjust the number of copies owned
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateCopies {
    pub total_copies: i32,
}

/// Copy accounting for one book, re-derived from the ledger
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookAvailability {
    pub book_id: i32,
    pub total_copies: i32,
    pub available_copies: i32,
    pub active_loans: i64,
    /// `available_copies == total_copies - active_loans`
    pub consistent: bool,
}

impl BookAvailability {
    pub fn new(book: &Book, active_loans: i64) -> Self {
        Self {
            book_id: book.id,
            total_copies: book.total_copies,
            available_copies: book.available_copies,
            active_loans,
            consistent: i64::from(book.available_copies)
                == i64::from(book.total_copies) - active_loans,
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_book(id: i32, total: i32, available: i32) -> Book {
    Book {
        id,
        title: "Dom Casmurro".to_string(),
        author: "Machado de Assis".to_string(),
        genre: None,
        publisher: None,
        edition: None,
        year: Some(1899),
        isbn: None,
        barcode: None,
        total_copies: total,
        available_copies: available,
    }
}
