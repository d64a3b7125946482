//! Catalog management service

use std::sync::Arc;

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookAvailability, CreateBook},
        member::non_blank,
    },
    repository::LibraryStore,
    services::validate_id,
};

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn LibraryStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn LibraryStore>) -> Self {
        Self { store }
    }

    /// Register a book with all copies available
    pub async fn register_book(&self, book: CreateBook) -> AppResult<Book> {
        let book = CreateBook {
            title: book.title.trim().to_string(),
            author: book.author.trim().to_string(),
            genre: non_blank(book.genre),
            publisher: non_blank(book.publisher),
            edition: non_blank(book.edition),
            isbn: non_blank(book.isbn),
            barcode: non_blank(book.barcode),
            ..book
        };
        book.validate()?;
        self.store.insert_book(&book).await
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        validate_id("Book", id)?;
        self.store.get_book(id).await
    }

    /// Change the number of copies owned. Availability is re-derived from
    /// the active loans, so copies out on loan can never be written off.
    pub async fn set_total_copies(&self, id: i32, total_copies: i32) -> AppResult<Book> {
        validate_id("Book", id)?;
        if total_copies < 0 {
            return Err(AppError::Validation(
                "Total copies cannot be negative".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;
        let mut book = tx.lock_book(id).await?;
        let on_loan = tx.count_active_loans(id).await?;

        if i64::from(total_copies) < on_loan {
            return Err(AppError::InvalidState(format!(
                "Book {} has {} copies on loan, cannot reduce total to {}",
                id, on_loan, total_copies
            )));
        }

        book.total_copies = total_copies;
        book.available_copies = total_copies - on_loan as i32;
        tx.update_book(&book).await?;
        tx.commit().await?;
        Ok(book)
    }

    /// Compare stored availability with what the ledger implies
    pub async fn availability(&self, id: i32) -> AppResult<BookAvailability> {
        validate_id("Book", id)?;
        self.store.book_availability(id).await
    }
}
