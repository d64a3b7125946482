//! Book domain methods on Repository

use sqlx::{FromRow, PgConnection, Row};

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookAvailability, CreateBook},
};

const BOOK_COLUMNS: &str = "id, title, author, genre, publisher, edition, year, isbn, barcode, \
                            total_copies, available_copies";

impl Repository {
    /// Get book by ID
    pub async fn books_get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(&format!("SELECT {} FROM books WHERE id = $1", BOOK_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::BookNotFound(id))
    }

    /// Book counters and active loan count from a single statement
    pub async fn books_availability(&self, id: i32) -> AppResult<BookAvailability> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {},
                   (SELECT COUNT(*) FROM loans l
                    WHERE l.book_id = books.id AND l.status = 'active') AS active_loans
            FROM books WHERE id = $1
            "#,
            BOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::BookNotFound(id))?;

        let book = Book::from_row(&row)?;
        let active_loans: i64 = row.try_get("active_loans")?;
        Ok(BookAvailability::new(&book, active_loans))
    }

    /// Create a book with all of its copies on the shelf
    pub async fn books_create(&self, data: &CreateBook) -> AppResult<Book> {
        let row = sqlx::query_as::<_, Book>(&format!(
            r#"
            INSERT INTO books (title, author, genre, publisher, edition, year, isbn, barcode,
                               total_copies, available_copies)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(&data.title)
        .bind(&data.author)
        .bind(&data.genre)
        .bind(&data.publisher)
        .bind(&data.edition)
        .bind(data.year)
        .bind(&data.isbn)
        .bind(&data.barcode)
        .bind(data.copies)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Inserted book id={} ({} copies)", row.id, row.total_copies);
        Ok(row)
    }
}

/// Read a book and hold its row lock until the transaction ends
pub(super) async fn lock(conn: &mut PgConnection, id: i32) -> AppResult<Book> {
    sqlx::query_as::<_, Book>(&format!(
        "SELECT {} FROM books WHERE id = $1 FOR UPDATE",
        BOOK_COLUMNS
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or(AppError::BookNotFound(id))
}

/// Persist copy counts
pub(super) async fn update_copies(conn: &mut PgConnection, book: &Book) -> AppResult<()> {
    let result = sqlx::query(
        "UPDATE books SET total_copies = $1, available_copies = $2 WHERE id = $3",
    )
    .bind(book.total_copies)
    .bind(book.available_copies)
    .bind(book.id)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::BookNotFound(book.id));
    }
    Ok(())
}
