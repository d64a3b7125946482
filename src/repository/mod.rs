//! Repository layer: the store abstraction and its adapters
//!
//! Services only see [`LibraryStore`] and [`LedgerTx`]. Two adapters exist:
//! [`Repository`] on PostgreSQL and [`memory::MemoryRepository`] in memory.
//! Anything that has to move copy counts and ledger rows together runs
//! inside a single [`LedgerTx`]; dropping it without `commit` discards the
//! whole unit.

pub mod books;
pub mod loans;
pub mod members;
pub mod memory;

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::AppResult,
    models::{Book, BookAvailability, CreateBook, LoanFilter, LoanRecord, Member, NewLoan},
};

pub use memory::MemoryRepository;

/// Catalog, member and ledger storage
#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// Open a write transaction
    async fn begin(&self) -> AppResult<Box<dyn LedgerTx>>;

    async fn get_book(&self, id: i32) -> AppResult<Book>;

    /// Book counters next to its active loan count, read from one snapshot
    /// without taking row locks
    async fn book_availability(&self, id: i32) -> AppResult<BookAvailability>;

    async fn insert_book(&self, book: &CreateBook) -> AppResult<Book>;

    async fn get_member(&self, membership_id: &str) -> AppResult<Member>;

    /// Fails with `Conflict` when the membership id is taken
    async fn insert_member(&self, member: &Member) -> AppResult<Member>;

    async fn get_loan(&self, id: i32) -> AppResult<LoanRecord>;

    /// Ledger entries matching `filter`, ascending by id
    async fn list_loans(&self, filter: &LoanFilter) -> AppResult<Vec<LoanRecord>>;

    async fn ping(&self) -> AppResult<()>;
}

/// Unit of work over the store. Book and loan rows read through `lock_*`
/// stay locked until the transaction commits or is dropped.
#[async_trait]
pub trait LedgerTx: Send {
    async fn lock_book(&mut self, id: i32) -> AppResult<Book>;

    async fn update_book(&mut self, book: &Book) -> AppResult<()>;

    async fn get_member(&mut self, membership_id: &str) -> AppResult<Member>;

    async fn insert_loan(&mut self, loan: &NewLoan) -> AppResult<LoanRecord>;

    async fn lock_loan(&mut self, id: i32) -> AppResult<LoanRecord>;

    async fn update_loan(&mut self, loan: &LoanRecord) -> AppResult<()>;

    async fn count_active_loans(&mut self, book_id: i32) -> AppResult<i64>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}

/// PostgreSQL store
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// Open PostgreSQL transaction
pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LibraryStore for Repository {
    async fn begin(&self) -> AppResult<Box<dyn LedgerTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgLedgerTx { tx }))
    }

    async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.books_get_by_id(id).await
    }

    async fn book_availability(&self, id: i32) -> AppResult<BookAvailability> {
        self.books_availability(id).await
    }

    async fn insert_book(&self, book: &CreateBook) -> AppResult<Book> {
        self.books_create(book).await
    }

    async fn get_member(&self, membership_id: &str) -> AppResult<Member> {
        self.members_get(membership_id).await
    }

    async fn insert_member(&self, member: &Member) -> AppResult<Member> {
        self.members_create(member).await
    }

    async fn get_loan(&self, id: i32) -> AppResult<LoanRecord> {
        self.loans_get_by_id(id).await
    }

    async fn list_loans(&self, filter: &LoanFilter) -> AppResult<Vec<LoanRecord>> {
        self.loans_list(filter).await
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn lock_book(&mut self, id: i32) -> AppResult<Book> {
        books::lock(&mut *self.tx, id).await
    }

    async fn update_book(&mut self, book: &Book) -> AppResult<()> {
        books::update_copies(&mut *self.tx, book).await
    }

    async fn get_member(&mut self, membership_id: &str) -> AppResult<Member> {
        members::get(&mut *self.tx, membership_id).await
    }

    async fn insert_loan(&mut self, loan: &NewLoan) -> AppResult<LoanRecord> {
        loans::insert(&mut *self.tx, loan).await
    }

    async fn lock_loan(&mut self, id: i32) -> AppResult<LoanRecord> {
        loans::lock(&mut *self.tx, id).await
    }

    async fn update_loan(&mut self, loan: &LoanRecord) -> AppResult<()> {
        loans::update(&mut *self.tx, loan).await
    }

    async fn count_active_loans(&mut self, book_id: i32) -> AppResult<i64> {
        loans::count_active_for_book(&mut *self.tx, book_id).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
