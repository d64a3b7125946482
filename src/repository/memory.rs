//! In-memory store
//!
//! A transaction takes the single table lock and writes in place, recording
//! the prior value of every row it touches. Writers are fully serialized.
//! Dropping a transaction without `commit` replays the undo log in reverse,
//! so it leaves no trace.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{LedgerTx, LibraryStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        Book, BookAvailability, CreateBook, LoanFilter, LoanRecord, LoanStatus, Member, NewLoan,
    },
};

#[derive(Debug, Default)]
struct Tables {
    books: BTreeMap<i32, Book>,
    members: BTreeMap<String, Member>,
    loans: BTreeMap<i32, LoanRecord>,
    last_book_id: i32,
    last_loan_id: i32,
}

impl Tables {
    fn book(&self, id: i32) -> AppResult<Book> {
        self.books.get(&id).cloned().ok_or(AppError::BookNotFound(id))
    }

    fn member(&self, membership_id: &str) -> AppResult<Member> {
        self.members
            .get(membership_id)
            .cloned()
            .ok_or_else(|| AppError::MemberNotFound(membership_id.to_string()))
    }

    fn loan(&self, id: i32) -> AppResult<LoanRecord> {
        self.loans.get(&id).cloned().ok_or(AppError::LoanNotFound(id))
    }
}

/// Store backed by process memory
#[derive(Clone, Default)]
pub struct MemoryRepository {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Prior state of a row written inside a transaction
enum Undo {
    Book(Book),
    Loan(LoanRecord),
    InsertedLoan(i32),
}

pub struct MemoryLedgerTx {
    tables: OwnedMutexGuard<Tables>,
    undo: Vec<Undo>,
}

impl Drop for MemoryLedgerTx {
    fn drop(&mut self) {
        while let Some(entry) = self.undo.pop() {
            match entry {
                Undo::Book(book) => {
                    self.tables.books.insert(book.id, book);
                }
                Undo::Loan(loan) => {
                    self.tables.loans.insert(loan.id, loan);
                }
                Undo::InsertedLoan(id) => {
                    self.tables.loans.remove(&id);
                    self.tables.last_loan_id = id - 1;
                }
            }
        }
    }
}

#[async_trait]
impl LibraryStore for MemoryRepository {
    async fn begin(&self) -> AppResult<Box<dyn LedgerTx>> {
        let tables = self.tables.clone().lock_owned().await;
        Ok(Box::new(MemoryLedgerTx {
            tables,
            undo: Vec::new(),
        }))
    }

    async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.tables.lock().await.book(id)
    }

    async fn book_availability(&self, id: i32) -> AppResult<BookAvailability> {
        let tables = self.tables.lock().await;
        let book = tables.book(id)?;
        let active_loans = tables
            .loans
            .values()
            .filter(|l| l.book_id == id && l.is_active())
            .count();
        Ok(BookAvailability::new(&book, active_loans as i64))
    }

    async fn insert_book(&self, data: &CreateBook) -> AppResult<Book> {
        let mut tables = self.tables.lock().await;
        tables.last_book_id += 1;
        let book = Book {
            id: tables.last_book_id,
            title: data.title.clone(),
            author: data.author.clone(),
            genre: data.genre.clone(),
            publisher: data.publisher.clone(),
            edition: data.edition.clone(),
            year: data.year,
            isbn: data.isbn.clone(),
            barcode: data.barcode.clone(),
            total_copies: data.copies,
            available_copies: data.copies,
        };
        tables.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn get_member(&self, membership_id: &str) -> AppResult<Member> {
        self.tables.lock().await.member(membership_id)
    }

    async fn insert_member(&self, member: &Member) -> AppResult<Member> {
        let mut tables = self.tables.lock().await;
        let cpf_taken = member.cpf.is_some()
            && tables.members.values().any(|m| m.cpf == member.cpf);
        if tables.members.contains_key(&member.membership_id) || cpf_taken {
            return Err(AppError::Conflict(format!(
                "Membership id or CPF already registered: {}",
                member.membership_id
            )));
        }
        tables
            .members
            .insert(member.membership_id.clone(), member.clone());
        Ok(member.clone())
    }

    async fn get_loan(&self, id: i32) -> AppResult<LoanRecord> {
        self.tables.lock().await.loan(id)
    }

    async fn list_loans(&self, filter: &LoanFilter) -> AppResult<Vec<LoanRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .loans
            .values()
            .filter(|loan| filter.matches(loan))
            .cloned()
            .collect())
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl LedgerTx for MemoryLedgerTx {
    async fn lock_book(&mut self, id: i32) -> AppResult<Book> {
        self.tables.book(id)
    }

    async fn update_book(&mut self, book: &Book) -> AppResult<()> {
        let stored = self
            .tables
            .books
            .get_mut(&book.id)
            .ok_or(AppError::BookNotFound(book.id))?;
        self.undo.push(Undo::Book(stored.clone()));
        stored.total_copies = book.total_copies;
        stored.available_copies = book.available_copies;
        Ok(())
    }

    async fn get_member(&mut self, membership_id: &str) -> AppResult<Member> {
        self.tables.member(membership_id)
    }

    async fn insert_loan(&mut self, loan: &NewLoan) -> AppResult<LoanRecord> {
        self.tables.last_loan_id += 1;
        let record = LoanRecord {
            id: self.tables.last_loan_id,
            book_id: loan.book_id,
            membership_id: loan.membership_id.clone(),
            loan_date: loan.loan_date,
            due_date: loan.due_date,
            return_date: None,
            status: LoanStatus::Active,
            note: loan.note.clone(),
        };
        self.tables.loans.insert(record.id, record.clone());
        self.undo.push(Undo::InsertedLoan(record.id));
        Ok(record)
    }

    async fn lock_loan(&mut self, id: i32) -> AppResult<LoanRecord> {
        self.tables.loan(id)
    }

    async fn update_loan(&mut self, loan: &LoanRecord) -> AppResult<()> {
        let stored = self
            .tables
            .loans
            .get_mut(&loan.id)
            .ok_or(AppError::LoanNotFound(loan.id))?;
        self.undo.push(Undo::Loan(stored.clone()));
        stored.status = loan.status;
        stored.return_date = loan.return_date;
        Ok(())
    }

    async fn count_active_loans(&mut self, book_id: i32) -> AppResult<i64> {
        let count = self
            .tables
            .loans
            .values()
            .filter(|l| l.book_id == book_id && l.is_active())
            .count();
        Ok(count as i64)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let mut tx = self;
        tx.undo.clear();
        Ok(())
    }
}

#[cfg(test)]
impl MemoryRepository {
    /// Overwrite a stored book, bypassing ledger accounting
    pub(crate) async fn put_book(&self, book: Book) {
        let mut tables = self.tables.lock().await;
        tables.last_book_id = tables.last_book_id.max(book.id);
        tables.books.insert(book.id, book);
    }

    /// Overwrite a stored loan, bypassing ledger accounting
    pub(crate) async fn put_loan(&self, loan: LoanRecord) {
        let mut tables = self.tables.lock().await;
        tables.last_loan_id = tables.last_loan_id.max(loan.id);
        tables.loans.insert(loan.id, loan);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::book::sample_book;
    use chrono::{NaiveDate, Utc};

    fn new_loan(book_id: i32) -> NewLoan {
        NewLoan {
            book_id,
            membership_id: "2024001".into(),
            loan_date: Utc::now(),
            due_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            note: None,
        }
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let store = MemoryRepository::new();
        store.put_book(sample_book(1, 2, 2)).await;

        {
            let mut tx = store.begin().await.unwrap();
            let mut book = tx.lock_book(1).await.unwrap();
            book.available_copies = 1;
            tx.update_book(&book).await.unwrap();
            tx.insert_loan(&new_loan(1)).await.unwrap();
        }

        assert_eq!(store.get_book(1).await.unwrap().available_copies, 2);
        assert!(store.list_loans(&LoanFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rollback_restores_returned_loan_and_ids() {
        let store = MemoryRepository::new();
        store.put_book(sample_book(1, 2, 2)).await;

        let mut tx = store.begin().await.unwrap();
        let kept = tx.insert_loan(&new_loan(1)).await.unwrap();
        tx.commit().await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            let mut loan = tx.lock_loan(kept.id).await.unwrap();
            loan.status = LoanStatus::Returned;
            loan.return_date = Some(Utc::now());
            tx.update_loan(&loan).await.unwrap();
            tx.insert_loan(&new_loan(1)).await.unwrap();
            tx.insert_loan(&new_loan(1)).await.unwrap();
        }

        assert_eq!(store.get_loan(kept.id).await.unwrap(), kept);
        assert!(matches!(store.get_loan(2).await, Err(AppError::LoanNotFound(2))));

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.insert_loan(&new_loan(1)).await.unwrap().id, 2);
    }

    #[tokio::test]
    async fn test_commit_publishes_changes() {
        let store = MemoryRepository::new();
        store.put_book(sample_book(1, 2, 2)).await;

        let mut tx = store.begin().await.unwrap();
        let first = tx.insert_loan(&new_loan(1)).await.unwrap();
        let second = tx.insert_loan(&new_loan(1)).await.unwrap();
        assert_eq!(tx.count_active_loans(1).await.unwrap(), 2);
        tx.commit().await.unwrap();

        assert_eq!((first.id, second.id), (1, 2));
        assert_eq!(store.get_loan(2).await.unwrap().status, LoanStatus::Active);
    }

    #[tokio::test]
    async fn test_duplicate_member_rejected() {
        let store = MemoryRepository::new();
        let member = Member {
            membership_id: "2024001".into(),
            name: "Ana Souza".into(),
            cpf: Some("52998224725".into()),
            email: None,
            phone: None,
            kind: None,
        };
        store.insert_member(&member).await.unwrap();

        let same_id = store.insert_member(&member).await.unwrap_err();
        assert!(matches!(same_id, AppError::Conflict(_)));

        let same_cpf = Member {
            membership_id: "2024002".into(),
            ..member
        };
        assert!(store.insert_member(&same_cpf).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_rows() {
        let store = MemoryRepository::new();
        assert!(matches!(store.get_book(3).await, Err(AppError::BookNotFound(3))));
        assert!(matches!(store.get_loan(8).await, Err(AppError::LoanNotFound(8))));
        assert!(matches!(
            store.get_member("x").await,
            Err(AppError::MemberNotFound(_))
        ));
    }
}
