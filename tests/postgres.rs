//! Loan ledger scenarios against PostgreSQL
//!
//! Runs only when `DATABASE_URL` points at a reachable database; each test
//! creates its own books and members so runs can share one database.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tokio_test::{assert_err, assert_ok};

use school_library_server::{
    config::LoansConfig,
    error::{AppError, ErrorKind},
    models::{CreateMember, EffectiveStatus, LoanFilter, LoanStatus},
    repository::Repository,
    services::Services,
};

use common::{book, member, TestClock};

async fn pool() -> Option<PgPool> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping PostgreSQL test");
        return None;
    };
    let pool = PgPoolOptions::new()
        .max_connections(32)
        .connect(&url)
        .await
        .expect("database reachable");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations apply");
    Some(pool)
}

fn pg_services(pool: PgPool, clock: Arc<TestClock>) -> Services {
    Services::new(
        Arc::new(Repository::new(pool)),
        clock,
        &LoansConfig::default(),
    )
}

/// Membership id not used by any earlier run
fn unique_id(prefix: &str) -> String {
    static SEQ: AtomicUsize = AtomicUsize::new(0);
    format!(
        "{}-{}-{}",
        prefix,
        Utc::now().timestamp_nanos_opt().unwrap_or_default(),
        SEQ.fetch_add(1, Ordering::Relaxed)
    )
}

async fn enrol(services: &Services, prefix: &str) -> String {
    let id = unique_id(prefix);
    assert_ok!(services.members.register_member(member(&id)).await);
    id
}

#[tokio::test]
async fn test_pg_loan_and_return_round_trip() {
    let Some(pool) = pool().await else { return };
    let clock = TestClock::at(2024, 8, 5);
    let services = pg_services(pool, clock.clone());
    let book = assert_ok!(services.catalog.register_book(book("Reinações de Narizinho", 2)).await);
    let borrower = enrol(&services, "pg-a").await;

    let loan = assert_ok!(services.loans.create_loan(book.id, &borrower, None).await);
    assert_eq!(loan.due_date, NaiveDate::from_ymd_opt(2024, 8, 15).unwrap());
    assert_eq!(assert_ok!(services.loans.get_loan(loan.id).await).status, LoanStatus::Active);
    assert_eq!(assert_ok!(services.catalog.get_book(book.id).await).available_copies, 1);

    let availability = assert_ok!(services.catalog.availability(book.id).await);
    assert_eq!(availability.active_loans, 1);
    assert!(availability.consistent);

    clock.advance_days(3);
    let returned = assert_ok!(services.loans.return_loan(loan.id).await);
    assert_eq!(returned.status, LoanStatus::Returned);

    let stored = assert_ok!(services.loans.get_loan(loan.id).await);
    assert_eq!(stored.status, LoanStatus::Returned);
    assert_eq!(stored.return_date, returned.return_date);

    let history = assert_ok!(
        services
            .loans
            .list_loans(&LoanFilter {
                status: Some(LoanStatus::Returned),
                membership_id: Some(borrower.clone()),
                ..Default::default()
            })
            .await
    );
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, loan.id);

    let availability = assert_ok!(services.catalog.availability(book.id).await);
    assert_eq!((availability.available_copies, availability.active_loans), (2, 0));
    assert!(availability.consistent);
}

#[tokio::test]
async fn test_pg_no_copies_and_double_return() {
    let Some(pool) = pool().await else { return };
    let services = pg_services(pool, TestClock::at(2024, 8, 5));
    let book = assert_ok!(services.catalog.register_book(book("O Picapau Amarelo", 1)).await);
    let first = enrol(&services, "pg-b").await;
    let second = enrol(&services, "pg-b").await;

    let loan = assert_ok!(services.loans.create_loan(book.id, &first, None).await);
    let err = assert_err!(services.loans.create_loan(book.id, &second, None).await);
    assert!(matches!(err, AppError::NoCopiesAvailable(_)));

    let for_book = LoanFilter {
        book_id: Some(book.id),
        ..Default::default()
    };
    assert_eq!(assert_ok!(services.loans.list_loans(&for_book).await).len(), 1);

    assert_ok!(services.loans.return_loan(loan.id).await);
    let err = assert_err!(services.loans.return_loan(loan.id).await);
    assert!(matches!(err, AppError::LoanAlreadyReturned(_)));
    assert_eq!(assert_ok!(services.catalog.get_book(book.id).await).available_copies, 1);
    assert!(assert_ok!(services.catalog.availability(book.id).await).consistent);
}

#[tokio::test]
async fn test_pg_overdue_label() {
    let Some(pool) = pool().await else { return };
    let clock = TestClock::at(2024, 8, 5);
    let services = pg_services(pool, clock.clone());
    let book = assert_ok!(services.catalog.register_book(book("Caçadas de Pedrinho", 2)).await);
    let borrower = enrol(&services, "pg-c").await;

    let early = assert_ok!(services.loans.create_loan(book.id, &borrower, None).await);
    clock.advance_days(1);
    let later = assert_ok!(services.loans.create_loan(book.id, &borrower, None).await);
    clock.advance_days(10);

    let active: Vec<_> = assert_ok!(services.loans.list_active_loans().await)
        .filter(|l| l.loan.book_id == book.id)
        .collect();
    assert_eq!(active.len(), 2);
    assert_eq!(active[0].loan.id, early.id);
    assert_eq!(active[0].effective_status, EffectiveStatus::Overdue);
    assert_eq!(active[0].days_overdue, 1);
    assert_eq!(active[1].loan.id, later.id);
    assert_eq!(active[1].effective_status, EffectiveStatus::Active);
}

#[tokio::test]
async fn test_pg_duplicate_member_is_conflict() {
    let Some(pool) = pool().await else { return };
    let services = pg_services(pool, TestClock::at(2024, 8, 5));
    let id = unique_id("pg-d");
    let cpf = unique_id("cpf");

    let request = CreateMember {
        cpf: Some(cpf.clone()),
        ..member(&id)
    };
    assert_ok!(services.members.register_member(request.clone()).await);

    let err = assert_err!(services.members.register_member(request).await);
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let same_cpf = CreateMember {
        cpf: Some(cpf),
        ..member(&unique_id("pg-d"))
    };
    let err = assert_err!(services.members.register_member(same_cpf).await);
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_pg_concurrent_requests_for_last_copies() {
    const REQUESTS: usize = 25;
    const COPIES: i32 = 4;

    let Some(pool) = pool().await else { return };
    let services = Arc::new(pg_services(pool, TestClock::at(2024, 8, 5)));
    let book = assert_ok!(services.catalog.register_book(book("A Reforma da Natureza", COPIES)).await);
    let mut borrowers = Vec::new();
    for _ in 0..REQUESTS {
        borrowers.push(enrol(&services, "pg-r").await);
    }

    let handles: Vec<_> = borrowers
        .into_iter()
        .map(|borrower| {
            let services = services.clone();
            let book_id = book.id;
            tokio::spawn(async move { services.loans.create_loan(book_id, &borrower, None).await })
        })
        .collect();

    let mut succeeded = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(AppError::NoCopiesAvailable(_)) => refused += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(succeeded, COPIES as usize);
    assert_eq!(refused, REQUESTS - COPIES as usize);
    let availability = assert_ok!(services.catalog.availability(book.id).await);
    assert_eq!((availability.available_copies, availability.active_loans), (0, 4));
    assert!(availability.consistent);
}

#[tokio::test]
async fn test_pg_book_lock_serializes_writers_but_not_readers() {
    let Some(pool) = pool().await else { return };
    let services = Arc::new(pg_services(pool, TestClock::at(2024, 8, 5)));
    let book = assert_ok!(services.catalog.register_book(book("Urupês", 2)).await);
    let borrower = enrol(&services, "pg-l").await;

    let mut tx = assert_ok!(services.store.begin().await);
    assert_ok!(tx.lock_book(book.id).await);

    // reads go through while the row is locked
    let availability = tokio::time::timeout(
        Duration::from_secs(5),
        services.catalog.availability(book.id),
    )
    .await
    .expect("availability does not wait for the row lock");
    assert_eq!(assert_ok!(availability).available_copies, 2);

    // a loan on the same book waits for the lock holder
    let pending = {
        let services = services.clone();
        let book_id = book.id;
        tokio::spawn(async move { services.loans.create_loan(book_id, &borrower, None).await })
    };
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!pending.is_finished());

    assert_ok!(tx.commit().await);
    let loan = assert_ok!(pending.await.unwrap());
    assert_eq!(loan.status, LoanStatus::Active);
    assert_eq!(assert_ok!(services.catalog.get_book(book.id).await).available_copies, 1);
}
