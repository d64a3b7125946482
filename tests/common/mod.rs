//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};

use school_library_server::{
    config::LoansConfig,
    models::{CreateBook, CreateMember},
    repository::MemoryRepository,
    services::{clock::Clock, Services},
};

/// Clock the test can move forward
pub struct TestClock(Mutex<DateTime<Utc>>);

impl TestClock {
    pub fn at(y: i32, m: u32, d: u32) -> Arc<Self> {
        let now = Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap();
        Arc::new(Self(Mutex::new(now)))
    }

    pub fn advance_days(&self, days: i64) {
        let mut now = self.0.lock().unwrap();
        *now = *now + Duration::days(days);
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

pub fn services(clock: Arc<TestClock>) -> Services {
    Services::new(
        Arc::new(MemoryRepository::new()),
        clock,
        &LoansConfig::default(),
    )
}

pub fn book(title: &str, copies: i32) -> CreateBook {
    CreateBook {
        title: title.to_string(),
        author: "Monteiro Lobato".to_string(),
        genre: Some("Infantil".to_string()),
        publisher: None,
        edition: None,
        year: None,
        isbn: None,
        barcode: None,
        copies,
    }
}

pub fn member(membership_id: &str) -> CreateMember {
    CreateMember {
        membership_id: membership_id.to_string(),
        name: format!("Aluno {}", membership_id),
        cpf: None,
        email: None,
        phone: None,
        kind: Some("student".to_string()),
    }
}
