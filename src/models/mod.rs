//! Data models for the library server

pub mod book;
pub mod loan;
pub mod member;

// Re-export commonly used types
pub use book::{Book, BookAvailability, CreateBook, UpdateCopies};
pub use loan::{ActiveLoan, CreateLoan, EffectiveStatus, LoanFilter, LoanRecord, LoanStatus, NewLoan};
pub use member::{CreateMember, Member};
