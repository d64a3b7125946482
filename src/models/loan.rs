//! Loan ledger records and derived views

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};

/// Stored lifecycle state of a loan. `Returned` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoanStatus {
    #[serde(alias = "active")]
    Active,
    #[serde(alias = "returned")]
    Returned,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Returned => "returned",
        }
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(LoanStatus::Active),
            "returned" => Ok(LoanStatus::Returned),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

// SQLx conversion for LoanStatus
impl sqlx::Type<Postgres> for LoanStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for LoanStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for LoanStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// One entry of the loan ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LoanRecord {
    pub id: i32,
    pub book_id: i32,
    pub membership_id: String,
    pub loan_date: DateTime<Utc>,
    pub due_date: NaiveDate,
    pub return_date: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    pub note: Option<String>,
}

impl LoanRecord {
    pub fn is_active(&self) -> bool {
        self.status == LoanStatus::Active
    }
}

/// Loan about to be inserted; the store assigns the id
#[derive(Debug, Clone)]
pub struct NewLoan {
    pub book_id: i32,
    pub membership_id: String,
    pub loan_date: DateTime<Utc>,
    pub due_date: NaiveDate,
    pub note: Option<String>,
}

/// Create loan request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateLoan {
    pub book_id: i32,
    pub membership_id: String,
    pub note: Option<String>,
}

/// Read-time label of an active loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum EffectiveStatus {
    Active,
    Overdue,
}

/// Active loan annotated with its overdue status as of a given day
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActiveLoan {
    #[serde(flatten)]
    pub loan: LoanRecord,
    pub effective_status: EffectiveStatus,
    pub days_overdue: i64,
}

impl ActiveLoan {
    pub fn annotate(loan: LoanRecord, today: NaiveDate) -> Self {
        let effective_status = effective_status(loan.due_date, today);
        let days_overdue = match effective_status {
            EffectiveStatus::Overdue => (today - loan.due_date).num_days(),
            EffectiveStatus::Active => 0,
        };
        Self {
            loan,
            effective_status,
            days_overdue,
        }
    }
}

/// Ledger query filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LoanFilter {
    /// `ACTIVE` or `RETURNED`, either case
    pub status: Option<LoanStatus>,
    pub book_id: Option<i32>,
    pub membership_id: Option<String>,
}

impl LoanFilter {
    pub fn active() -> Self {
        Self {
            status: Some(LoanStatus::Active),
            ..Default::default()
        }
    }

    pub fn matches(&self, loan: &LoanRecord) -> bool {
        self.status.map_or(true, |s| s == loan.status)
            && self.book_id.map_or(true, |id| id == loan.book_id)
            && self
                .membership_id
                .as_deref()
                .map_or(true, |m| m == loan.membership_id)
    }
}

/// Due date for a loan taken at `loan_date`. Time of day is dropped.
/// `None` when the date falls outside the calendar range.
pub fn due_date_for(loan_date: DateTime<Utc>, duration_days: u32) -> Option<NaiveDate> {
    loan_date
        .date_naive()
        .checked_add_days(Days::new(u64::from(duration_days)))
}

/// A loan is overdue only once its due date is strictly before today.
pub fn effective_status(due_date: NaiveDate, today: NaiveDate) -> EffectiveStatus {
    if due_date < today {
        EffectiveStatus::Overdue
    } else {
        EffectiveStatus::Active
    }
}
