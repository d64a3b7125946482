//! Library member model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Member (student, teacher, staff) allowed to borrow books
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Member {
    /// School membership number, unique and immutable
    pub membership_id: String,
    pub name: String,
    pub cpf: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Member category (e.g. "student", "teacher")
    pub kind: Option<String>,
}

/// Register member request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateMember {
    #[validate(length(min = 1, max = 64, message = "Membership id is required"))]
    pub membership_id: String,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub cpf: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub kind: Option<String>,
}

impl CreateMember {
    /// Trim every field and treat blank optional fields as absent
    pub fn normalized(self) -> Self {
        Self {
            membership_id: self.membership_id.trim().to_string(),
            name: self.name.trim().to_string(),
            cpf: non_blank(self.cpf),
            email: non_blank(self.email),
            phone: non_blank(self.phone),
            kind: non_blank(self.kind),
        }
    }
}

impl From<CreateMember> for Member {
    fn from(m: CreateMember) -> Self {
        let m = m.normalized();
        Self {
            membership_id: m.membership_id,
            name: m.name,
            cpf: m.cpf,
            email: m.email,
            phone: m.phone,
            kind: m.kind,
        }
    }
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
