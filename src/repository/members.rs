//! Member domain methods on Repository

use sqlx::{Executor, Postgres};

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::member::Member,
};

impl Repository {
    /// Get member by membership id
    pub async fn members_get(&self, membership_id: &str) -> AppResult<Member> {
        get(&self.pool, membership_id).await
    }

    /// Register a member
    pub async fn members_create(&self, member: &Member) -> AppResult<Member> {
        let inserted = sqlx::query_as::<_, Member>(
            r#"
            INSERT INTO members (membership_id, name, cpf, email, phone, kind)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING membership_id, name, cpf, email, phone, kind
            "#,
        )
        .bind(&member.membership_id)
        .bind(&member.name)
        .bind(&member.cpf)
        .bind(&member.email)
        .bind(&member.phone)
        .bind(&member.kind)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(row) => Ok(row),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AppError::Conflict(
                format!("Membership id or CPF already registered: {}", member.membership_id),
            )),
            Err(e) => Err(e.into()),
        }
    }
}

pub(super) async fn get<'e, E>(executor: E, membership_id: &str) -> AppResult<Member>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Member>(
        "SELECT membership_id, name, cpf, email, phone, kind FROM members WHERE membership_id = $1",
    )
    .bind(membership_id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| AppError::MemberNotFound(membership_id.to_string()))
}
