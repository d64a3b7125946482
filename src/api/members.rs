//! Member endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::member::{CreateMember, Member},
    AppState,
};

/// Register a member
#[utoipa::path(
    post,
    path = "/members",
    tag = "members",
    request_body = CreateMember,
    responses(
        (status = 201, description = "Member registered", body = Member),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Membership id or CPF already registered")
    )
)]
pub async fn create_member(
    State(state): State<AppState>,
    Json(request): Json<CreateMember>,
) -> AppResult<(StatusCode, Json<Member>)> {
    let member = state.services.members.register_member(request).await?;
    tracing::info!("Member {} registered", member.membership_id);
    Ok((StatusCode::CREATED, Json(member)))
}

/// Get member by membership id
#[utoipa::path(
    get,
    path = "/members/{membership_id}",
    tag = "members",
    params(("membership_id" = String, Path, description = "Membership id")),
    responses(
        (status = 200, description = "Member details", body = Member),
        (status = 404, description = "Member not found")
    )
)]
pub async fn get_member(
    State(state): State<AppState>,
    Path(membership_id): Path<String>,
) -> AppResult<Json<Member>> {
    let member = state.services.members.get_member(&membership_id).await?;
    Ok(Json(member))
}
