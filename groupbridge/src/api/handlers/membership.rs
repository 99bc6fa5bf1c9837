use axum::{
    debug_handler,
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use groupbridge_types::{GroupId, GroupSummary, Member};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::parse_kind;
use crate::api::error::AppError;
use crate::app_state::SharedAppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct MembershipQuery {
    /// Group id of the candidate parent
    pub parent: u64,
    /// `user` or `group`
    pub kind: String,
    /// User or group id of the candidate member
    pub child: u64,
    /// Follow nested groups across both stores
    #[serde(default)]
    pub recursive: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MembershipResult {
    pub member: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MemberGroups {
    pub groups: Vec<GroupSummary>,
}

#[utoipa::path(
    get,
    path = "/api/v1/authenticated/membership",
    params(MembershipQuery),
    responses(
    (status = 200, description = "Membership predicate result", body = MembershipResult),
    (status = 400, description = "Unknown member kind"),
    (status = 401, description = "Access token is missing or invalid"),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn membership_handler(
    State(state): State<SharedAppState>,
    Query(query): Query<MembershipQuery>,
) -> Result<impl IntoResponse, AppError> {
    let child = Member::from_parts(parse_kind(&query.kind)?, query.child);
    let member = state
        .resolver
        .is_member(GroupId(query.parent), child, query.recursive)
        .await?;
    Ok(Json(MembershipResult { member }))
}

#[utoipa::path(
    get,
    path = "/api/v1/authenticated/members/{kind}/{id}/groups",
    params(
        ("kind" = String, Path, description = "`user` or `group`"),
        ("id" = u64, Path, description = "User or group id"),
    ),
    responses(
    (status = 200, description = "Groups listing the member directly", body = MemberGroups),
    (status = 400, description = "Unknown member kind"),
    (status = 401, description = "Access token is missing or invalid"),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn member_groups_handler(
    State(state): State<SharedAppState>,
    Path((kind, id)): Path<(String, u64)>,
) -> Result<impl IntoResponse, AppError> {
    let member = Member::from_parts(parse_kind(&kind)?, id);
    let groups = state.resolver.groups_of_member(member).await?;
    Ok(Json(MemberGroups { groups }))
}
