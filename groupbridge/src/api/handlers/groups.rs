use axum::{
    debug_handler,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use groupbridge_types::{Group, GroupId, Member, MemberKind, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use super::parse_kind;
use crate::api::bearer_auth::CurrentUser;
use crate::api::error::AppError;
use crate::app_state::SharedAppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct GroupList {
    pub groups: Vec<Group>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NamedGroup {
    pub group: Group,
    /// A local group with the same name exists and is shadowed.
    pub overloaded: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Case-insensitive substring of the group name
    pub q: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SearchResult {
    pub groups: BTreeMap<String, GroupId>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateGroupRequest {
    pub name: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct MembersQuery {
    /// `user` (default) or `group`
    pub kind: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MemberList {
    pub members: Vec<Member>,
}

async fn existing_group(state: &SharedAppState, id: GroupId) -> Result<Group, AppError> {
    state
        .resolver
        .get_group_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Group {}", id)))
}

#[utoipa::path(
    get,
    path = "/api/v1/authenticated/groups",
    responses(
    (status = 200, description = "Merged directory and local groups", body = GroupList),
    (status = 401, description = "Access token is missing or invalid"),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn list_groups_handler(
    State(state): State<SharedAppState>,
) -> Result<impl IntoResponse, AppError> {
    let groups = state.resolver.get_groups().await?;
    Ok(Json(GroupList { groups }))
}

#[utoipa::path(
    get,
    path = "/api/v1/authenticated/groups/search",
    params(SearchQuery),
    responses(
    (status = 200, description = "Matching group names with their ids", body = SearchResult),
    (status = 401, description = "Access token is missing or invalid"),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn search_groups_handler(
    State(state): State<SharedAppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, AppError> {
    let groups = state.resolver.search_matching_groups(&query.q).await?;
    Ok(Json(SearchResult { groups }))
}

#[utoipa::path(
    get,
    path = "/api/v1/authenticated/groups/by-name/{name}",
    params(("name" = String, Path, description = "Exact group name")),
    responses(
    (status = 200, description = "Group with this name", body = NamedGroup),
    (status = 404, description = "No group with this name"),
    (status = 401, description = "Access token is missing or invalid"),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn group_by_name_handler(
    State(state): State<SharedAppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let group = state
        .resolver
        .get_group_by_name(&name)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Group '{}'", name)))?;
    let overloaded = state.resolver.is_overloaded(&name).await?;
    Ok(Json(NamedGroup { group, overloaded }))
}

#[utoipa::path(
    get,
    path = "/api/v1/authenticated/groups/{id}",
    params(("id" = u64, Path, description = "Group id")),
    responses(
    (status = 200, description = "The group", body = Group),
    (status = 404, description = "Unknown group id"),
    (status = 401, description = "Access token is missing or invalid"),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn get_group_handler(
    State(state): State<SharedAppState>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, AppError> {
    let group = existing_group(&state, GroupId(id)).await?;
    Ok(Json(group))
}

#[utoipa::path(
    get,
    path = "/api/v1/authenticated/groups/{id}/members",
    params(("id" = u64, Path, description = "Group id"), MembersQuery),
    responses(
    (status = 200, description = "Direct members of the group", body = MemberList),
    (status = 400, description = "Unknown member kind"),
    (status = 404, description = "Group not found"),
    (status = 401, description = "Access token is missing or invalid"),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn group_members_handler(
    State(state): State<SharedAppState>,
    Path(id): Path<u64>,
    Query(query): Query<MembersQuery>,
) -> Result<impl IntoResponse, AppError> {
    let kind = match query.kind.as_deref() {
        Some(kind) => parse_kind(kind)?,
        None => MemberKind::User,
    };
    let group = existing_group(&state, GroupId(id)).await?;
    let members = state.resolver.members_of_group(group.id, kind).await?;
    Ok(Json(MemberList { members }))
}

#[utoipa::path(
    post,
    path = "/api/v1/authenticated/groups",
    request_body(content = CreateGroupRequest, content_type = "application/json"),
    responses(
    (status = 201, description = "Created local group", body = Group),
    (status = 400, description = "Empty group name"),
    (status = 409, description = "A directory group or local group has this name"),
    (status = 401, description = "Access token is missing or invalid"),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn create_group_handler(
    State(state): State<SharedAppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CreateGroupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput("Group name must not be empty".into()));
    }

    let group = state.resolver.create_group(name).await?;
    info!("{} created local group '{}' ({})", user.name, group.name, group.id);
    Ok((StatusCode::CREATED, Json(group)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/authenticated/groups/{id}",
    params(("id" = u64, Path, description = "Group id")),
    responses(
    (status = 204, description = "Group deleted"),
    (status = 403, description = "Directory groups can not be deleted"),
    (status = 404, description = "Unknown group id"),
    (status = 401, description = "Access token is missing or invalid"),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn delete_group_handler(
    State(state): State<SharedAppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, AppError> {
    state.resolver.delete_group(GroupId(id)).await?;
    info!("{} deleted local group {}", user.name, id);
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/authenticated/groups/{id}/members",
    params(("id" = u64, Path, description = "Group id")),
    request_body(content = Member, content_type = "application/json"),
    responses(
    (status = 200, description = "The group", body = Group),
    (status = 403, description = "Directory group involved in a forbidden modification"),
    (status = 404, description = "Unknown group, user or directory group"),
    (status = 401, description = "Access token is missing or invalid"),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn add_member_handler(
    State(state): State<SharedAppState>,
    Path(id): Path<u64>,
    Json(member): Json<Member>,
) -> Result<impl IntoResponse, AppError> {
    let group = GroupId(id);
    match member {
        Member::User(user) => state.resolver.add_user_to_group(group, user).await?,
        Member::Group(child) => state.resolver.add_group_to_group(group, child).await?,
    }
    Ok(Json(existing_group(&state, group).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/authenticated/groups/{id}/members/{kind}/{member_id}",
    params(
        ("id" = u64, Path, description = "Group id"),
        ("kind" = String, Path, description = "`user` or `group`"),
        ("member_id" = u64, Path, description = "User or group id"),
    ),
    responses(
    (status = 204, description = "Member removed"),
    (status = 400, description = "Unknown member kind"),
    (status = 403, description = "Directory group involved in a forbidden modification"),
    (status = 404, description = "Member not part of the group"),
    (status = 401, description = "Access token is missing or invalid"),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn remove_member_handler(
    State(state): State<SharedAppState>,
    Path((id, kind, member_id)): Path<(u64, String, u64)>,
) -> Result<impl IntoResponse, AppError> {
    let group = GroupId(id);
    match parse_kind(&kind)? {
        MemberKind::User => {
            state
                .resolver
                .remove_user_from_group(group, UserId(member_id))
                .await?
        }
        MemberKind::Group => {
            state
                .resolver
                .remove_group_from_group(group, GroupId(member_id))
                .await?
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/api/v1/authenticated/groups/{id}/members",
    params(("id" = u64, Path, description = "Group id")),
    responses(
    (status = 204, description = "All members removed"),
    (status = 403, description = "Directory groups can not be modified"),
    (status = 404, description = "Unknown group id"),
    (status = 401, description = "Access token is missing or invalid"),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn remove_all_members_handler(
    State(state): State<SharedAppState>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, AppError> {
    state.resolver.remove_all_members(GroupId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
