use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use groupbridge_core::settings::api_server::AuthMode;
use groupbridge_types::{Group, GroupId, GroupOrigin, GroupSummary, Member, MemberKind, UserId};

use utoipa::openapi::security::SecurityScheme;
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::handlers::groups::{
    __path_add_member_handler, __path_create_group_handler, __path_delete_group_handler,
    __path_get_group_handler, __path_group_by_name_handler, __path_group_members_handler,
    __path_list_groups_handler, __path_remove_all_members_handler, __path_remove_member_handler,
    __path_search_groups_handler,
};
use crate::api::handlers::groups::{
    add_member_handler, create_group_handler, delete_group_handler, get_group_handler,
    group_by_name_handler, group_members_handler, list_groups_handler,
    remove_all_members_handler, remove_member_handler, search_groups_handler,
};
use crate::api::handlers::groups::{CreateGroupRequest, GroupList, MemberList, NamedGroup, SearchResult};
use crate::api::handlers::health::{__path_health_checker_handler, health_checker_handler};
use crate::api::handlers::info::{__path_info_handler, info_handler};
use crate::api::handlers::membership::{
    __path_member_groups_handler, __path_membership_handler, member_groups_handler,
    membership_handler, MemberGroups, MembershipResult,
};
use crate::api::handlers::users::{
    __path_provision_users_handler, provision_users_handler, ProvisionResult,
};
use crate::app_state::SharedAppState;

use super::bearer_auth::auth;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_checker_handler,
        info_handler,
        list_groups_handler,
        search_groups_handler,
        group_by_name_handler,
        get_group_handler,
        group_members_handler,
        create_group_handler,
        delete_group_handler,
        add_member_handler,
        remove_member_handler,
        remove_all_members_handler,
        membership_handler,
        member_groups_handler,
        provision_users_handler,
    ),
    components(
        schemas(
            Group, GroupId, GroupOrigin, GroupSummary, Member, MemberKind, UserId,
            AuthMode, CreateGroupRequest, GroupList, MemberList, NamedGroup, SearchResult,
            MembershipResult, MemberGroups, ProvisionResult
        )
    ),
    tags(
        (name = "groupbridge", description = "groupbridge api")
    ),
    modifiers(&SecurityAddon)
)]
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearerAuth",
                SecurityScheme::Http(utoipa::openapi::security::Http::new(
                    utoipa::openapi::security::HttpAuthScheme::Bearer,
                )),
            )
        }
    }
}

pub struct ApiRoutes;

impl ApiRoutes {
    pub fn create(state: SharedAppState) -> Router {
        let api = SecurityAddon::openapi();

        let authenticated_router = Router::new()
            .route(
                "/api/v1/authenticated/groups",
                get(list_groups_handler).post(create_group_handler),
            )
            .route(
                "/api/v1/authenticated/groups/search",
                get(search_groups_handler),
            )
            .route(
                "/api/v1/authenticated/groups/by-name/{name}",
                get(group_by_name_handler),
            )
            .route(
                "/api/v1/authenticated/groups/{id}",
                get(get_group_handler).delete(delete_group_handler),
            )
            .route(
                "/api/v1/authenticated/groups/{id}/members",
                get(group_members_handler)
                    .post(add_member_handler)
                    .delete(remove_all_members_handler),
            )
            .route(
                "/api/v1/authenticated/groups/{id}/members/{kind}/{member_id}",
                delete(remove_member_handler),
            )
            .route(
                "/api/v1/authenticated/membership",
                get(membership_handler),
            )
            .route(
                "/api/v1/authenticated/members/{kind}/{id}/groups",
                get(member_groups_handler),
            )
            .route(
                "/api/v1/authenticated/users/provision",
                post(provision_users_handler),
            )
            .route_layer(middleware::from_fn_with_state(state.clone(), auth));

        let public_router = Router::new()
            .route("/api/v1/health", get(health_checker_handler))
            .route("/api/v1/info", get(info_handler))
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api));

        Router::new()
            .merge(authenticated_router)
            .merge(public_router)
            .with_state(state)
    }
}
