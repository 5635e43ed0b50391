use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::domain::{
    Department, DepartmentId, Member, MemberId, NewDepartment, RegistrationRequest, Role,
};
use crate::api::{ApiJson, ApiPath, ChurchApi};
use crate::auth::{AuthMember, Permission};
use crate::error::ApiError;
use crate::notifications::Mailer;
use crate::store::Store;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub member: Member,
}

#[derive(Debug, Deserialize)]
pub struct RoleChange {
    pub role: Role,
}

/// `null` removes the member from their department.
#[derive(Debug, Deserialize)]
pub struct DepartmentAssignment {
    pub department_id: Option<Uuid>,
}

/// `null` leaves the department without a head.
#[derive(Debug, Deserialize)]
pub struct HeadAssignment {
    pub head_id: Option<Uuid>,
}

/// Authentication and member administration endpoints.
pub fn member_router<S, M>() -> Router<ChurchApi<S, M>>
where
    S: Store,
    M: Mailer + 'static,
{
    Router::new()
        .route("/api/auth/register", post(register_handler::<S, M>))
        .route("/api/auth/login", post(login_handler::<S, M>))
        .route("/api/auth/me", get(me_handler::<S, M>))
        .route("/api/admin/members", get(active_members_handler::<S, M>))
        .route(
            "/api/admin/members/:member_id",
            delete(deactivate_handler::<S, M>),
        )
        .route(
            "/api/admin/members/:member_id/role",
            patch(change_role_handler::<S, M>),
        )
        .route(
            "/api/admin/members/:member_id/department",
            patch(assign_department_handler::<S, M>),
        )
        .route("/api/admin/departments", post(create_department_handler::<S, M>))
        .route(
            "/api/admin/departments/:department_id",
            patch(set_department_head_handler::<S, M>),
        )
}

pub(crate) async fn register_handler<S, M>(
    State(api): State<ChurchApi<S, M>>,
    ApiJson(request): ApiJson<RegistrationRequest>,
) -> Result<(StatusCode, Json<Member>), ApiError>
where
    S: Store,
    M: Mailer + 'static,
{
    let member = api.members.register(request).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

pub(crate) async fn login_handler<S, M>(
    State(api): State<ChurchApi<S, M>>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError>
where
    S: Store,
    M: Mailer + 'static,
{
    let member = api
        .members
        .authenticate(&request.email, &request.password)
        .await?;
    let token = api.keys.issue(&member)?;
    Ok(Json(LoginResponse { token, member }))
}

pub(crate) async fn me_handler<S, M>(
    State(api): State<ChurchApi<S, M>>,
    caller: AuthMember,
) -> Result<Json<Member>, ApiError>
where
    S: Store,
    M: Mailer + 'static,
{
    Ok(Json(api.members.get(caller.id).await?))
}

pub(crate) async fn active_members_handler<S, M>(
    State(api): State<ChurchApi<S, M>>,
    caller: AuthMember,
) -> Result<Json<Vec<Member>>, ApiError>
where
    S: Store,
    M: Mailer + 'static,
{
    caller.require(Permission::ViewMemberRecords)?;
    Ok(Json(api.members.active_members().await?))
}

pub(crate) async fn deactivate_handler<S, M>(
    State(api): State<ChurchApi<S, M>>,
    caller: AuthMember,
    ApiPath(member_id): ApiPath<Uuid>,
) -> Result<Json<Member>, ApiError>
where
    S: Store,
    M: Mailer + 'static,
{
    caller.require(Permission::ManageMembers)?;
    if caller.id == MemberId(member_id) {
        return Err(ApiError::Validation(
            "you cannot deactivate your own account".to_string(),
        ));
    }
    Ok(Json(api.members.deactivate(MemberId(member_id)).await?))
}

pub(crate) async fn change_role_handler<S, M>(
    State(api): State<ChurchApi<S, M>>,
    caller: AuthMember,
    ApiPath(member_id): ApiPath<Uuid>,
    ApiJson(change): ApiJson<RoleChange>,
) -> Result<Json<Member>, ApiError>
where
    S: Store,
    M: Mailer + 'static,
{
    caller.require(Permission::ManageMembers)?;
    if change.role == Role::SuperAdmin && caller.role != Role::SuperAdmin {
        return Err(ApiError::Forbidden(
            "only a super admin can grant super admin".to_string(),
        ));
    }
    Ok(Json(
        api.members
            .change_role(MemberId(member_id), change.role)
            .await?,
    ))
}

pub(crate) async fn create_department_handler<S, M>(
    State(api): State<ChurchApi<S, M>>,
    caller: AuthMember,
    ApiJson(request): ApiJson<NewDepartment>,
) -> Result<(StatusCode, Json<Department>), ApiError>
where
    S: Store,
    M: Mailer + 'static,
{
    caller.require(Permission::ManageDepartments)?;
    let department = api.members.create_department(request).await?;
    Ok((StatusCode::CREATED, Json(department)))
}

pub(crate) async fn assign_department_handler<S, M>(
    State(api): State<ChurchApi<S, M>>,
    caller: AuthMember,
    ApiPath(member_id): ApiPath<Uuid>,
    ApiJson(assignment): ApiJson<DepartmentAssignment>,
) -> Result<Json<Member>, ApiError>
where
    S: Store,
    M: Mailer + 'static,
{
    caller.require(Permission::ManageMembers)?;
    let member = api
        .members
        .assign_department(MemberId(member_id), assignment.department_id.map(DepartmentId))
        .await?;
    Ok(Json(member))
}

pub(crate) async fn set_department_head_handler<S, M>(
    State(api): State<ChurchApi<S, M>>,
    caller: AuthMember,
    ApiPath(department_id): ApiPath<Uuid>,
    ApiJson(assignment): ApiJson<HeadAssignment>,
) -> Result<Json<Department>, ApiError>
where
    S: Store,
    M: Mailer + 'static,
{
    caller.require(Permission::ManageDepartments)?;
    let department = api
        .members
        .set_department_head(DepartmentId(department_id), assignment.head_id.map(MemberId))
        .await?;
    Ok(Json(department))
}
