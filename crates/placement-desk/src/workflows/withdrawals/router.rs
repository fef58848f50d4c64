use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ActingUser, EntityId, EntityKind, EntityRef, Permission, WithdrawalReason};
use super::repository::{
    ApplicationWithdrawalPolicy, CascadeFailureSink, WithdrawalCollaborators, WithdrawalDirectory,
};
use super::service::{WithdrawalError, WithdrawalService};

/// Router builder exposing the withdrawal operations. Authentication is
/// upstream; the acting user arrives in the request itself.
pub fn withdrawal_router<D, P, C, F>(service: Arc<WithdrawalService<D, P, C, F>>) -> Router
where
    D: WithdrawalDirectory + 'static,
    P: ApplicationWithdrawalPolicy + 'static,
    C: WithdrawalCollaborators + 'static,
    F: CascadeFailureSink + 'static,
{
    Router::new()
        .route(
            "/api/v1/applications/:application_id/withdrawables",
            get(list_withdrawables_handler::<D, P, C, F>),
        )
        .route("/api/v1/withdrawals", post(withdraw_handler::<D, P, C, F>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct WithdrawablesQuery {
    user_id: String,
    /// Comma-separated permission labels, e.g.
    /// `withdraw_application,withdraw_booking`.
    #[serde(default)]
    permissions: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WithdrawalRequest {
    kind: EntityKind,
    id: String,
    user: ActingUser,
    reason: WithdrawalReason,
    #[serde(default)]
    other_reason: Option<String>,
    /// Date stamped on booking withdrawals; defaults to today.
    #[serde(default)]
    occurred_at: Option<NaiveDate>,
}

pub(crate) async fn list_withdrawables_handler<D, P, C, F>(
    State(service): State<Arc<WithdrawalService<D, P, C, F>>>,
    Path(application_id): Path<String>,
    Query(query): Query<WithdrawablesQuery>,
) -> Response
where
    D: WithdrawalDirectory + 'static,
    P: ApplicationWithdrawalPolicy + 'static,
    C: WithdrawalCollaborators + 'static,
    F: CascadeFailureSink + 'static,
{
    let permissions = match parse_permissions(query.permissions.as_deref()) {
        Ok(permissions) => permissions,
        Err(label) => {
            let payload = json!({ "error": format!("unknown permission '{label}'") });
            return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
        }
    };

    let user = ActingUser {
        id: query.user_id,
        permissions,
    };
    let target = EntityRef::new(EntityKind::Application, EntityId(application_id));

    match service.all_directly_withdrawable(&target, &user) {
        Ok(withdrawables) => {
            let payload = json!({
                "application_id": target.id,
                "withdrawables": withdrawables,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn withdraw_handler<D, P, C, F>(
    State(service): State<Arc<WithdrawalService<D, P, C, F>>>,
    axum::Json(request): axum::Json<WithdrawalRequest>,
) -> Response
where
    D: WithdrawalDirectory + 'static,
    P: ApplicationWithdrawalPolicy + 'static,
    C: WithdrawalCollaborators + 'static,
    F: CascadeFailureSink + 'static,
{
    let target = EntityRef::new(request.kind, EntityId(request.id));
    let occurred_at = request
        .occurred_at
        .unwrap_or_else(|| Local::now().date_naive());

    match service.withdraw(
        &target,
        &request.user,
        request.reason,
        request.other_reason.as_deref(),
        occurred_at,
    ) {
        Ok(receipt) => (StatusCode::OK, axum::Json(receipt)).into_response(),
        Err(error) => error_response(error),
    }
}

fn parse_permissions(raw: Option<&str>) -> Result<BTreeSet<Permission>, String> {
    let mut permissions = BTreeSet::new();
    let Some(raw) = raw else {
        return Ok(permissions);
    };

    for label in raw.split(',').filter(|label| !label.trim().is_empty()) {
        match Permission::from_label(label) {
            Some(permission) => {
                permissions.insert(permission);
            }
            None => return Err(label.trim().to_string()),
        }
    }
    Ok(permissions)
}

fn error_response(error: WithdrawalError) -> Response {
    let status = match &error {
        WithdrawalError::NotFound(_) => StatusCode::NOT_FOUND,
        WithdrawalError::Unauthorized { .. } => StatusCode::FORBIDDEN,
        WithdrawalError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        WithdrawalError::Directory(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}
