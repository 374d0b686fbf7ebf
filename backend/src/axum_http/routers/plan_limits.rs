use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use crates::domain::value_objects::enums::resource_kinds::ResourceKind;

use super::{Collaborators, PlanLimits};
use crate::{auth::AuthActor, usecases::errors::BookingError};

pub fn routes(collaborators: &Collaborators) -> Router {
    Router::new()
        .route("/:resource", get(check_plan_limit))
        .with_state(Arc::new(collaborators.plan_limits()))
}

/// 204 when one more resource fits the caller's plan, 403 with `{limit, current}` otherwise.
pub async fn check_plan_limit(
    State(plan_limits): State<Arc<PlanLimits>>,
    AuthActor(actor): AuthActor,
    Path(resource): Path<String>,
) -> Result<impl IntoResponse, BookingError> {
    let kind = ResourceKind::from_path(&resource)
        .ok_or_else(|| BookingError::Validation(format!("unknown resource: {resource}")))?;

    plan_limits.check_for_actor(actor, kind).await?;
    Ok(StatusCode::NO_CONTENT)
}
