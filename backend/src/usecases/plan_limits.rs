use std::sync::Arc;

use crates::domain::{
    repositories::businesses::BusinessRepository,
    value_objects::{
        enums::resource_kinds::ResourceKind, iam::ActorContext, plans::PlanLimits,
    },
};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::errors::{BookingError, UseCaseResult};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PlanAllowance {
    pub resource: ResourceKind,
    pub limit: Option<i64>,
    pub current: i64,
}

pub struct PlanLimitUseCase<Biz>
where
    Biz: BusinessRepository + Send + Sync + 'static,
{
    business_repo: Arc<Biz>,
}

impl<Biz> PlanLimitUseCase<Biz>
where
    Biz: BusinessRepository + Send + Sync + 'static,
{
    pub fn new(business_repo: Arc<Biz>) -> Self {
        Self { business_repo }
    }

    /// Fails with `PlanLimit` when adding one more `kind` would exceed the tier's cap.
    pub async fn assert_can_create(
        &self,
        business_id: Uuid,
        kind: ResourceKind,
    ) -> UseCaseResult<PlanAllowance> {
        let allowance = self.allowance(business_id, kind).await?;

        if let Some(limit) = allowance.limit.filter(|limit| allowance.current >= *limit) {
            let err = BookingError::PlanLimit {
                resource: kind,
                limit,
                current: allowance.current,
            };
            warn!(
                %business_id,
                resource = %kind,
                limit,
                current = allowance.current,
                status = err.status_code().as_u16(),
                "plan_limits: creation blocked"
            );
            return Err(err);
        }

        info!(%business_id, resource = %kind, current = allowance.current, "plan_limits: creation allowed");
        Ok(allowance)
    }

    pub async fn check_for_actor(
        &self,
        actor: ActorContext,
        kind: ResourceKind,
    ) -> UseCaseResult<PlanAllowance> {
        if !actor.role.is_manager() {
            warn!(business_id = %actor.business_id, actor_id = %actor.actor_id, "plan_limits: permission denied");
            return Err(BookingError::Forbidden("only owners and admins manage resources"));
        }

        self.assert_can_create(actor.business_id, kind).await
    }

    async fn allowance(&self, business_id: Uuid, kind: ResourceKind) -> UseCaseResult<PlanAllowance> {
        let business = self
            .business_repo
            .find_by_id(business_id)
            .await
            .map_err(|err| {
                error!(%business_id, db_error = ?err, "plan_limits: failed to load business");
                BookingError::Internal(err)
            })?
            .ok_or(BookingError::NotFound("business"))?;

        let current = self
            .business_repo
            .count_resources(business_id, kind)
            .await
            .map_err(|err| {
                error!(%business_id, resource = %kind, db_error = ?err, "plan_limits: failed to count resources");
                BookingError::Internal(err)
            })?;

        Ok(PlanAllowance {
            resource: kind,
            limit: PlanLimits::for_tier(business.plan_tier()).limit_for(kind),
            current,
        })
    }
}
