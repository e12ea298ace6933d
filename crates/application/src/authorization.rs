use std::sync::Arc;

use domain::{policy, DomainError, FollowEdges, UserId};

use crate::{error::ApplicationError, repository::FollowRepository};

/// 基于关注关系的私信权限判断。
///
/// 每次调用都重新查询关注关系，不做缓存。
#[derive(Clone)]
pub struct AuthorizationGuard {
    follows: Arc<dyn FollowRepository>,
}

impl AuthorizationGuard {
    pub fn new(follows: Arc<dyn FollowRepository>) -> Self {
        Self { follows }
    }

    /// 可以给自己发，或者我关注了对方
    pub async fn can_send(
        &self,
        me: UserId,
        counterpart: UserId,
    ) -> Result<bool, ApplicationError> {
        if me == counterpart {
            return Ok(true);
        }
        let me_follows_counterpart = self.follows.is_following(me, counterpart).await?;
        Ok(policy::send_allowed(me, counterpart, me_follows_counterpart))
    }

    /// 任意一方关注另一方即可查看
    pub async fn can_view(
        &self,
        me: UserId,
        counterpart: UserId,
    ) -> Result<bool, ApplicationError> {
        if me == counterpart {
            return Ok(true);
        }
        let me_follows_counterpart = self.follows.is_following(me, counterpart).await?;
        if me_follows_counterpart {
            return Ok(true);
        }
        let edges = FollowEdges {
            me_follows_counterpart,
            counterpart_follows_me: self.follows.is_following(counterpart, me).await?,
        };
        Ok(policy::view_allowed(me, counterpart, edges))
    }

    pub async fn ensure_can_send(
        &self,
        me: UserId,
        counterpart: UserId,
    ) -> Result<(), ApplicationError> {
        if self.can_send(me, counterpart).await? {
            Ok(())
        } else {
            Err(DomainError::SendNotAllowed.into())
        }
    }

    pub async fn ensure_can_view(
        &self,
        me: UserId,
        counterpart: UserId,
    ) -> Result<(), ApplicationError> {
        if self.can_view(me, counterpart).await? {
            Ok(())
        } else {
            Err(DomainError::ViewNotAllowed.into())
        }
    }
}
