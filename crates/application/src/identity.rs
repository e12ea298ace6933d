use std::sync::Arc;

use domain::{User, Username};
use tracing::debug;

use crate::{
    error::{ApplicationError, AuthenticationFailure},
    repository::UserRepository,
};

/// 令牌校验由认证系统提供
pub trait TokenVerifier: Send + Sync {
    fn validate(&self, token: &str) -> bool;
    fn username_from_token(&self, token: &str) -> Option<String>;
}

/// 统一的调用者身份解析。
///
/// 优先使用显式传入的令牌（例如推送连接的查询参数），没有时回退到会话令牌
/// （例如 `Authorization` 头）。显式令牌无效时直接拒绝，不再尝试会话。
#[derive(Clone)]
pub struct IdentityResolver {
    verifier: Arc<dyn TokenVerifier>,
    users: Arc<dyn UserRepository>,
}

impl IdentityResolver {
    pub fn new(verifier: Arc<dyn TokenVerifier>, users: Arc<dyn UserRepository>) -> Self {
        Self { verifier, users }
    }

    pub async fn resolve(
        &self,
        token: Option<&str>,
        session_token: Option<&str>,
    ) -> Result<User, ApplicationError> {
        let token = non_blank(token)
            .or_else(|| non_blank(session_token))
            .ok_or(AuthenticationFailure::MissingCredentials)?;

        if !self.verifier.validate(token) {
            return Err(AuthenticationFailure::InvalidToken.into());
        }
        let username = self
            .verifier
            .username_from_token(token)
            .and_then(|name| Username::parse(name).ok())
            .ok_or(AuthenticationFailure::InvalidToken)?;

        match self.users.find_by_username(&username).await? {
            Some(user) => Ok(user),
            None => {
                debug!(username = %username, "token subject has no user record");
                Err(AuthenticationFailure::UnknownUser.into())
            }
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
