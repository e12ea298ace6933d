use domain::{DomainError, RepositoryError};
use thiserror::Error;

/// 身份认证失败的具体原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthenticationFailure {
    #[error("no credentials supplied")]
    MissingCredentials,
    #[error("token is invalid or expired")]
    InvalidToken,
    #[error("token subject does not resolve to a user")]
    UnknownUser,
}

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("repository error: {0}")]
    Repository(RepositoryError),
    #[error("authentication failed: {0}")]
    Authentication(AuthenticationFailure),
}

impl ApplicationError {
    /// 请求参数校验失败（例如空消息）
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Domain(DomainError::InvalidArgument { .. }))
    }

    /// 已认证但无权执行该操作
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            Self::Domain(DomainError::SendNotAllowed | DomainError::ViewNotAllowed)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Domain(DomainError::UserNotFound) | Self::Repository(RepositoryError::NotFound)
        )
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        ApplicationError::Repository(value)
    }
}

impl From<AuthenticationFailure> for ApplicationError {
    fn from(value: AuthenticationFailure) -> Self {
        ApplicationError::Authentication(value)
    }
}
