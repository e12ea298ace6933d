//! JWT 认证模块
//!
//! 提供 JWT token 生成、验证，以及从请求中解析当前用户。

use application::TokenVerifier;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use config::JwtConfig;
use domain::{User, Username};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{error::ApiError, state::AppState};

/// JWT Claims 结构，`sub` 为用户名
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64, // 过期时间 (Unix timestamp)
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("token generation failed: {0}")]
    Encode(jsonwebtoken::errors::Error),
    #[error("invalid token: {0}")]
    Decode(jsonwebtoken::errors::Error),
}

/// JWT Token 服务
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_ref());
        let decoding_key = DecodingKey::from_secret(config.secret.as_ref());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// 生成 JWT token
    pub fn generate_token(&self, username: &Username) -> Result<String, JwtError> {
        let exp = OffsetDateTime::now_utc() + Duration::hours(self.config.expiration_hours);
        let claims = Claims {
            sub: username.as_str().to_owned(),
            exp: exp.unix_timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(JwtError::Encode)
    }

    /// 验证并解析 JWT token
    pub fn verify_token(&self, token: &str) -> Result<Claims, JwtError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|token_data| token_data.claims)
            .map_err(JwtError::Decode)
    }
}

impl TokenVerifier for JwtService {
    fn validate(&self, token: &str) -> bool {
        self.verify_token(token).is_ok()
    }

    fn username_from_token(&self, token: &str) -> Option<String> {
        self.verify_token(token).ok().map(|claims| claims.sub)
    }
}

/// 从 `Authorization: Bearer <token>` 头中取出 token
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// 已认证的当前用户
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = state
            .service
            .resolve_identity(None, bearer_token(&parts.headers))
            .await?;
        Ok(CurrentUser(user))
    }
}
