use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use application::repository::{FollowRepository, MessageRepository, UserRepository};
use async_trait::async_trait;
use config::DatabaseConfig;
use domain::{
    DirectMessage, MessageContent, MessageId, NewDirectMessage, RepositoryError, Timestamp, User,
    UserId, Username,
};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    match err {
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => RepositoryError::Conflict,
        other => RepositoryError::storage(other.to_string()),
    }
}

fn invalid_data(message: impl Into<String>) -> RepositoryError {
    RepositoryError::storage(message)
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

#[derive(Debug, FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    display_name: Option<String>,
}

impl TryFrom<UserRecord> for User {
    type Error = RepositoryError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        let username = Username::parse(value.username).map_err(|err| invalid_data(err.to_string()))?;
        Ok(User::new(UserId::from(value.id), username, value.display_name))
    }
}

#[derive(Debug, FromRow)]
struct MessageRecord {
    id: i64,
    sender_id: Uuid,
    receiver_id: Uuid,
    content: String,
    created_at: OffsetDateTime,
    read_at: Option<OffsetDateTime>,
}

impl TryFrom<MessageRecord> for DirectMessage {
    type Error = RepositoryError;

    fn try_from(value: MessageRecord) -> Result<Self, Self::Error> {
        let content =
            MessageContent::new(value.content).map_err(|err| invalid_data(err.to_string()))?;
        Ok(DirectMessage {
            id: MessageId::from(value.id),
            sender_id: UserId::from(value.sender_id),
            receiver_id: UserId::from(value.receiver_id),
            content,
            created_at: value.created_at,
            read_at: value.read_at,
        })
    }
}

fn into_messages(records: Vec<MessageRecord>) -> Result<Vec<DirectMessage>, RepositoryError> {
    records.into_iter().map(DirectMessage::try_from).collect()
}

#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn insert(&self, message: NewDirectMessage) -> Result<DirectMessage, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            INSERT INTO direct_messages (sender_id, receiver_id, content, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, sender_id, receiver_id, content, created_at, read_at
            "#,
        )
        .bind(Uuid::from(message.sender_id))
        .bind(Uuid::from(message.receiver_id))
        .bind(message.content.as_str())
        .bind(message.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        DirectMessage::try_from(record)
    }

    async fn find_thread(
        &self,
        user_a: UserId,
        user_b: UserId,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<DirectMessage>, RepositoryError> {
        let records = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, sender_id, receiver_id, content, created_at, read_at
            FROM direct_messages
            WHERE (sender_id = $1 AND receiver_id = $2)
               OR (sender_id = $2 AND receiver_id = $1)
            ORDER BY id DESC
            OFFSET $3
            LIMIT $4
            "#,
        )
        .bind(Uuid::from(user_a))
        .bind(Uuid::from(user_b))
        .bind(to_i64(offset))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        into_messages(records)
    }

    async fn count_thread(&self, user_a: UserId, user_b: UserId) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM direct_messages
            WHERE (sender_id = $1 AND receiver_id = $2)
               OR (sender_id = $2 AND receiver_id = $1)
            "#,
        )
        .bind(Uuid::from(user_a))
        .bind(Uuid::from(user_b))
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(to_u64(count))
    }

    async fn find_recent_for_user(
        &self,
        user_id: UserId,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<DirectMessage>, RepositoryError> {
        let records = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, sender_id, receiver_id, content, created_at, read_at
            FROM direct_messages
            WHERE sender_id = $1 OR receiver_id = $1
            ORDER BY id DESC
            OFFSET $2
            LIMIT $3
            "#,
        )
        .bind(Uuid::from(user_id))
        .bind(to_i64(offset))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        into_messages(records)
    }

    async fn count_for_user(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM direct_messages WHERE sender_id = $1 OR receiver_id = $1",
        )
        .bind(Uuid::from(user_id))
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(to_u64(count))
    }

    async fn count_unread_by_sender(
        &self,
        receiver_id: UserId,
    ) -> Result<HashMap<UserId, u64>, RepositoryError> {
        let rows = sqlx::query_as::<_, (Uuid, i64)>(
            r#"
            SELECT sender_id, COUNT(*)
            FROM direct_messages
            WHERE receiver_id = $1 AND read_at IS NULL
            GROUP BY sender_id
            "#,
        )
        .bind(Uuid::from(receiver_id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(rows
            .into_iter()
            .map(|(sender_id, count)| (UserId::from(sender_id), to_u64(count)))
            .collect())
    }

    async fn mark_read(
        &self,
        receiver_id: UserId,
        sender_id: UserId,
        read_at: Timestamp,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE direct_messages
            SET read_at = $3
            WHERE receiver_id = $1 AND sender_id = $2 AND read_at IS NULL
            "#,
        )
        .bind(Uuid::from(receiver_id))
        .bind(Uuid::from(sender_id))
        .bind(read_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(result.rows_affected())
    }
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, display_name FROM users WHERE id = $1",
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }

    async fn find_by_username(&self, username: &Username) -> Result<Option<User>, RepositoryError> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, display_name FROM users WHERE username = $1",
        )
        .bind(username.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(User::try_from).transpose()
    }
}

#[derive(Clone)]
pub struct PgFollowRepository {
    pool: PgPool,
}

impl PgFollowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FollowRepository for PgFollowRepository {
    async fn is_following(
        &self,
        follower: UserId,
        followee: UserId,
    ) -> Result<bool, RepositoryError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = $1 AND followee_id = $2)",
        )
        .bind(Uuid::from(follower))
        .bind(Uuid::from(followee))
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)
    }
}

/// 聚合所有 PostgreSQL 仓储
#[derive(Clone)]
pub struct PgStorage {
    pub message_repository: Arc<PgMessageRepository>,
    pub user_repository: Arc<PgUserRepository>,
    pub follow_repository: Arc<PgFollowRepository>,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self {
            message_repository: Arc::new(PgMessageRepository::new(pool.clone())),
            user_repository: Arc::new(PgUserRepository::new(pool.clone())),
            follow_repository: Arc::new(PgFollowRepository::new(pool)),
        }
    }
}

pub async fn create_pg_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let mut options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections.min(config.max_connections));
    if config.acquire_timeout_seconds > 0 {
        options = options.acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds));
    }
    options.connect(&config.url).await
}
