use std::collections::HashMap;

use async_trait::async_trait;
use domain::{DirectMessage, NewDirectMessage, RepositoryError, Timestamp, User, UserId, Username};

/// 私信存储。追加写入，除已读时间外不修改历史记录。
#[async_trait]
pub trait MessageRepository: Send + Sync {
    // 持久化一条私信，由存储分配单调递增的 ID
    async fn insert(&self, message: NewDirectMessage) -> Result<DirectMessage, RepositoryError>;

    // 两人之间（双向）的私信，按新到旧排序
    async fn find_thread(
        &self,
        user_a: UserId,
        user_b: UserId,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<DirectMessage>, RepositoryError>;

    async fn count_thread(&self, user_a: UserId, user_b: UserId) -> Result<u64, RepositoryError>;

    // 用户发出或收到的全部私信，按新到旧排序
    async fn find_recent_for_user(
        &self,
        user_id: UserId,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<DirectMessage>, RepositoryError>;

    async fn count_for_user(&self, user_id: UserId) -> Result<u64, RepositoryError>;

    // 发给 receiver 且未读的私信数量，按发送者分组
    async fn count_unread_by_sender(
        &self,
        receiver_id: UserId,
    ) -> Result<HashMap<UserId, u64>, RepositoryError>;

    // 将 sender 发给 receiver 的未读私信标记为已读，返回受影响条数
    async fn mark_read(
        &self,
        receiver_id: UserId,
        sender_id: UserId,
        read_at: Timestamp,
    ) -> Result<u64, RepositoryError>;
}

/// 账号系统提供的只读用户查询。
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_username(&self, username: &Username) -> Result<Option<User>, RepositoryError>;
}

/// 社交关系系统提供的关注关系查询。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FollowRepository: Send + Sync {
    async fn is_following(
        &self,
        follower: UserId,
        followee: UserId,
    ) -> Result<bool, RepositoryError>;
}
