//! 内存实现的仓储，用于测试。

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use domain::{
    DirectMessage, MessageId, NewDirectMessage, RepositoryError, Timestamp, User, UserId, Username,
};
use tokio::sync::RwLock;

use crate::repository::{FollowRepository, MessageRepository, UserRepository};

#[derive(Default)]
struct MessageLog {
    next_id: i64,
    // 按插入顺序保存，ID 单调递增
    messages: Vec<DirectMessage>,
}

#[derive(Default)]
pub struct MemoryMessageRepository {
    log: RwLock<MessageLog>,
}

fn between(message: &DirectMessage, a: UserId, b: UserId) -> bool {
    (message.sender_id == a && message.receiver_id == b)
        || (message.sender_id == b && message.receiver_id == a)
}

fn window(
    newest_first: impl Iterator<Item = DirectMessage>,
    offset: u64,
    limit: u32,
) -> Vec<DirectMessage> {
    newest_first
        .skip(usize::try_from(offset).unwrap_or(usize::MAX))
        .take(limit as usize)
        .collect()
}

#[async_trait]
impl MessageRepository for MemoryMessageRepository {
    async fn insert(&self, message: NewDirectMessage) -> Result<DirectMessage, RepositoryError> {
        let mut log = self.log.write().await;
        log.next_id += 1;
        let stored = message.into_stored(MessageId::new(log.next_id));
        log.messages.push(stored.clone());
        Ok(stored)
    }

    async fn find_thread(
        &self,
        user_a: UserId,
        user_b: UserId,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<DirectMessage>, RepositoryError> {
        let log = self.log.read().await;
        let matching = log
            .messages
            .iter()
            .rev()
            .filter(|m| between(m, user_a, user_b))
            .cloned();
        Ok(window(matching, offset, limit))
    }

    async fn count_thread(&self, user_a: UserId, user_b: UserId) -> Result<u64, RepositoryError> {
        let log = self.log.read().await;
        Ok(log
            .messages
            .iter()
            .filter(|m| between(m, user_a, user_b))
            .count() as u64)
    }

    async fn find_recent_for_user(
        &self,
        user_id: UserId,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<DirectMessage>, RepositoryError> {
        let log = self.log.read().await;
        let matching = log
            .messages
            .iter()
            .rev()
            .filter(|m| m.involves(user_id))
            .cloned();
        Ok(window(matching, offset, limit))
    }

    async fn count_for_user(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let log = self.log.read().await;
        Ok(log.messages.iter().filter(|m| m.involves(user_id)).count() as u64)
    }

    async fn count_unread_by_sender(
        &self,
        receiver_id: UserId,
    ) -> Result<HashMap<UserId, u64>, RepositoryError> {
        let log = self.log.read().await;
        let mut counts = HashMap::new();
        for message in log
            .messages
            .iter()
            .filter(|m| m.receiver_id == receiver_id && !m.is_read())
        {
            *counts.entry(message.sender_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn mark_read(
        &self,
        receiver_id: UserId,
        sender_id: UserId,
        read_at: Timestamp,
    ) -> Result<u64, RepositoryError> {
        let mut log = self.log.write().await;
        let changed = log
            .messages
            .iter_mut()
            .filter(|m| m.receiver_id == receiver_id && m.sender_id == sender_id)
            .map(|m| m.mark_read(read_at))
            .filter(|changed| *changed)
            .count();
        Ok(changed as u64)
    }
}

#[derive(Default)]
pub struct MemoryUserRepository {
    users: RwLock<HashMap<UserId, User>>,
}

impl MemoryUserRepository {
    pub async fn insert(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &Username) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| &user.username == username)
            .cloned())
    }
}

/// 关注关系：(follower, followee) 集合
#[derive(Default)]
pub struct MemoryFollowRepository {
    edges: RwLock<HashSet<(UserId, UserId)>>,
}

impl MemoryFollowRepository {
    pub async fn follow(&self, follower: UserId, followee: UserId) {
        self.edges.write().await.insert((follower, followee));
    }

    pub async fn unfollow(&self, follower: UserId, followee: UserId) {
        self.edges.write().await.remove(&(follower, followee));
    }
}

#[async_trait]
impl FollowRepository for MemoryFollowRepository {
    async fn is_following(
        &self,
        follower: UserId,
        followee: UserId,
    ) -> Result<bool, RepositoryError> {
        Ok(self.edges.read().await.contains(&(follower, followee)))
    }
}
