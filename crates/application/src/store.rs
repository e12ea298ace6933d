use std::collections::HashMap;
use std::sync::Arc;

use domain::{DirectMessage, MessageContent, NewDirectMessage, UserId};
use tracing::debug;

use crate::{
    clock::Clock,
    error::ApplicationError,
    pagination::{Page, PageRequest},
    repository::MessageRepository,
};

/// 私信日志：追加、分页读取与未读统计。
///
/// 不做任何权限判断，调用方需要先经过 [`crate::AuthorizationGuard`]。
#[derive(Clone)]
pub struct MessageStore {
    repository: Arc<dyn MessageRepository>,
    clock: Arc<dyn Clock>,
}

impl MessageStore {
    pub fn new(repository: Arc<dyn MessageRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    pub async fn append(
        &self,
        sender: UserId,
        receiver: UserId,
        content: &str,
    ) -> Result<DirectMessage, ApplicationError> {
        let content = MessageContent::new(content)?;
        self.append_content(sender, receiver, content).await
    }

    /// 追加一条已校验的私信，时间戳由服务端在写入时生成
    pub async fn append_content(
        &self,
        sender: UserId,
        receiver: UserId,
        content: MessageContent,
    ) -> Result<DirectMessage, ApplicationError> {
        let message = NewDirectMessage::new(sender, receiver, content, self.clock.now());
        let stored = self.repository.insert(message).await?;
        debug!(message_id = %stored.id, sender_id = %sender, receiver_id = %receiver, "direct message stored");
        Ok(stored)
    }

    /// 两人之间的历史消息。按新到旧取出，再翻转为时间正序返回。
    pub async fn page_thread(
        &self,
        user_a: UserId,
        user_b: UserId,
        request: PageRequest,
    ) -> Result<Page<DirectMessage>, ApplicationError> {
        let mut items = self
            .repository
            .find_thread(user_a, user_b, request.offset(), request.size)
            .await?;
        items.reverse();
        let total = self.repository.count_thread(user_a, user_b).await?;
        Ok(Page::new(items, request, total))
    }

    /// 用户最近的私信（所有对方），按新到旧
    pub async fn page_recent_for_user(
        &self,
        user: UserId,
        request: PageRequest,
    ) -> Result<Page<DirectMessage>, ApplicationError> {
        let items = self
            .repository
            .find_recent_for_user(user, request.offset(), request.size)
            .await?;
        let total = self.repository.count_for_user(user).await?;
        Ok(Page::new(items, request, total))
    }

    pub async fn count_unread_by_counterpart(
        &self,
        user: UserId,
    ) -> Result<HashMap<UserId, u64>, ApplicationError> {
        Ok(self.repository.count_unread_by_sender(user).await?)
    }

    /// 把 counterpart 发给 user 的未读消息标记为已读，返回本次变更的条数
    pub async fn mark_thread_read(
        &self,
        user: UserId,
        counterpart: UserId,
    ) -> Result<u64, ApplicationError> {
        let changed = self
            .repository
            .mark_read(user, counterpart, self.clock.now())
            .await?;
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::memory::MemoryMessageRepository;
    use uuid::Uuid;

    fn store() -> MessageStore {
        MessageStore::new(
            Arc::new(MemoryMessageRepository::default()),
            Arc::new(SystemClock),
        )
    }

    fn user() -> UserId {
        UserId::from(Uuid::new_v4())
    }

    #[tokio::test]
    async fn test_append_trims_and_leaves_unread() {
        let store = store();
        let (alice, bob) = (user(), user());

        let message = store.append(alice, bob, "  hello  ").await.unwrap();
        assert_eq!(message.content.as_str(), "hello");
        assert_eq!(message.read_at, None);
        assert_eq!(message.sender_id, alice);
        assert_eq!(message.receiver_id, bob);
    }

    #[tokio::test]
    async fn test_append_rejects_blank_content() {
        let store = store();
        let err = store.append(user(), user(), " \n ").await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_page_thread_is_chronological_within_page() {
        let store = store();
        let (alice, bob, carol) = (user(), user(), user());

        for i in 0..5 {
            let (from, to) = if i % 2 == 0 { (alice, bob) } else { (bob, alice) };
            store.append(from, to, &format!("m{i}")).await.unwrap();
        }
        store.append(alice, carol, "elsewhere").await.unwrap();

        // 第 0 页是最近的 3 条，按时间正序
        let first = store
            .page_thread(alice, bob, PageRequest::new(0, 3))
            .await
            .unwrap();
        let texts: Vec<_> = first.items.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(texts, vec!["m2", "m3", "m4"]);
        assert_eq!(first.total_items, 5);
        assert!(first.has_next);

        let second = store
            .page_thread(bob, alice, PageRequest::new(1, 3))
            .await
            .unwrap();
        let texts: Vec<_> = second.items.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(texts, vec!["m0", "m1"]);
        assert!(!second.has_next);
    }

    #[tokio::test]
    async fn test_recent_for_user_is_newest_first() {
        let store = store();
        let (alice, bob, carol) = (user(), user(), user());
        store.append(alice, bob, "first").await.unwrap();
        store.append(carol, alice, "second").await.unwrap();
        store.append(bob, carol, "unrelated").await.unwrap();

        let page = store
            .page_recent_for_user(alice, PageRequest::new(0, 10))
            .await
            .unwrap();
        let texts: Vec<_> = page.items.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(texts, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_mark_thread_read_is_directional_and_idempotent() {
        let store = store();
        let (alice, bob) = (user(), user());
        store.append(alice, bob, "one").await.unwrap();
        store.append(alice, bob, "two").await.unwrap();
        store.append(bob, alice, "reply").await.unwrap();

        let unread = store.count_unread_by_counterpart(bob).await.unwrap();
        assert_eq!(unread.get(&alice), Some(&2));

        assert_eq!(store.mark_thread_read(bob, alice).await.unwrap(), 2);
        assert_eq!(store.mark_thread_read(bob, alice).await.unwrap(), 0);

        let unread = store.count_unread_by_counterpart(bob).await.unwrap();
        assert_eq!(unread.get(&alice).copied().unwrap_or(0), 0);

        // 对方方向的未读不受影响
        let unread = store.count_unread_by_counterpart(alice).await.unwrap();
        assert_eq!(unread.get(&bob), Some(&1));
    }
}
