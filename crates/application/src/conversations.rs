use std::collections::HashSet;
use std::sync::Arc;

use domain::{ConversationSummary, UserId};
use tracing::warn;

use crate::{
    authorization::AuthorizationGuard, error::ApplicationError, pagination::PageRequest,
    repository::UserRepository, store::MessageStore,
};

/// 会话列表聚合。
///
/// 只看请求窗口内的最近消息：一个会话如果所有消息都落在窗口之外，就不会出现在结果里。
/// 需要完整列表时由调用方增大 `page`/`size` 继续翻页。
#[derive(Clone)]
pub struct ConversationAggregator {
    store: MessageStore,
    guard: AuthorizationGuard,
    users: Arc<dyn UserRepository>,
}

impl ConversationAggregator {
    pub fn new(
        store: MessageStore,
        guard: AuthorizationGuard,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            store,
            guard,
            users,
        }
    }

    pub async fn list_conversations(
        &self,
        user: UserId,
        request: PageRequest,
    ) -> Result<Vec<ConversationSummary>, ApplicationError> {
        let window = self.store.page_recent_for_user(user, request).await?;
        let unread = self.store.count_unread_by_counterpart(user).await?;

        let mut seen = HashSet::new();
        let mut summaries = Vec::new();
        for message in window.items {
            let counterpart = message.counterpart_of(user);
            // 第一次出现的就是最近的一条
            if !seen.insert(counterpart) {
                continue;
            }
            if !self.guard.can_view(user, counterpart).await? {
                continue;
            }
            let Some(partner) = self.users.find_by_id(counterpart).await? else {
                warn!(user_id = %user, counterpart_id = %counterpart, "conversation partner no longer exists");
                continue;
            };

            summaries.push(ConversationSummary {
                partner,
                unread_count: unread.get(&counterpart).copied().unwrap_or(0),
                latest_message: message,
            });
        }

        Ok(summaries)
    }
}
