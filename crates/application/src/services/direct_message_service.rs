use std::sync::Arc;

use domain::{DomainError, MessageContent, User, Username};
use tracing::{debug, info};

use crate::{
    authorization::AuthorizationGuard,
    clock::Clock,
    conversations::ConversationAggregator,
    dto::{ConversationSummaryView, MessageView, PushedMessage},
    error::ApplicationError,
    identity::{IdentityResolver, TokenVerifier},
    live::{LiveConnection, LiveConnectionRegistry, LiveFrame},
    pagination::{Page, PageRequest},
    repository::{FollowRepository, MessageRepository, UserRepository},
    store::MessageStore,
};

pub struct DirectMessageServiceDependencies {
    pub message_repository: Arc<dyn MessageRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub follow_repository: Arc<dyn FollowRepository>,
    pub token_verifier: Arc<dyn TokenVerifier>,
    pub clock: Arc<dyn Clock>,
    pub registry: LiveConnectionRegistry,
}

/// 私信用例入口，HTTP 层只和它打交道。
pub struct DirectMessageService {
    store: MessageStore,
    guard: AuthorizationGuard,
    aggregator: ConversationAggregator,
    identity: IdentityResolver,
    users: Arc<dyn UserRepository>,
    registry: LiveConnectionRegistry,
}

impl DirectMessageService {
    pub fn new(deps: DirectMessageServiceDependencies) -> Self {
        let store = MessageStore::new(deps.message_repository, deps.clock);
        let guard = AuthorizationGuard::new(deps.follow_repository);
        let aggregator =
            ConversationAggregator::new(store.clone(), guard.clone(), deps.user_repository.clone());
        let identity = IdentityResolver::new(deps.token_verifier, deps.user_repository.clone());

        Self {
            store,
            guard,
            aggregator,
            identity,
            users: deps.user_repository,
            registry: deps.registry,
        }
    }

    pub fn registry(&self) -> &LiveConnectionRegistry {
        &self.registry
    }

    pub async fn resolve_identity(
        &self,
        token: Option<&str>,
        session_token: Option<&str>,
    ) -> Result<User, ApplicationError> {
        self.identity.resolve(token, session_token).await
    }

    async fn find_counterpart(&self, name: &str) -> Result<User, ApplicationError> {
        let username = Username::parse(name)?;
        self.users
            .find_by_username(&username)
            .await?
            .ok_or_else(|| DomainError::UserNotFound.into())
    }

    /// 发送私信并尽力推送给双方的在线连接。推送结果不影响返回值。
    pub async fn send(
        &self,
        me: &User,
        counterpart_name: &str,
        content: &str,
    ) -> Result<MessageView, ApplicationError> {
        let counterpart = self.find_counterpart(counterpart_name).await?;
        let content = MessageContent::new(content)?;
        self.guard.ensure_can_send(me.id, counterpart.id).await?;

        let stored = self.store.append_content(me.id, counterpart.id, content).await?;
        let view = MessageView::from_message(&stored, me.id);

        // 发送者自己的其他设备也能立即看到
        let mut delivered = self.registry.push(
            me.id,
            LiveFrame::Message(PushedMessage::new(&counterpart, view.clone())),
        );
        if counterpart.id != me.id {
            let their_view = MessageView::from_message(&stored, counterpart.id);
            delivered += self.registry.push(
                counterpart.id,
                LiveFrame::Message(PushedMessage::new(me, their_view)),
            );
        }

        info!(
            message_id = %stored.id,
            sender_id = %me.id,
            receiver_id = %counterpart.id,
            delivered,
            "direct message sent"
        );
        Ok(view)
    }

    pub async fn list_messages(
        &self,
        me: &User,
        counterpart_name: &str,
        request: PageRequest,
    ) -> Result<Page<MessageView>, ApplicationError> {
        let counterpart = self.find_counterpart(counterpart_name).await?;
        self.guard.ensure_can_view(me.id, counterpart.id).await?;

        let page = self.store.page_thread(me.id, counterpart.id, request).await?;
        Ok(page.map(|message| MessageView::from_message(&message, me.id)))
    }

    pub async fn list_conversations(
        &self,
        me: &User,
        request: PageRequest,
    ) -> Result<Vec<ConversationSummaryView>, ApplicationError> {
        let summaries = self.aggregator.list_conversations(me.id, request).await?;
        Ok(summaries.iter().map(ConversationSummaryView::from).collect())
    }

    /// 把与对方的会话标记为已读。只影响自己的收件方向，无需额外授权。
    pub async fn mark_read(
        &self,
        me: &User,
        counterpart_name: &str,
    ) -> Result<u64, ApplicationError> {
        let counterpart = self.find_counterpart(counterpart_name).await?;
        let changed = self.store.mark_thread_read(me.id, counterpart.id).await?;
        debug!(user_id = %me.id, counterpart_id = %counterpart.id, changed, "conversation marked read");
        Ok(changed)
    }

    /// 解析调用者身份并注册一个实时推送连接
    pub async fn subscribe(
        &self,
        token: Option<&str>,
        session_token: Option<&str>,
    ) -> Result<LiveConnection, ApplicationError> {
        let user = self.resolve_identity(token, session_token).await?;
        Ok(self.registry.register(user.id))
    }
}
