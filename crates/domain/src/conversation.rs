use crate::message::DirectMessage;
use crate::user::User;

/// 某个用户视角下与一位对方的会话摘要：最近一条私信加未读数。
///
/// 会话不单独存储，每次从私信记录推导。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub partner: User,
    pub latest_message: DirectMessage,
    pub unread_count: u64,
}
