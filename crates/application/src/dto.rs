use domain::{ConversationSummary, DirectMessage, Timestamp, User, UserId};
use serde::{Deserialize, Serialize};

/// 某个用户视角下的一条私信
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: i64,
    pub sender: UserId,
    pub receiver: UserId,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: Timestamp,
    pub from_me: bool,
    pub read: bool,
}

impl MessageView {
    pub fn from_message(message: &DirectMessage, viewer: UserId) -> Self {
        Self {
            id: message.id.0,
            sender: message.sender_id,
            receiver: message.receiver_id,
            content: message.content.as_str().to_owned(),
            created_at: message.created_at,
            from_me: message.is_from(viewer),
            read: message.is_read(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestMessageView {
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummaryView {
    /// 对方用户名
    pub partner: String,
    pub display_name: String,
    pub latest_message: LatestMessageView,
    pub unread_count: u64,
}

impl From<&ConversationSummary> for ConversationSummaryView {
    fn from(summary: &ConversationSummary) -> Self {
        Self {
            partner: summary.partner.username.as_str().to_owned(),
            display_name: summary.partner.display_name().to_owned(),
            latest_message: LatestMessageView {
                text: summary.latest_message.content.as_str().to_owned(),
                created_at: summary.latest_message.created_at,
            },
            unread_count: summary.unread_count,
        }
    }
}

/// 推送到实时连接的私信，`partner` 是相对接收方的对方用户名
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushedMessage {
    pub partner: String,
    pub message: MessageView,
}

impl PushedMessage {
    pub fn new(partner: &User, message: MessageView) -> Self {
        Self {
            partner: partner.username.as_str().to_owned(),
            message,
        }
    }
}
