use crate::value_objects::{MessageContent, MessageId, Timestamp, UserId};

/// 待持久化的私信，ID 由存储层分配。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDirectMessage {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: MessageContent,
    pub created_at: Timestamp,
}

impl NewDirectMessage {
    pub fn new(
        sender_id: UserId,
        receiver_id: UserId,
        content: MessageContent,
        created_at: Timestamp,
    ) -> Self {
        Self {
            sender_id,
            receiver_id,
            content,
            created_at,
        }
    }

    /// 附上存储层分配的 ID，得到完整的私信记录。
    pub fn into_stored(self, id: MessageId) -> DirectMessage {
        DirectMessage {
            id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            content: self.content,
            created_at: self.created_at,
            read_at: None,
        }
    }
}

/// 两个用户之间的一条私信。
///
/// 除 `read_at` 外创建后不可变；`read_at` 只会被设置一次，之后不会回到未读。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectMessage {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: MessageContent,
    pub created_at: Timestamp,
    pub read_at: Option<Timestamp>,
}

impl DirectMessage {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }

    pub fn is_from(&self, user_id: UserId) -> bool {
        self.sender_id == user_id
    }

    pub fn involves(&self, user_id: UserId) -> bool {
        self.sender_id == user_id || self.receiver_id == user_id
    }

    /// 从 `viewer` 的角度看，这条私信的对方是谁。
    pub fn counterpart_of(&self, viewer: UserId) -> UserId {
        if self.sender_id == viewer {
            self.receiver_id
        } else {
            self.sender_id
        }
    }

    /// 标记为已读，已读过的消息保持原有时间。返回本次是否发生变更。
    pub fn mark_read(&mut self, at: Timestamp) -> bool {
        if self.read_at.is_some() {
            return false;
        }
        self.read_at = Some(at);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Duration, OffsetDateTime};
    use uuid::Uuid;

    fn sample(sender: UserId, receiver: UserId) -> DirectMessage {
        NewDirectMessage::new(
            sender,
            receiver,
            MessageContent::new("hi").unwrap(),
            OffsetDateTime::now_utc(),
        )
        .into_stored(MessageId::new(1))
    }

    #[test]
    fn test_new_message_is_unread() {
        let message = sample(UserId::from(Uuid::new_v4()), UserId::from(Uuid::new_v4()));
        assert!(!message.is_read());
        assert_eq!(message.id, MessageId::new(1));
    }

    #[test]
    fn test_counterpart_depends_on_viewer() {
        let alice = UserId::from(Uuid::new_v4());
        let bob = UserId::from(Uuid::new_v4());
        let message = sample(alice, bob);

        assert_eq!(message.counterpart_of(alice), bob);
        assert_eq!(message.counterpart_of(bob), alice);
        assert!(message.is_from(alice));
        assert!(message.involves(bob));
        assert!(!message.involves(UserId::from(Uuid::new_v4())));
    }

    #[test]
    fn test_self_message_counterpart_is_self() {
        let alice = UserId::from(Uuid::new_v4());
        let message = sample(alice, alice);
        assert_eq!(message.counterpart_of(alice), alice);
    }

    #[test]
    fn test_mark_read_only_once() {
        let mut message = sample(UserId::from(Uuid::new_v4()), UserId::from(Uuid::new_v4()));
        let first = OffsetDateTime::now_utc();

        assert!(message.mark_read(first));
        assert!(!message.mark_read(first + Duration::minutes(5)));
        assert_eq!(message.read_at, Some(first));
    }
}
