//! 私信系统核心领域模型
//!
//! 包含私信、用户、会话摘要等实体，以及基于关注关系的访问策略。

pub mod conversation;
pub mod errors;
pub mod message;
pub mod policy;
pub mod user;
pub mod value_objects;

// 重新导出常用类型
pub use conversation::ConversationSummary;
pub use errors::{DomainError, DomainResult, RepositoryError};
pub use message::{DirectMessage, NewDirectMessage};
pub use policy::FollowEdges;
pub use user::User;
pub use value_objects::{
    MessageContent, MessageId, Timestamp, UserId, Username, MAX_MESSAGE_LENGTH,
};
