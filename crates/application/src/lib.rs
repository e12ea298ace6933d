//! 应用层实现。
//!
//! 围绕私信领域模型提供用例服务：消息存储、基于关注关系的授权、会话聚合、
//! 实时推送连接管理，以及对外部协作方（账号、关注关系、令牌校验）的抽象。

pub mod authorization;
pub mod clock;
pub mod conversations;
pub mod dto;
pub mod error;
pub mod identity;
pub mod live;
pub mod memory;
pub mod pagination;
pub mod repository;
pub mod services;
pub mod store;

pub use authorization::AuthorizationGuard;
pub use clock::{Clock, SystemClock};
pub use conversations::ConversationAggregator;
pub use dto::{ConversationSummaryView, LatestMessageView, MessageView, PushedMessage};
pub use error::{ApplicationError, AuthenticationFailure};
pub use identity::{IdentityResolver, TokenVerifier};
pub use live::{ConnectionId, ConnectionState, LiveConnection, LiveConnectionRegistry, LiveFrame};
pub use pagination::{Page, PagePolicy, PageRequest};
pub use repository::{FollowRepository, MessageRepository, UserRepository};
pub use services::{DirectMessageService, DirectMessageServiceDependencies};
pub use store::MessageStore;
