mod direct_message_service;

pub use direct_message_service::{DirectMessageService, DirectMessageServiceDependencies};
