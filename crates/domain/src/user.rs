use crate::value_objects::{UserId, Username};

/// 由账号系统提供的用户信息，私信系统只读使用。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    pub display_name: Option<String>,
}

impl User {
    pub fn new(id: UserId, username: Username, display_name: Option<String>) -> Self {
        Self {
            id,
            username,
            display_name,
        }
    }

    /// 展示名称：有非空昵称时使用昵称，否则回退到用户名。
    pub fn display_name(&self) -> &str {
        match self.display_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => self.username.as_str(),
        }
    }
}
