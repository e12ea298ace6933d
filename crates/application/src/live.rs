//! 实时推送连接管理
//!
//! 每个用户可以同时持有多个长连接（多设备、多标签页）。注册表只保存每个连接的
//! 有界发送端，推送是非阻塞入队，真正的网络写由持有 [`LiveConnection`] 的任务完成。
//!
//! 锁只保护内存中的映射，不跨越任何 I/O。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use domain::UserId;
use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dto::PushedMessage;

/// 默认连接存活上限
pub const DEFAULT_CONNECTION_TTL: Duration = Duration::from_secs(30 * 60);
/// 默认每个连接的缓冲帧数
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// 推送到客户端的一帧
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveFrame {
    /// 连接建立后的确认帧
    Ping,
    Message(PushedMessage),
}

impl LiveFrame {
    pub fn event_name(&self) -> &'static str {
        match self {
            LiveFrame::Ping => "ping",
            LiveFrame::Message(_) => "message",
        }
    }

    pub fn data(&self) -> Result<String, serde_json::Error> {
        match self {
            LiveFrame::Ping => Ok("connected".to_owned()),
            LiveFrame::Message(pushed) => serde_json::to_string(pushed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 连接状态：Open -> Streaming -> Closed，Closed 为终态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Streaming,
    Closed,
}

type ConnectionMap = HashMap<UserId, HashMap<ConnectionId, mpsc::Sender<LiveFrame>>>;

struct RegistryInner {
    connections: Mutex<ConnectionMap>,
    connection_ttl: Duration,
    channel_capacity: usize,
}

/// 用户到在线连接集合的并发安全映射。
///
/// 克隆共享同一份状态；测试可以各自创建独立实例。
#[derive(Clone)]
pub struct LiveConnectionRegistry {
    inner: Arc<RegistryInner>,
}

impl Default for LiveConnectionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECTION_TTL, DEFAULT_CHANNEL_CAPACITY)
    }
}

impl LiveConnectionRegistry {
    pub fn new(connection_ttl: Duration, channel_capacity: usize) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                connections: Mutex::new(HashMap::new()),
                connection_ttl,
                channel_capacity: channel_capacity.max(1),
            }),
        }
    }

    /// 为用户注册一个新连接，并立即排入一个确认帧
    pub fn register(&self, user_id: UserId) -> LiveConnection {
        let id = ConnectionId::generate();
        let (sender, receiver) = mpsc::channel(self.inner.channel_capacity);
        // 新通道容量至少为 1，确认帧一定能入队
        let _ = sender.try_send(LiveFrame::Ping);

        let total_for_user = {
            let mut connections = self.inner.connections.lock();
            let user_connections = connections.entry(user_id).or_default();
            user_connections.insert(id, sender);
            user_connections.len()
        };

        info!(user_id = %user_id, connection_id = %id, total_for_user, "live connection registered");

        LiveConnection {
            id,
            user_id,
            receiver,
            registry: self.clone(),
            deadline: Instant::now() + self.inner.connection_ttl,
            state: ConnectionState::Open,
        }
    }

    /// 尽力推送到用户的所有连接，返回成功入队的连接数。
    ///
    /// 某个连接写入失败（已断开或缓冲已满）时只移除该连接，不影响其他连接。
    pub fn push(&self, user_id: UserId, frame: LiveFrame) -> usize {
        let targets: Vec<(ConnectionId, mpsc::Sender<LiveFrame>)> = {
            let connections = self.inner.connections.lock();
            match connections.get(&user_id) {
                Some(user_connections) => user_connections
                    .iter()
                    .map(|(id, sender)| (*id, sender.clone()))
                    .collect(),
                None => return 0,
            }
        };

        let mut delivered = 0;
        for (connection_id, sender) in targets {
            match sender.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(user_id = %user_id, connection_id = %connection_id, "live connection buffer full, dropping connection");
                    self.unregister(user_id, connection_id);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(user_id = %user_id, connection_id = %connection_id, "live connection already gone");
                    self.unregister(user_id, connection_id);
                }
            }
        }

        debug!(user_id = %user_id, delivered, event = frame.event_name(), "live push finished");
        delivered
    }

    /// 幂等移除，返回本次是否真的移除了连接
    pub fn unregister(&self, user_id: UserId, connection_id: ConnectionId) -> bool {
        let removed = {
            let mut connections = self.inner.connections.lock();
            let Some(user_connections) = connections.get_mut(&user_id) else {
                return false;
            };
            let removed = user_connections.remove(&connection_id).is_some();
            if user_connections.is_empty() {
                connections.remove(&user_id);
            }
            removed
        };

        if removed {
            info!(user_id = %user_id, connection_id = %connection_id, "live connection unregistered");
        }
        removed
    }

    pub fn connection_count(&self, user_id: UserId) -> usize {
        self.inner
            .connections
            .lock()
            .get(&user_id)
            .map_or(0, HashMap::len)
    }

    pub fn total_connections(&self) -> usize {
        self.inner.connections.lock().values().map(HashMap::len).sum()
    }

    pub fn connection_ttl(&self) -> Duration {
        self.inner.connection_ttl
    }
}

/// 一个已注册的推送连接。
///
/// 正常结束、到达存活上限或被丢弃（传输层出错时流会被丢弃）都会从注册表中注销。
pub struct LiveConnection {
    id: ConnectionId,
    user_id: UserId,
    receiver: mpsc::Receiver<LiveFrame>,
    registry: LiveConnectionRegistry,
    deadline: Instant,
    state: ConnectionState,
}

impl LiveConnection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// 等待下一帧；连接关闭或超时后返回 `None`
    pub async fn next_frame(&mut self) -> Option<LiveFrame> {
        if self.state == ConnectionState::Closed {
            return None;
        }

        match tokio::time::timeout_at(self.deadline, self.receiver.recv()).await {
            Ok(Some(frame)) => {
                self.state = ConnectionState::Streaming;
                Some(frame)
            }
            Ok(None) => {
                debug!(user_id = %self.user_id, connection_id = %self.id, "live connection dropped by registry");
                self.close();
                None
            }
            Err(_) => {
                debug!(user_id = %self.user_id, connection_id = %self.id, "live connection reached its lifetime ceiling");
                self.close();
                None
            }
        }
    }

    pub fn close(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }
        self.state = ConnectionState::Closed;
        self.registry.unregister(self.user_id, self.id);
        self.receiver.close();
    }

    pub fn into_stream(self) -> impl Stream<Item = LiveFrame> + Send + 'static {
        futures::stream::unfold(self, |mut connection| async move {
            connection
                .next_frame()
                .await
                .map(|frame| (frame, connection))
        })
    }
}

impl Drop for LiveConnection {
    fn drop(&mut self) {
        self.close();
    }
}
