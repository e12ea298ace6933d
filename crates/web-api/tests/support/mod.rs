use std::{sync::Arc, time::Duration};

use application::{
    memory::{MemoryFollowRepository, MemoryMessageRepository, MemoryUserRepository},
    DirectMessageService, DirectMessageServiceDependencies, LiveConnectionRegistry, PagePolicy,
    SystemClock,
};
use domain::{User, UserId, Username};
use tokio::{net::TcpListener, sync::oneshot, time::sleep};
use uuid::Uuid;
use web_api::{router, AppState, JwtConfig, JwtService};

pub const TEST_SECRET: &str = "web-api-test-secret-with-at-least-32-chars";

pub struct TestApp {
    pub base_url: String,
    pub users: Arc<MemoryUserRepository>,
    pub follows: Arc<MemoryFollowRepository>,
    pub registry: LiveConnectionRegistry,
    pub jwt: Arc<JwtService>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestApp {
    pub async fn user(&self, name: &str) -> User {
        let user = User::new(
            UserId::from(Uuid::new_v4()),
            Username::parse(name).unwrap(),
            None,
        );
        self.users.insert(user.clone()).await;
        user
    }

    pub async fn follow(&self, follower: &User, followee: &User) {
        self.follows.follow(follower.id, followee.id).await;
    }

    pub fn token_for(&self, user: &User) -> String {
        self.jwt.generate_token(&user.username).expect("token")
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// 在随机端口上启动完整的路由，后端使用内存仓储
pub async fn spawn_app() -> TestApp {
    let users = Arc::new(MemoryUserRepository::default());
    let follows = Arc::new(MemoryFollowRepository::default());
    let registry = LiveConnectionRegistry::new(Duration::from_secs(60), 16);
    let jwt = Arc::new(JwtService::new(JwtConfig {
        secret: TEST_SECRET.to_string(),
        expiration_hours: 1,
    }));

    let service = DirectMessageService::new(DirectMessageServiceDependencies {
        message_repository: Arc::new(MemoryMessageRepository::default()),
        user_repository: users.clone(),
        follow_repository: follows.clone(),
        token_verifier: jwt.clone(),
        clock: Arc::new(SystemClock),
        registry: registry.clone(),
    });
    let state = AppState::new(
        Arc::new(service),
        PagePolicy::new(20, 100),
        Duration::from_millis(100),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, router(state).into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .ok();
    });

    // 等待服务器启动
    sleep(Duration::from_millis(50)).await;

    TestApp {
        base_url: format!("http://{}", addr),
        users,
        follows,
        registry,
        jwt,
        shutdown: Some(shutdown_tx),
    }
}
