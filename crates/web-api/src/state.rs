use std::sync::Arc;
use std::time::Duration;

use application::{DirectMessageService, PagePolicy};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DirectMessageService>,
    pub page_policy: PagePolicy,
    /// SSE 保活注释的间隔
    pub keep_alive: Duration,
}

impl AppState {
    pub fn new(
        service: Arc<DirectMessageService>,
        page_policy: PagePolicy,
        keep_alive: Duration,
    ) -> Self {
        Self {
            service,
            page_policy,
            keep_alive,
        }
    }
}
