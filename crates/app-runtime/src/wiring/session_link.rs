//! Adapter from the synchronizers' outbound session port to the session
//! manager.

use std::sync::Arc;

use async_trait::async_trait;
use cs_01_session_manager::{SessionApi, SessionManager};
use cs_02_entity_sync::SessionLink;

/// Implements [`SessionLink`] on top of the instance's [`SessionManager`].
pub struct SessionBridge {
    session: Arc<SessionManager>,
}

impl SessionBridge {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl SessionLink for SessionBridge {
    async fn refresh(&self) -> bool {
        SessionApi::refresh(self.session.as_ref()).await
    }

    async fn signal_unauthorized(&self, operation: &str) {
        self.session.handle_unauthorized(operation).await;
    }
}
