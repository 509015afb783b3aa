use std::sync::Arc;

use ws_core::Manager;

use crate::auth::{TokenStore, UserData};
use crate::handler::GatewayHandler;

#[derive(Clone)]
pub struct AppState {
    pub manager: Manager<UserData, GatewayHandler>,
    pub tokens: Arc<TokenStore>,
}

impl AppState {
    pub fn new(manager: Manager<UserData, GatewayHandler>) -> Self {
        Self {
            manager,
            tokens: Arc::new(TokenStore::new()),
        }
    }
}
