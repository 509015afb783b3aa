use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;
use ws_core::{Manager, MessageHandler};

#[derive(Deserialize)]
struct ConnQuery {
    user_id: i64,
}

struct TestState<U, H> {
    manager: Manager<U, H>,
    make_user_data: Arc<dyn Fn(i64) -> U + Send + Sync>,
}

impl<U, H> Clone for TestState<U, H> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            make_user_data: Arc::clone(&self.make_user_data),
        }
    }
}

/// Boots a minimal axum server around `manager` for integration tests.
/// Connections authenticate via a `?user_id=` query parameter instead of
/// a real token; `make_user_data` builds the per-connection user value
/// from that id. Returns the bound address once the listener is live.
pub async fn spawn_test_server<U, H>(manager: Manager<U, H>, make_user_data: impl Fn(i64) -> U + Send + Sync + 'static) -> SocketAddr
where
    U: Send + Sync + 'static,
    H: MessageHandler<U> + Send + Sync + 'static,
{
    let state = TestState {
        manager,
        make_user_data: Arc::new(make_user_data),
    };
    let router = Router::new().route("/ws", get(upgrade::<U, H>)).with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

async fn upgrade<U, H>(State(state): State<TestState<U, H>>, Query(conn): Query<ConnQuery>, ws: WebSocketUpgrade) -> Response
where
    U: Send + Sync + 'static,
    H: MessageHandler<U> + Send + Sync + 'static,
{
    let user_data = (state.make_user_data)(conn.user_id);
    ws.on_upgrade(move |socket| async move {
        state.manager.handle_socket(socket, conn.user_id, user_data).await;
    })
}
