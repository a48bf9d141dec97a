/// Axum webserver lifecycle: bind, serve, graceful termination
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::{
    logger::{self, LogTag},
    webserver::{routes, state::AppState},
};

/// Bind `addr` and serve until `shutdown` resolves
pub async fn start_server<F>(
    state: Arc<AppState>,
    addr: SocketAddr,
    shutdown: F,
) -> Result<(), String>
where
    F: Future<Output = ()> + Send + 'static,
{
    logger::debug(
        LogTag::Webserver,
        &format!("Starting webserver on {}", addr),
    );

    let listener = TcpListener::bind(&addr).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::AddrInUse => format!(
            "Failed to bind to {}: Address already in use\n\
             \n\
             Another process (possibly another device-tracker instance) holds this port.\n\
             Stop it or start with --port <n>.",
            addr
        ),
        std::io::ErrorKind::PermissionDenied => format!(
            "Failed to bind to {}: Permission denied\n\
             \n\
             Port {} requires elevated privileges on this system.\n\
             Consider using a port above 1024 or running with appropriate permissions.",
            addr,
            addr.port()
        ),
        _ => format!("Failed to bind to {}: {}", addr, e),
    })?;

    serve(listener, state, shutdown).await
}

/// Serve on an already bound listener
///
/// Blocks until `shutdown` resolves and in-flight requests have drained.
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> Result<(), String>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener
        .local_addr()
        .map_err(|e| format!("Listener has no local address: {}", e))?;
    let app = routes::create_router(state);

    logger::info(
        LogTag::Webserver,
        &format!("Webserver listening on http://{}", addr),
    );
    logger::debug(
        LogTag::Webserver,
        &format!("Real-time updates available at ws://{}/ws", addr),
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            logger::debug(
                LogTag::Webserver,
                "Received shutdown signal, stopping webserver...",
            );
        })
        .await
        .map_err(|e| format!("Server error: {}", e))?;

    logger::info(LogTag::Webserver, "Webserver stopped gracefully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::BroadcastHub;
    use crate::config::{AuthConfig, BroadcastConfig};
    use crate::devices::{DeviceRegistry, DeviceStore, NewDevice};
    use futures::StreamExt;
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tokio::time::timeout;
    use tokio_tungstenite::tungstenite::{self, Message};

    struct Running {
        addr: SocketAddr,
        state: Arc<AppState>,
        stop: oneshot::Sender<()>,
        server: tokio::task::JoinHandle<Result<(), String>>,
    }

    async fn spawn_server() -> Running {
        let hub = BroadcastHub::new(16);
        hub.spawn_dispatcher();
        let registry = Arc::new(DeviceRegistry::new(
            Arc::new(DeviceStore::in_memory()),
            Arc::clone(&hub),
        ));
        let auth = AuthConfig {
            jwt_secret: "socket-test-secret".to_string(),
            ..AuthConfig::default()
        };
        let state = Arc::new(AppState::new(
            registry,
            auth,
            &BroadcastConfig::default(),
            false,
        ));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        let server = tokio::spawn(serve(listener, Arc::clone(&state), async move {
            let _ = stopped.await;
            hub.shutdown().await;
        }));

        Running {
            addr,
            state,
            stop,
            server,
        }
    }

    async fn wait_for_observers(state: &AppState, count: usize) {
        timeout(Duration::from_secs(2), async {
            while state.hub.observer_count().await != count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("observer count never reached");
    }

    #[tokio::test]
    async fn test_observer_receives_device_added_frame() {
        let running = spawn_server().await;
        let token = running.state.jwt.issue("admin", "admin").unwrap();

        let url = format!("ws://{}/ws?token={}", running.addr, token);
        let (mut socket, _) = tokio_tungstenite::connect_async(url).await.unwrap();
        // registration happens after the upgrade completes
        wait_for_observers(&running.state, 1).await;

        let created = running
            .state
            .registry
            .create(NewDevice {
                mac_address: "AA:BB:CC:00:00:10".into(),
                serial_number: "SN-WS".into(),
                category: None,
                wms_login: "coletor02".into(),
            })
            .await
            .unwrap();

        let frame = timeout(Duration::from_secs(2), socket.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let text = match frame {
            Message::Text(text) => text,
            other => panic!("expected a text frame, got {:?}", other),
        };
        let payload: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(payload["type"], "device-added");
        assert_eq!(payload["device"]["id"], created.id.as_str());
        assert_eq!(payload["device"]["status"], "disponível");

        // shutdown ends the observer stream with a close frame
        running.stop.send(()).unwrap();
        let closing = timeout(Duration::from_secs(2), socket.next())
            .await
            .unwrap();
        assert!(matches!(closing, Some(Ok(Message::Close(_)))));

        timeout(Duration::from_secs(5), running.server)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(running.state.hub.observer_count().await, 0);
    }

    #[tokio::test]
    async fn test_websocket_upgrade_rejected_without_token() {
        let running = spawn_server().await;

        let url = format!("ws://{}/ws", running.addr);
        match tokio_tungstenite::connect_async(url).await {
            Err(tungstenite::Error::Http(response)) => {
                assert_eq!(response.status().as_u16(), 401)
            }
            other => panic!("expected an HTTP 401 rejection, got {:?}", other.map(|_| ())),
        }
        assert_eq!(running.state.hub.observer_count().await, 0);

        running.stop.send(()).unwrap();
        timeout(Duration::from_secs(5), running.server)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_bind_conflict_reports_address_in_use() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();
        let running = spawn_server().await;

        let err = start_server(Arc::clone(&running.state), addr, async {})
            .await
            .unwrap_err();
        assert!(err.contains("Address already in use"), "{}", err);

        running.stop.send(()).unwrap();
    }
}
