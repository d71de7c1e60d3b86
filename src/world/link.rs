//! TCP link to the world host.
//!
//! The world host shim streams events as JSON lines and accepts broadcast
//! commands on the same connection. The link reconnects with backoff until
//! shutdown is signalled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use backon::BackoffBuilder;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::bridge::router::{WorldBroadcast, WorldEventListener, WorldEventSource};
use crate::world::codec::new_world_connection;
use crate::world::events::{WorldCommand, WorldEvent};

/// Create an exponential backoff iterator for world reconnection.
/// 5s initial, 5min max, factor 1.1, with jitter, unlimited retries.
fn world_backoff() -> impl Iterator<Item = Duration> {
    backon::ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(5))
        .with_max_delay(Duration::from_secs(300))
        .with_factor(1.1)
        .with_jitter()
        .without_max_times()
        .build()
}

pub struct WorldLink {
    address: String,
    listeners: Mutex<Vec<Arc<dyn WorldEventListener>>>,
    connected: AtomicBool,
    commands_tx: mpsc::UnboundedSender<WorldCommand>,
    /// Taken by `run`.
    commands_rx: Mutex<Option<mpsc::UnboundedReceiver<WorldCommand>>>,
}

impl WorldLink {
    pub fn new(address: impl Into<String>) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        Self {
            address: address.into(),
            listeners: Mutex::new(Vec::new()),
            connected: AtomicBool::new(false),
            commands_tx,
            commands_rx: Mutex::new(Some(commands_rx)),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Connect and serve the link until shutdown is signalled.
    pub async fn run(self: Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) {
        let commands_rx = self
            .commands_rx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let Some(mut commands_rx) = commands_rx else {
            warn!("World link is already running");
            return;
        };

        let mut backoff = world_backoff();

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            info!("Connecting to world host at {}...", self.address);
            match TcpStream::connect(&self.address).await {
                Ok(stream) => {
                    info!("World link established");
                    backoff = world_backoff(); // Reset backoff on successful connection

                    // Commands left over from the previous connection are stale.
                    while commands_rx.try_recv().is_ok() {}
                    self.connected.store(true, Ordering::SeqCst);
                    let result = self
                        .handle_connection(stream, &mut commands_rx, &mut shutdown_rx)
                        .await;
                    self.connected.store(false, Ordering::SeqCst);

                    match result {
                        Ok(true) => {
                            info!("World link closed");
                            break;
                        }
                        Ok(false) => info!("World host closed the link"),
                        Err(e) => error!("World link error: {}", e),
                    }
                }
                Err(e) => {
                    error!("Failed to connect to world host: {}", e);
                }
            }

            let delay = backoff.next().unwrap_or(Duration::from_secs(300));
            info!("Reconnecting to world host in {:.1} seconds...", delay.as_secs_f64());

            // Wait for delay OR shutdown signal
            tokio::select! {
                _ = tokio::time::sleep(delay) => {},
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Shutdown signal received during backoff");
                        break;
                    }
                }
            }
        }
    }

    /// Serve one connection. Returns `Ok(true)` when stopped by shutdown.
    async fn handle_connection<S>(
        &self,
        stream: S,
        commands_rx: &mut mpsc::UnboundedReceiver<WorldCommand>,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> Result<bool>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut connection = new_world_connection(stream);

        loop {
            tokio::select! {
                event = connection.next() => {
                    match event {
                        Some(Ok(event)) => self.dispatch(&event),
                        Some(Err(e)) => return Err(e),
                        None => return Ok(false), // Connection closed
                    }
                }

                Some(command) = commands_rx.recv() => {
                    connection.send(command).await?;
                }

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        return Ok(true);
                    }
                }
            }
        }
    }

    fn dispatch(&self, event: &WorldEvent) {
        debug!("World event: {:?}", event);
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        for listener in listeners {
            event.dispatch(listener.as_ref());
        }
    }
}

impl WorldEventSource for WorldLink {
    fn subscribe(&self, listener: Arc<dyn WorldEventListener>) {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(listener);
    }

    fn unsubscribe(&self, listener: &Arc<dyn WorldEventListener>) {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .retain(|registered| !Arc::ptr_eq(registered, listener));
    }
}

impl WorldBroadcast for WorldLink {
    fn broadcast(&self, message: String) {
        if !self.is_connected() {
            debug!("Dropping broadcast - world host not connected");
            return;
        }
        if let Err(e) = self.commands_tx.send(WorldCommand::Broadcast { message }) {
            debug!("World command channel closed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    use super::*;
    use crate::world::events::{AdvancementEvent, ChatEvent, DeathEvent, PresenceEvent};

    struct ChannelListener {
        tx: mpsc::UnboundedSender<String>,
    }

    impl WorldEventListener for ChannelListener {
        fn on_chat(&self, event: &ChatEvent) {
            let _ = self.tx.send(format!("chat:{}:{}", event.player, event.message));
        }

        fn on_join(&self, event: &PresenceEvent) {
            let _ = self.tx.send(format!("join:{}", event.player));
        }

        fn on_quit(&self, event: &PresenceEvent) {
            let _ = self.tx.send(format!("quit:{}", event.player));
        }

        fn on_advancement(&self, event: &AdvancementEvent) {
            let _ = self.tx.send(format!("advancement:{}", event.key));
        }

        fn on_death(&self, event: &DeathEvent) {
            let _ = self.tx.send(format!("death:{:?}", event.message));
        }
    }

    fn subscribed_link(address: String) -> (Arc<WorldLink>, mpsc::UnboundedReceiver<String>) {
        let link = Arc::new(WorldLink::new(address));
        let (tx, rx) = mpsc::unbounded_channel();
        link.subscribe(Arc::new(ChannelListener { tx }));
        (link, rx)
    }

    async fn recv(rx: &mut mpsc::UnboundedReceiver<String>) -> Option<String> {
        tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.ok().flatten()
    }

    #[tokio::test]
    async fn test_events_reach_listeners() {
        let (link, mut rx) = subscribed_link(String::new());
        let (client, mut server) = tokio::io::duplex(1024);
        let mut commands_rx = link.commands_rx.lock().unwrap().take().unwrap();
        let (_shutdown_tx, mut shutdown_rx) = watch::channel(false);

        server
            .write_all(b"{\"type\":\"join\",\"player\":\"Steve\"}\n{\"type\":\"death\",\"player\":\"Steve\"}\n")
            .await
            .unwrap();
        drop(server);

        let result = link
            .handle_connection(client, &mut commands_rx, &mut shutdown_rx)
            .await;

        // Closed by the peer, not by shutdown.
        assert!(!result.unwrap());
        assert_eq!(recv(&mut rx).await.as_deref(), Some("join:Steve"));
        assert_eq!(recv(&mut rx).await.as_deref(), Some("death:None"));
    }

    #[test]
    fn test_unsubscribed_listener_is_not_called() {
        let link = WorldLink::new(String::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let listener: Arc<dyn WorldEventListener> = Arc::new(ChannelListener { tx });
        link.subscribe(Arc::clone(&listener));

        link.unsubscribe(&listener);
        link.dispatch(&WorldEvent::Join(PresenceEvent {
            player: "Steve".to_string(),
        }));

        assert!(rx.try_recv().is_err());
        assert!(link.listeners.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_dropped_while_disconnected() {
        let link = WorldLink::new("127.0.0.1:1");

        link.broadcast("hello".to_string());

        let mut commands_rx = link.commands_rx.lock().unwrap().take().unwrap();
        assert!(commands_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_run_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let (link, mut rx) = subscribed_link(address);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(Arc::clone(&link).run(shutdown_rx));
        let (socket, _) = listener.accept().await.unwrap();
        let (read_half, mut write_half) = socket.into_split();

        write_half
            .write_all(b"{\"type\":\"chat\",\"player\":\"Alice\",\"message\":\"hi\"}\n")
            .await
            .unwrap();
        assert_eq!(recv(&mut rx).await.as_deref(), Some("chat:Alice:hi"));
        assert!(link.is_connected());

        link.broadcast("hey".to_string());
        let mut lines = BufReader::new(read_half).lines();
        let line = tokio::time::timeout(Duration::from_secs(2), lines.next_line())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(line.as_deref(), Some(r#"{"type":"broadcast","message":"hey"}"#));

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();
        assert!(!link.is_connected());
    }

    #[tokio::test]
    async fn test_run_exits_on_shutdown_while_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);
        let link = Arc::new(WorldLink::new(address));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(Arc::clone(&link).run(shutdown_rx));
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();
    }
}
