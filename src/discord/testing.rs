//! In-memory relay client for tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use crate::common::error::{ConnectionError, DeliveryError};
use crate::common::{ChannelHandle, RichMessage};
use crate::discord::connection::RelayClient;

/// A send observed by the fake client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text(ChannelHandle, String),
    Rich(ChannelHandle, RichMessage),
}

pub struct FakeRelayClient {
    ready: bool,
    interrupted: bool,
    has_channel: bool,
    connected: AtomicBool,
    fail_sends: AtomicBool,
    connects: AtomicUsize,
    shutdowns: AtomicUsize,
    sent_count: AtomicUsize,
    sent_tx: mpsc::UnboundedSender<Sent>,
    sent_rx: Mutex<mpsc::UnboundedReceiver<Sent>>,
}

impl FakeRelayClient {
    pub fn new() -> Self {
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        Self {
            ready: true,
            interrupted: false,
            has_channel: true,
            connected: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
            connects: AtomicUsize::new(0),
            shutdowns: AtomicUsize::new(0),
            sent_count: AtomicUsize::new(0),
            sent_tx,
            sent_rx: Mutex::new(sent_rx),
        }
    }

    /// Session never reports ready.
    pub fn never_ready(mut self) -> Self {
        self.ready = false;
        self
    }

    /// Session ends before it becomes ready.
    pub fn interrupted(mut self) -> Self {
        self.interrupted = true;
        self
    }

    /// Channel lookup fails.
    pub fn without_channel(mut self) -> Self {
        self.has_channel = false;
        self
    }

    pub fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    pub fn sent_count(&self) -> usize {
        self.sent_count.load(Ordering::SeqCst)
    }

    /// Wait briefly for the next send.
    pub async fn next_sent(&self) -> Option<Sent> {
        let mut rx = self.sent_rx.lock().await;
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .ok()
            .flatten()
    }

    fn record(&self, sent: Sent) -> Result<(), DeliveryError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(DeliveryError::NotConnected);
        }
        self.sent_count.fetch_add(1, Ordering::SeqCst);
        let _ = self.sent_tx.send(sent);
        Ok(())
    }
}

#[async_trait]
impl RelayClient for FakeRelayClient {
    async fn connect(&self, _token: &str) -> Result<(), ConnectionError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn await_ready(&self) -> Result<(), ConnectionError> {
        if self.interrupted {
            return Err(ConnectionError::Interrupted);
        }
        if !self.ready {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn resolve_channel(&self, channel_id: u64) -> Result<ChannelHandle, ConnectionError> {
        if self.has_channel {
            Ok(ChannelHandle::new(channel_id))
        } else {
            Err(ConnectionError::ChannelNotFound { channel_id })
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send_text(&self, channel: ChannelHandle, text: &str) -> Result<(), DeliveryError> {
        self.record(Sent::Text(channel, text.to_string()))
    }

    async fn send_rich(&self, channel: ChannelHandle, message: &RichMessage) -> Result<(), DeliveryError> {
        self.record(Sent::Rich(channel, message.clone()))
    }

    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
    }
}
