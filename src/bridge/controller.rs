//! Bridge lifecycle.
//!
//! The controller builds the formatter, gate and relay connection for one
//! bridge session, registers the routers on both hosts, and tears the
//! session down again on stop.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::bridge::formatter::{FormatRules, Formatter};
use crate::bridge::gate::CategoryGate;
use crate::bridge::router::{
    RelayEventRouter, RelayEventSource, RelayMessageListener, WorldBroadcast, WorldEventListener,
    WorldEventRouter, WorldEventSource,
};
use crate::common::error::{BridgeError, BridgeResult};
use crate::common::{CanonicalMessage, Category};
use crate::config::Config;
use crate::discord::connection::{ConnectionState, RelayClient, RelayConnectionManager, RelayLink};

/// Lifecycle of the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Everything built for one running session.
struct BridgeSession {
    gate: Arc<CategoryGate>,
    formatter: Arc<Formatter>,
    connection: Arc<RelayConnectionManager>,
    world: Arc<dyn WorldEventSource>,
    world_router: Arc<dyn WorldEventListener>,
    relay_events: Arc<dyn RelayEventSource>,
    relay_router: Arc<dyn RelayMessageListener>,
}

impl BridgeSession {
    /// Detach both routers from their hosts.
    fn unsubscribe(&self) {
        self.world.unsubscribe(&self.world_router);
        self.relay_events.unsubscribe(&self.relay_router);
    }

    fn announce(&self, category: Category) {
        if !self.gate.is_enabled(category) {
            return;
        }
        let body = self.formatter.announcement(category);
        self.connection
            .send_rich(CanonicalMessage::from_world(category, "", body));
    }
}

pub struct BridgeController {
    config: Config,
    client: Arc<dyn RelayClient>,
    state: BridgeState,
    session: Option<BridgeSession>,
}

impl BridgeController {
    pub fn new(config: Config, client: Arc<dyn RelayClient>) -> Self {
        Self {
            config,
            client,
            state: BridgeState::Stopped,
            session: None,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// Relay connection state of the current session, if any.
    #[cfg(test)]
    pub fn connection_state(&self) -> Option<ConnectionState> {
        self.session.as_ref().map(|session| session.connection.state())
    }

    /// Connect to the relay and start routing events.
    ///
    /// On failure the session is released, the controller is back at
    /// `Stopped`, and the host should disable the bridge.
    pub async fn start(
        &mut self,
        world: Arc<dyn WorldEventSource>,
        relay_events: Arc<dyn RelayEventSource>,
        broadcast: Arc<dyn WorldBroadcast>,
    ) -> BridgeResult<()> {
        if self.state != BridgeState::Stopped {
            return Err(BridgeError::AlreadyRunning);
        }
        self.state = BridgeState::Starting;
        info!("Starting bridge...");

        let gate = Arc::new(CategoryGate::from_config(&self.config.messages));
        let formatter = Arc::new(Formatter::new(FormatRules::from_config(&self.config.messages)));
        let connection = Arc::new(RelayConnectionManager::new(Arc::clone(&self.client)));

        let initialized = connection
            .initialize(
                &self.config.relay.token,
                &self.config.relay.channel_id,
                self.config.ready_timeout(),
            )
            .await;
        if !initialized {
            error!("Failed to connect to Discord, bridge disabled");
            connection.shutdown().await;
            self.state = BridgeState::Stopped;
            return Err(BridgeError::RelayUnavailable);
        }

        let relay: Arc<dyn RelayLink> = connection.clone();
        let world_router: Arc<dyn WorldEventListener> = Arc::new(WorldEventRouter::new(
            Arc::clone(&gate),
            Arc::clone(&formatter),
            Arc::clone(&relay),
        ));
        let relay_router: Arc<dyn RelayMessageListener> = Arc::new(RelayEventRouter::new(
            Arc::clone(&formatter),
            relay,
            broadcast,
        ));
        world.subscribe(Arc::clone(&world_router));
        relay_events.subscribe(Arc::clone(&relay_router));

        let session = BridgeSession {
            gate,
            formatter,
            connection,
            world,
            world_router,
            relay_events,
            relay_router,
        };
        session.announce(Category::ServerStart);
        self.session = Some(session);

        self.state = BridgeState::Running;
        info!("Bridge started");
        Ok(())
    }

    /// Detach the routers, announce the stop and release the relay session.
    /// No-op when stopped.
    pub async fn stop(&mut self) {
        if self.state == BridgeState::Stopped {
            debug!("Bridge already stopped");
            return;
        }
        self.state = BridgeState::Stopping;
        info!("Stopping bridge...");

        if let Some(session) = self.session.take() {
            session.unsubscribe();
            if session.connection.state() == ConnectionState::Ready {
                session.announce(Category::ServerStop);
            }
            session.connection.shutdown().await;
        }

        self.state = BridgeState::Stopped;
        info!("Bridge stopped");
    }
}
