//! Shared application state, constructed once at startup

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::auth::{AuthGate, UserStore};
use crate::commands::{CommandJournal, CommandRouter};
use crate::config::{Config, DeviceConfig};
use crate::device::DeviceApi;
use crate::realtime::{Broadcaster, ConnectionRegistry};

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthGate>,
    pub device: Arc<dyn DeviceApi>,
    pub registry: Arc<ConnectionRegistry>,
    pub broadcaster: Arc<Broadcaster>,
    pub commands: Arc<CommandRouter>,
    pub device_config: DeviceConfig,
    pub handshake_timeout: Duration,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: &Config,
        device: Arc<dyn DeviceApi>,
        users: Arc<dyn UserStore>,
        journal: Arc<dyn CommandJournal>,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = Arc::new(Broadcaster::new(registry.clone()));
        let commands = Arc::new(CommandRouter::new(
            device.clone(),
            broadcaster.clone(),
            journal,
            config.device.command_timeout(),
        ));

        Self {
            auth: Arc::new(AuthGate::new(&config.auth, users)),
            device,
            registry,
            broadcaster,
            commands,
            device_config: config.device.clone(),
            handshake_timeout: Duration::from_secs(config.auth.handshake_timeout_secs),
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
