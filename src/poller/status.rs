//! Status poller - fetches device status on a fixed cadence and fans it out
//!
//! Every tick yields exactly one event: `status_update` on success,
//! `esp32_offline` on any failure. Cycles never overlap; a tick that comes
//! due while a cycle is still running is skipped.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::config::DeviceConfig;
use crate::device::DeviceApi;
use crate::error::DeviceError;
use crate::realtime::{BroadcastEvent, Broadcaster};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Online,
    Offline,
}

pub struct StatusPoller {
    device: Arc<dyn DeviceApi>,
    broadcaster: Arc<Broadcaster>,
    interval: Duration,
    timeout: Duration,
}

impl StatusPoller {
    pub fn new(
        device: Arc<dyn DeviceApi>,
        broadcaster: Arc<Broadcaster>,
        config: &DeviceConfig,
    ) -> Self {
        Self {
            device,
            broadcaster,
            interval: config.poll_interval(),
            timeout: config.status_timeout(),
        }
    }

    /// Run the polling loop for the lifetime of the process
    pub async fn start(self: Arc<Self>) {
        tracing::info!(
            "Starting status poller (interval {}ms, timeout {}ms)...",
            self.interval.as_millis(),
            self.timeout.as_millis()
        );

        let mut interval_timer = interval(self.interval);
        // A cycle that overruns the interval swallows the ticks it covers. With a
        // hung device each cycle lasts the full status timeout, so when that
        // timeout exceeds the interval, offline events are spaced by at least
        // the timeout rather than by the interval.
        interval_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval_timer.tick().await;

            // Each cycle runs in its own task so a panic cannot end the loop
            let poller = self.clone();
            match tokio::spawn(async move { poller.poll_once().await }).await {
                Ok(outcome) => tracing::trace!("Poll cycle finished: {:?}", outcome),
                Err(e) => {
                    tracing::error!("Poll cycle aborted: {}", e);
                    self.broadcaster
                        .publish(&BroadcastEvent::device_offline())
                        .await;
                }
            }
        }
    }

    /// One poll cycle: query the device and publish the result
    pub async fn poll_once(&self) -> PollOutcome {
        let result = match timeout(self.timeout, self.device.get_status(self.timeout)).await {
            Ok(result) => result,
            Err(_) => Err(DeviceError::Timeout),
        };

        match result {
            Ok(snapshot) => {
                self.broadcaster
                    .publish(&BroadcastEvent::status_update(snapshot))
                    .await;
                PollOutcome::Online
            }
            Err(e) => {
                tracing::debug!("Device poll failed ({}): {}", self.device.address(), e);
                self.broadcaster
                    .publish(&BroadcastEvent::device_offline())
                    .await;
                PollOutcome::Offline
            }
        }
    }
}
