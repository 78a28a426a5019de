mod domain;
mod error;
mod service;
#[cfg(test)]
pub mod testing;

pub use domain::*;
pub use error::{CommandError, FetchError, TransportError};

use std::{sync::Arc, time::Duration};

use infrastructure::{EventBus, EventListener};
use serde::{Deserialize, Serialize};
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::core::resilience::BackoffSettings;
use service::DeviceSyncService;

///Remote side of the synchronization, one implementation per device firmware
pub trait DeviceApi: Send + Sync + 'static {
    fn fetch_reading(&self) -> impl Future<Output = Result<DeviceReading, TransportError>> + Send;

    fn set_pump(&self, on: bool) -> impl Future<Output = Result<Ack, TransportError>> + Send;

    fn apply_configuration(
        &self,
        update: &ConfigurationUpdate,
    ) -> impl Future<Output = Result<Ack, TransportError>> + Send;

    //true if the device answers at all
    fn probe(&self) -> impl Future<Output = bool> + Send;
}

///Whatever the device answered to a command
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Ack(pub serde_json::Value);

///Local mirror of the device. Only the sync service writes it.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncState {
    pub reading: Option<DeviceReading>,
    pub connection: ConnectionState,
    pub actuator: ActuatorState,
    pub configuration: Configuration,
    pub last_error: Option<String>,
}

impl SyncState {
    fn new(configuration: Configuration) -> Self {
        Self {
            reading: None,
            connection: ConnectionState::default(),
            actuator: ActuatorState::default(),
            configuration,
            last_error: None,
        }
    }
}

///Pump and control mode as last reported by the device or changed by a command.
///Kept apart from the reading so commands are recorded before the first successful poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActuatorState {
    pub pump_on: bool,
    pub auto_mode: bool,
}

impl Default for ActuatorState {
    fn default() -> Self {
        Self {
            pump_on: false,
            auto_mode: true,
        }
    }
}

#[derive(Debug, Clone)]
pub enum DeviceEvent {
    ReadingUpdated(DeviceReading),
    ConnectionChanged(ConnectionState),
    PumpSwitched { on: bool },
    ConfigurationApplied(Configuration),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncSettings {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_history_size")]
    pub history_size: usize,
    #[serde(default)]
    pub backoff: Option<BackoffSettings>,
}

fn default_poll_interval_ms() -> u64 {
    3000
}

fn default_history_size() -> usize {
    120
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            history_size: default_history_size(),
            backoff: None,
        }
    }
}

impl SyncSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

///Running poll loop. Dropping the handle does not stop polling, `stop` does.
pub struct PollHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl PollHandle {
    fn new(token: CancellationToken, task: JoinHandle<()>) -> Self {
        Self { token, task }
    }

    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    ///Waits until the poll loop has ended, including a poll that was still in flight
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            tracing::error!("Poll loop terminated abnormally: {}", e);
        }
    }
}

pub struct DeviceSyncRunner<A> {
    service: Arc<DeviceSyncService<A>>,
    event_bus: EventBus<DeviceEvent>,
    poll_interval: Duration,
}

pub struct DeviceSyncClient<A> {
    service: Arc<DeviceSyncService<A>>,
}

impl<A> Clone for DeviceSyncClient<A> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
        }
    }
}

impl<A: DeviceApi> DeviceSyncRunner<A> {
    pub fn new(api: A, settings: &SyncSettings, configuration: Configuration) -> Self {
        let event_bus = EventBus::new(64);

        let service = DeviceSyncService::new(
            api,
            configuration,
            settings.history_size,
            settings.backoff.clone(),
            event_bus.emitter(),
        );

        Self {
            service: Arc::new(service),
            event_bus,
            poll_interval: settings.poll_interval(),
        }
    }

    pub fn client(&self) -> DeviceSyncClient<A> {
        DeviceSyncClient {
            service: self.service.clone(),
        }
    }

    pub fn subscribe(&self) -> EventListener<DeviceEvent> {
        self.event_bus.subscribe()
    }

    pub async fn run(self) {
        let handle = self.service.start_polling(self.poll_interval);
        handle.join().await;
    }
}

impl<A: DeviceApi> DeviceSyncClient<A> {
    pub fn snapshot(&self) -> SyncState {
        self.service.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.service.subscribe()
    }

    pub fn history(&self) -> Vec<DeviceReading> {
        self.service.history()
    }

    pub async fn fetch_reading(&self) -> Result<DeviceReading, FetchError> {
        self.service.fetch_reading().await
    }

    pub async fn set_pump(&self, on: bool) -> Result<Ack, CommandError> {
        self.service.set_pump(on).await
    }

    pub async fn set_configuration(&self, update: ConfigurationUpdate) -> Result<Ack, CommandError> {
        self.service.set_configuration(update).await
    }

    pub async fn probe(&self) -> ConnectionState {
        self.service.probe().await
    }

    pub fn start_polling(&self, interval: Duration) -> PollHandle {
        self.service.start_polling(interval)
    }

    pub fn stop_polling(&self, handle: &PollHandle) {
        handle.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::testing::FakeDeviceApi;

    #[tokio::test(start_paused = true)]
    async fn test_client_controls_polling() {
        let api = FakeDeviceApi::default();
        api.push_reading(fixture::reading([50.0; 3], 50.0));
        let runner = DeviceSyncRunner::new(api.clone(), &SyncSettings::default(), Configuration::default());
        let client = runner.client();
        let mut state = client.subscribe();

        let handle = client.start_polling(Duration::from_secs(3));
        state.wait_for(|s| s.connection == ConnectionState::Connected).await.unwrap();

        client.stop_polling(&handle);
        assert!(handle.is_stopped());
        handle.join().await;

        assert_eq!(client.history().len(), 1);
        assert_eq!(api.fetch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_runner_publishes_events() {
        let api = FakeDeviceApi::default();
        api.push_reading(fixture::reading([50.0; 3], 50.0));
        let runner = DeviceSyncRunner::new(api, &SyncSettings::default(), Configuration::default());
        let mut events = runner.subscribe();

        tokio::spawn(runner.run());

        assert!(matches!(
            events.recv().await,
            Some(DeviceEvent::ConnectionChanged(ConnectionState::Connected))
        ));
        assert!(matches!(events.recv().await, Some(DeviceEvent::ReadingUpdated(_))));
    }
}
