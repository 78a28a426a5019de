use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use super::{Ack, ConfigurationUpdate, DeviceApi, DeviceReading, TransportError};

///Scripted device: answers polls from a queue and records every command it receives.
///An empty queue behaves like a device that does not answer in time.
#[derive(Clone)]
pub struct FakeDeviceApi {
    readings: Arc<Mutex<VecDeque<Result<DeviceReading, TransportError>>>>,
    pump_commands: Arc<Mutex<Vec<bool>>>,
    configuration_commands: Arc<Mutex<Vec<ConfigurationUpdate>>>,
    command_failure: Arc<Mutex<Option<u16>>>,
    reachable: Arc<AtomicBool>,
    fetch_count: Arc<AtomicUsize>,
    fetch_delay: Option<Duration>,
}

impl Default for FakeDeviceApi {
    fn default() -> Self {
        Self {
            readings: Default::default(),
            pump_commands: Default::default(),
            configuration_commands: Default::default(),
            command_failure: Default::default(),
            reachable: Arc::new(AtomicBool::new(true)),
            fetch_count: Default::default(),
            fetch_delay: None,
        }
    }
}

impl FakeDeviceApi {
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    pub fn push_reading(&self, reading: DeviceReading) {
        self.readings.lock().unwrap().push_back(Ok(reading));
    }

    pub fn push_failure(&self, error: TransportError) {
        self.readings.lock().unwrap().push_back(Err(error));
    }

    pub fn fail_commands_with(&self, status: u16) {
        *self.command_failure.lock().unwrap() = Some(status);
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    pub fn pump_commands(&self) -> Vec<bool> {
        self.pump_commands.lock().unwrap().clone()
    }

    pub fn configuration_commands(&self) -> Vec<ConfigurationUpdate> {
        self.configuration_commands.lock().unwrap().clone()
    }

    fn command_result(&self) -> Result<Ack, TransportError> {
        match *self.command_failure.lock().unwrap() {
            Some(status) => Err(TransportError::Status(status)),
            None => Ok(Ack(serde_json::json!({ "ok": true }))),
        }
    }
}

impl DeviceApi for FakeDeviceApi {
    async fn fetch_reading(&self) -> Result<DeviceReading, TransportError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.readings.lock().unwrap().pop_front();
        next.unwrap_or(Err(TransportError::Timeout))
    }

    async fn set_pump(&self, on: bool) -> Result<Ack, TransportError> {
        let result = self.command_result();
        if result.is_ok() {
            self.pump_commands.lock().unwrap().push(on);
        }
        result
    }

    async fn apply_configuration(&self, update: &ConfigurationUpdate) -> Result<Ack, TransportError> {
        let result = self.command_result();
        if result.is_ok() {
            self.configuration_commands.lock().unwrap().push(update.clone());
        }
        result
    }

    async fn probe(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }
}
