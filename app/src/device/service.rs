use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use infrastructure::{EventEmitter, meter};
use tokio::{sync::watch, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::core::resilience::BackoffSettings;
use crate::device::{
    Ack, ActuatorState, CommandError, Configuration, ConfigurationUpdate, ConnectionState, DeviceApi, DeviceEvent,
    DeviceReading, FetchError, PollHandle, SyncState, TransportError,
};

pub struct DeviceSyncService<A> {
    api: A,
    state: watch::Sender<SyncState>,
    history: Mutex<VecDeque<DeviceReading>>,
    history_size: usize,
    events: EventEmitter<DeviceEvent>,
    poller: Mutex<Option<CancellationToken>>,
    //last connection state announced on the event bus
    announced: Mutex<ConnectionState>,
    backoff: Option<BackoffSettings>,
}

impl<A: DeviceApi> DeviceSyncService<A> {
    pub fn new(
        api: A,
        configuration: Configuration,
        history_size: usize,
        backoff: Option<BackoffSettings>,
        events: EventEmitter<DeviceEvent>,
    ) -> Self {
        let (state, _) = watch::channel(SyncState::new(configuration));

        Self {
            api,
            state,
            history: Mutex::new(VecDeque::with_capacity(history_size)),
            history_size,
            events,
            poller: Mutex::new(None),
            announced: Mutex::new(ConnectionState::default()),
            backoff,
        }
    }

    pub fn snapshot(&self) -> SyncState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    pub fn history(&self) -> Vec<DeviceReading> {
        lock(&self.history).iter().cloned().collect()
    }

    pub async fn fetch_reading(&self) -> Result<DeviceReading, FetchError> {
        self.poll(None).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_pump(&self, on: bool) -> Result<Ack, CommandError> {
        let ack = self
            .api
            .set_pump(on)
            .await
            .inspect_err(|e| tracing::error!("Switching pump {} failed: {}", on_off(on), e))?;

        tracing::info!("Pump switched {}, automatic mode disengaged", on_off(on));
        meter::increment("pump_commands", &[("state", on_off(on))]);

        self.state.send_modify(|state| {
            state.actuator.pump_on = on;
            state.actuator.auto_mode = false;

            if let Some(reading) = state.reading.as_mut() {
                reading.pump_on = on;
                reading.auto_mode = false;
            }
        });
        self.events.send(DeviceEvent::PumpSwitched { on });

        Ok(ack)
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_configuration(&self, update: ConfigurationUpdate) -> Result<Ack, CommandError> {
        update.validate()?;

        let ack = self
            .api
            .apply_configuration(&update)
            .await
            .inspect_err(|e| tracing::error!("Applying configuration failed: {}", e))?;

        let mut applied = None;
        self.state.send_modify(|state| {
            state.configuration.merge(&update);

            if let Some(auto_mode) = update.auto_mode {
                state.actuator.auto_mode = auto_mode;

                if let Some(reading) = state.reading.as_mut() {
                    reading.auto_mode = auto_mode;
                }
            }

            applied = Some(state.configuration.clone());
        });

        if let Some(configuration) = applied {
            tracing::info!("Configuration applied: {:?}", configuration);
            self.events.send(DeviceEvent::ConfigurationApplied(configuration));
        }

        Ok(ack)
    }

    pub async fn probe(&self) -> ConnectionState {
        if self.api.probe().await {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    ///Polls right away and then every `interval`. A poller that is already running is stopped.
    pub fn start_polling(self: &Arc<Self>, interval: Duration) -> PollHandle {
        let token = CancellationToken::new();

        if let Some(previous) = lock(&self.poller).replace(token.clone()) {
            if !previous.is_cancelled() {
                tracing::info!("Replacing running poll loop");
            }
            previous.cancel();
        }

        let service = Arc::clone(self);
        let loop_token = token.clone();
        let task = tokio::spawn(async move { service.keep_polling(interval, loop_token).await });

        PollHandle::new(token, task)
    }

    async fn keep_polling(&self, interval: Duration, token: CancellationToken) {
        tracing::info!("Polling device every {:?}", interval);

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut backoff = self.backoff.as_ref().map(BackoffSettings::new_backoff);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let outcome = self.poll(Some(&token)).await;

            if let Some(backoff) = backoff.as_mut() {
                match outcome {
                    Ok(_) => backoff.reset(),
                    Err(_) => {
                        let delay = backoff.next_delay().max(interval);
                        backoff.bump();
                        tracing::debug!("Poll failed {} times in a row, next poll in {:?}", backoff.attempts(), delay);
                        ticker.reset_after(delay);
                    }
                }
            }
        }

        tracing::info!("Polling stopped");
    }

    async fn poll(&self, cancel: Option<&CancellationToken>) -> Result<DeviceReading, FetchError> {
        let settled = self.enter_connecting();

        let result = self.api.fetch_reading().await;

        if cancel.is_some_and(CancellationToken::is_cancelled) {
            tracing::debug!("Polling was stopped while the request was in flight, discarding result");
            self.state.send_if_modified(|state| {
                if state.connection == ConnectionState::Connecting {
                    state.connection = settled;
                    true
                } else {
                    false
                }
            });
            return result.map_err(FetchError::from);
        }

        match result {
            Ok(reading) => {
                self.commit_reading(reading.clone());
                Ok(reading)
            }
            Err(e) => {
                self.record_failure(&e);
                Err(FetchError::from(e))
            }
        }
    }

    //returns the connection state before the poll started
    fn enter_connecting(&self) -> ConnectionState {
        let mut previous = ConnectionState::Connecting;

        self.state.send_if_modified(|state| {
            previous = state.connection;
            state.connection = ConnectionState::Connecting;
            previous != ConnectionState::Connecting
        });

        previous
    }

    fn commit_reading(&self, reading: DeviceReading) {
        self.state.send_modify(|state| {
            state.actuator = ActuatorState {
                pump_on: reading.pump_on,
                auto_mode: reading.auto_mode,
            };
            state.reading = Some(reading.clone());
            state.connection = ConnectionState::Connected;
            state.last_error = None;
        });

        {
            let mut history = lock(&self.history);
            history.push_back(reading.clone());
            while history.len() > self.history_size {
                history.pop_front();
            }
        }

        tracing::debug!(
            "Device reading: sensors={:?} average={} luminosity={} pump_on={} auto_mode={}",
            reading.sensors.map(|s| s.0),
            reading.average,
            reading.luminosity,
            reading.pump_on,
            reading.auto_mode
        );
        meter::increment("device_polls", &[("outcome", "success")]);
        meter::set("soil_moisture_percent", reading.average.0, &[]);

        if self.announce(ConnectionState::Connected) {
            tracing::info!("Device connected");
            self.events.send(DeviceEvent::ConnectionChanged(ConnectionState::Connected));
        }

        self.events.send(DeviceEvent::ReadingUpdated(reading));
    }

    //previously held readings stay, stale data beats no data
    fn record_failure(&self, error: &TransportError) {
        self.state.send_modify(|state| {
            state.connection = ConnectionState::Disconnected;
            state.last_error = Some(error.to_string());
        });

        meter::increment("device_polls", &[("outcome", "failure")]);

        if self.announce(ConnectionState::Disconnected) {
            tracing::warn!("Device disconnected: {}", error);
            self.events.send(DeviceEvent::ConnectionChanged(ConnectionState::Disconnected));
        } else {
            tracing::debug!("Device still unreachable: {}", error);
        }
    }

    //true if `connection` differs from what listeners were last told
    fn announce(&self, connection: ConnectionState) -> bool {
        std::mem::replace(&mut *lock(&self.announced), connection) != connection
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
