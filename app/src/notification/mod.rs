use derive_more::Display;
use infrastructure::{EventListener, meter};
use serde::Serialize;
use tokio::sync::watch;

use crate::device::{DeviceEvent, DeviceReading, SyncState};

#[derive(Debug, Clone, PartialEq, Display)]
pub enum Notification {
    #[display("{device} is dry")]
    SoilDry { device: String },
    #[display("{device} is moist again")]
    SoilWet { device: String },
    #[display("Pump switched {}", if *on { "on" } else { "off" })]
    PumpSwitched { on: bool },
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::SoilDry { .. } => "solo-seco",
            Notification::SoilWet { .. } => "solo-umido",
            Notification::PumpSwitched { .. } => "bomba-manual",
        }
    }

    pub fn title(&self) -> String {
        match self {
            Notification::SoilDry { .. } => "Planta Seca!".to_string(),
            Notification::SoilWet { .. } => "Solo Úmido".to_string(),
            Notification::PumpSwitched { on: true } => "Bomba Ligada".to_string(),
            Notification::PumpSwitched { on: false } => "Bomba Desligada".to_string(),
        }
    }

    pub fn body(&self) -> String {
        match self {
            Notification::SoilDry { device } => format!("{} está com solo seco.", device),
            Notification::SoilWet { device } => format!("{} está com solo úmido.", device),
            Notification::PumpSwitched { on } => {
                format!("Modo manual: Bomba foi {}.", if *on { "ligada" } else { "desligada" })
            }
        }
    }
}

///What a notifier delivers
#[derive(Debug, Serialize, PartialEq)]
pub struct NotificationMessage {
    pub kind: &'static str,
    pub title: String,
    pub body: String,
}

impl From<&Notification> for NotificationMessage {
    fn from(notification: &Notification) -> Self {
        Self {
            kind: notification.kind(),
            title: notification.title(),
            body: notification.body(),
        }
    }
}

pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, message: &NotificationMessage) -> impl Future<Output = anyhow::Result<()>> + Send;
}

///Turns device events into notifications. Soil is assumed wet until a reading says otherwise.
pub struct NotificationWatcher<N> {
    events: EventListener<DeviceEvent>,
    state: watch::Receiver<SyncState>,
    notifier: Option<N>,
    soil_was_dry: bool,
}

impl<N: Notifier> NotificationWatcher<N> {
    pub fn new(events: EventListener<DeviceEvent>, state: watch::Receiver<SyncState>, notifier: Option<N>) -> Self {
        if notifier.is_none() {
            tracing::info!("No notifier configured, notifications are only logged");
        }

        Self {
            events,
            state,
            notifier,
            soil_was_dry: false,
        }
    }

    pub async fn run(mut self) {
        while let Some(event) = self.events.recv().await {
            if let Some(notification) = self.on_event(&event) {
                self.dispatch(&notification).await;
            }
        }

        tracing::info!("Device events closed, notification watcher stopped");
    }

    fn on_event(&mut self, event: &DeviceEvent) -> Option<Notification> {
        match event {
            DeviceEvent::ReadingUpdated(reading) => self.on_reading(reading),
            DeviceEvent::PumpSwitched { on } => Some(Notification::PumpSwitched { on: *on }),
            DeviceEvent::ConnectionChanged(_) | DeviceEvent::ConfigurationApplied(_) => None,
        }
    }

    fn on_reading(&mut self, reading: &DeviceReading) -> Option<Notification> {
        let is_dry = reading.soil_status().is_dry();
        if is_dry == self.soil_was_dry {
            return None;
        }

        self.soil_was_dry = is_dry;
        let device = self.state.borrow().configuration.device_name.clone();

        Some(if is_dry {
            Notification::SoilDry { device }
        } else {
            Notification::SoilWet { device }
        })
    }

    async fn dispatch(&self, notification: &Notification) {
        let Some(notifier) = &self.notifier else {
            tracing::info!("Notification not delivered: {}", notification);
            return;
        };

        let message = NotificationMessage::from(notification);
        match notifier.notify(&message).await {
            Ok(()) => {
                tracing::info!("Notification sent: {}", notification);
                meter::increment("notifications", &[("kind", message.kind)]);
            }
            Err(e) => tracing::error!("Error sending notification {}: {:?}", notification, e),
        }
    }
}
