use settings::Settings;

use crate::device::DeviceSyncRunner;
use crate::notification::NotificationWatcher;

mod adapter;
mod core;
mod device;
mod notification;
mod settings;

#[tokio::main(flavor = "multi_thread")]
pub async fn main() {
    let settings = Settings::new().expect("Error reading configuration");

    settings.monitoring.init().expect("Error initializing monitoring");
    settings.defaults.validate().expect("Invalid default device configuration");

    let device_url = settings.device.base_url().expect("Error resolving device address");
    let device_api = settings.device.new_client().expect("Error initializing ESP32 client");

    let device_sync_runner = DeviceSyncRunner::new(device_api, &settings.sync, settings.defaults.clone());

    let notifier = settings
        .notification
        .as_ref()
        .map(|webhook| webhook.new_notifier().expect("Error initializing webhook notifier"));

    let notification_watcher = NotificationWatcher::new(
        device_sync_runner.subscribe(),
        device_sync_runner.client().subscribe(),
        notifier,
    );

    let http_server_exec = {
        let http_device_client = device_sync_runner.client();
        let http_server = settings.http_server.clone();

        async move {
            http_server
                .run_server(move || vec![adapter::http_api::new_routes(http_device_client.clone())])
                .await
                .expect("HTTP server execution failed");
        }
    };

    let connection = device_sync_runner.client().probe().await;
    tracing::info!("Device at {} is {}", device_url, connection);

    tracing::info!("Starting main loop");

    tokio::select!(
        _ = device_sync_runner.run() => {},
        _ = notification_watcher.run() => {},
        _ = http_server_exec => {},
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown requested");
        },
    );
}
