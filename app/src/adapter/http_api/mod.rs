mod dto;

use actix_web::{HttpResponse, ResponseError, http::StatusCode, web};
use derive_more::derive::{Display, Error};
use serde_json::json;

use crate::device::{
    CommandError, ConfigurationError, ConfigurationUpdate, DeviceApi, DeviceSyncClient, FetchError, TransportError,
};
use dto::{ConfigUpdateDto, PumpRequestDto, ReadingDto, StateDto};

pub fn new_routes<A: DeviceApi>(client: DeviceSyncClient<A>) -> actix_web::Scope {
    web::scope("/api")
        .route("/state", web::get().to(get_state::<A>))
        .route("/history", web::get().to(get_history::<A>))
        .route("/refresh", web::post().to(refresh::<A>))
        .route("/pump", web::post().to(switch_pump::<A>))
        .route("/config", web::post().to(update_configuration::<A>))
        .route("/probe", web::get().to(probe::<A>))
        .app_data(web::Data::new(client))
}

type ApiResponse = Result<HttpResponse, ApiError>;

#[derive(Debug, Error, Display)]
enum ApiError {
    #[display("{_0}")]
    BadRequest(ConfigurationError),

    #[display("{_0}")]
    DeviceUnavailable(TransportError),
}

impl From<FetchError> for ApiError {
    fn from(error: FetchError) -> Self {
        ApiError::DeviceUnavailable(error.cause)
    }
}

impl From<CommandError> for ApiError {
    fn from(error: CommandError) -> Self {
        match error {
            CommandError::Invalid(e) => ApiError::BadRequest(e),
            CommandError::Transport(e) => ApiError::DeviceUnavailable(e),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::DeviceUnavailable(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        tracing::warn!("Request failed: {:?}", self);
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

async fn get_state<A: DeviceApi>(client: web::Data<DeviceSyncClient<A>>) -> HttpResponse {
    HttpResponse::Ok().json(StateDto::from(client.snapshot()))
}

//oldest first
async fn get_history<A: DeviceApi>(client: web::Data<DeviceSyncClient<A>>) -> HttpResponse {
    let readings: Vec<ReadingDto> = client.history().into_iter().map(Into::into).collect();
    HttpResponse::Ok().json(readings)
}

async fn refresh<A: DeviceApi>(client: web::Data<DeviceSyncClient<A>>) -> ApiResponse {
    let reading = client.fetch_reading().await?;
    Ok(HttpResponse::Ok().json(ReadingDto::from(reading)))
}

async fn switch_pump<A: DeviceApi>(
    client: web::Data<DeviceSyncClient<A>>,
    request: web::Json<PumpRequestDto>,
) -> ApiResponse {
    let ack = client.set_pump(request.on).await?;
    Ok(HttpResponse::Ok().json(ack))
}

async fn update_configuration<A: DeviceApi>(
    client: web::Data<DeviceSyncClient<A>>,
    request: web::Json<ConfigUpdateDto>,
) -> ApiResponse {
    let update = ConfigurationUpdate::try_from(request.into_inner()).map_err(ApiError::BadRequest)?;
    let ack = client.set_configuration(update).await?;
    Ok(HttpResponse::Ok().json(ack))
}

async fn probe<A: DeviceApi>(client: web::Data<DeviceSyncClient<A>>) -> HttpResponse {
    let connection = client.probe().await;
    HttpResponse::Ok().json(json!({ "connection": connection }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{
        Configuration, DeviceSyncRunner, SyncSettings, fixture, testing::FakeDeviceApi,
    };
    use actix_web::{App, test};
    use assert_json_diff::assert_json_include;

    fn new_client(api: &FakeDeviceApi) -> DeviceSyncClient<FakeDeviceApi> {
        DeviceSyncRunner::new(api.clone(), &SyncSettings::default(), Configuration::default()).client()
    }

    #[actix_web::test]
    async fn test_state_before_first_poll() {
        let api = FakeDeviceApi::default();
        let app = test::init_service(App::new().service(new_routes(new_client(&api)))).await;

        let request = test::TestRequest::get().uri("/api/state").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, request).await;

        assert_json_include!(
            actual: body,
            expected: json!({
                "connection": "connecting",
                "reading": null,
                "actuator": { "pump_on": false, "auto_mode": true },
                "configuration": {
                    "dry_threshold": 2800,
                    "read_interval_seconds": 30,
                    "device_name": "Estufa 1"
                },
                "last_error": null
            })
        );
    }

    #[actix_web::test]
    async fn test_refresh_updates_state() {
        let api = FakeDeviceApi::default();
        api.push_reading(fixture::reading([70.0, 65.0, 60.0], 65.0));
        let app = test::init_service(App::new().service(new_routes(new_client(&api)))).await;

        let request = test::TestRequest::post().uri("/api/refresh").to_request();
        let response = test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);

        let request = test::TestRequest::get().uri("/api/state").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, request).await;

        assert_json_include!(
            actual: body,
            expected: json!({
                "connection": "connected",
                "reading": { "average": 65.0, "status": "Úmido", "auto_mode": true }
            })
        );

        let request = test::TestRequest::get().uri("/api/history").to_request();
        let history: Vec<serde_json::Value> = test::call_and_read_body_json(&app, request).await;
        assert_eq!(history.len(), 1);
    }

    #[actix_web::test]
    async fn test_failed_refresh_is_bad_gateway() {
        let api = FakeDeviceApi::default();
        let app = test::init_service(App::new().service(new_routes(new_client(&api)))).await;

        let request = test::TestRequest::post().uri("/api/refresh").to_request();
        let response = test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body: serde_json::Value = test::read_body_json(response).await;
        assert_eq!(body, json!({ "error": "Request to device timed out" }));
    }

    #[actix_web::test]
    async fn test_switch_pump() {
        let api = FakeDeviceApi::default();
        let app = test::init_service(App::new().service(new_routes(new_client(&api)))).await;

        let request = test::TestRequest::post()
            .uri("/api/pump")
            .set_json(json!({ "on": true }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, request).await;

        assert_eq!(body, json!({ "ok": true }));
        assert_eq!(api.pump_commands(), vec![true]);

        let request = test::TestRequest::get().uri("/api/state").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, request).await;
        assert_json_include!(
            actual: body,
            expected: json!({ "reading": null, "actuator": { "pump_on": true, "auto_mode": false } })
        );
    }

    #[actix_web::test]
    async fn test_switch_pump_rejected_by_device() {
        let api = FakeDeviceApi::default();
        api.fail_commands_with(500);
        let app = test::init_service(App::new().service(new_routes(new_client(&api)))).await;

        let request = test::TestRequest::post()
            .uri("/api/pump")
            .set_json(json!({ "on": false }))
            .to_request();
        let response = test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[actix_web::test]
    async fn test_update_configuration() {
        let api = FakeDeviceApi::default();
        let client = new_client(&api);
        let app = test::init_service(App::new().service(new_routes(client.clone()))).await;

        let request = test::TestRequest::post()
            .uri("/api/config")
            .set_json(json!({ "dry_threshold": 2500, "read_interval_seconds": 10 }))
            .to_request();
        let response = test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(client.snapshot().configuration.dry_threshold, 2500);
        assert_eq!(api.configuration_commands().len(), 1);
    }

    #[actix_web::test]
    async fn test_invalid_configuration_is_bad_request() {
        let api = FakeDeviceApi::default();
        let app = test::init_service(App::new().service(new_routes(new_client(&api)))).await;

        for body in [
            json!({ "read_interval_seconds": 15 }),
            json!({ "dry_threshold": 5000 }),
            json!({ "device_name": "   " }),
            json!({}),
        ] {
            let request = test::TestRequest::post().uri("/api/config").set_json(body).to_request();
            let response = test::call_service(&app, request).await;

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }

        assert!(api.configuration_commands().is_empty());
    }

    #[actix_web::test]
    async fn test_probe() {
        let api = FakeDeviceApi::default();
        api.set_reachable(false);
        let app = test::init_service(App::new().service(new_routes(new_client(&api)))).await;

        let request = test::TestRequest::get().uri("/api/probe").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, request).await;

        assert_eq!(body, json!({ "connection": "disconnected" }));
    }
}
