mod payload;

use anyhow::bail;
use infrastructure::HttpClientConfig;
use reqwest::header;
use reqwest_middleware::{ClientWithMiddleware, RequestBuilder};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::core::time::DateTime;
use crate::device::{Ack, ConfigurationUpdate, DeviceApi, DeviceReading, TransportError};
use payload::{ConfigRequest, DevicePayload, PumpRequest};

#[derive(Debug, Clone, Deserialize)]
pub struct Esp32Settings {
    //full base url, wins over host and port
    pub url: Option<String>,
    pub host: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub http: HttpClientConfig,
}

fn default_port() -> u16 {
    80
}

impl Esp32Settings {
    pub fn base_url(&self) -> anyhow::Result<String> {
        match (&self.url, &self.host) {
            (Some(url), _) => Ok(url.trim_end_matches('/').to_string()),
            (None, Some(host)) => Ok(format!("http://{}:{}", host, self.port)),
            (None, None) => bail!("Neither url nor host of the ESP32 device is configured"),
        }
    }

    pub fn new_client(&self) -> anyhow::Result<Esp32HttpClient> {
        Esp32HttpClient::new(&self.base_url()?, &self.http)
    }
}

#[derive(Debug, Clone)]
pub struct Esp32HttpClient {
    client: ClientWithMiddleware,
    base_url: String,
}

impl Esp32HttpClient {
    pub fn new(base_url: &str, config: &HttpClientConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: config.new_tracing_client()?,
            base_url: base_url.to_owned(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        send(self.client.get(self.url(path))).await
    }

    async fn post_json<B: Serialize>(&self, path: &str, body: &B) -> Result<Ack, TransportError> {
        send(self.client.post(self.url(path)).json(body)).await.map(Ack)
    }
}

async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, TransportError> {
    let response = request.send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::Status(status.as_u16()));
    }

    let body = response.text().await?;
    parse(&body)
}

//an empty body is a valid acknowledgement
fn parse<T: DeserializeOwned>(body: &str) -> Result<T, TransportError> {
    let body = body.trim();
    let result = if body.is_empty() {
        serde_json::from_value(serde_json::Value::Null)
    } else {
        serde_json::from_str(body)
    };

    result.map_err(TransportError::Malformed)
}

impl DeviceApi for Esp32HttpClient {
    async fn fetch_reading(&self) -> Result<DeviceReading, TransportError> {
        let payload: DevicePayload = self.get_json("/dados").await?;
        Ok(payload.into_reading(DateTime::now()))
    }

    #[tracing::instrument(skip(self))]
    async fn set_pump(&self, on: bool) -> Result<Ack, TransportError> {
        self.post_json("/bomba", &PumpRequest { ligada: on }).await
    }

    #[tracing::instrument(skip(self))]
    async fn apply_configuration(&self, update: &ConfigurationUpdate) -> Result<Ack, TransportError> {
        self.post_json("/config", &ConfigRequest::from(update)).await
    }

    async fn probe(&self) -> bool {
        let response = self
            .client
            .get(self.url("/"))
            .header(header::ACCEPT, "text/html")
            .send()
            .await;

        match response {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("Probe of {} failed: {}", self.base_url, e);
                false
            }
        }
    }
}
