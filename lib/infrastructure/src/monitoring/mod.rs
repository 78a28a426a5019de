pub mod meter;

use std::error::Error;
use std::time::Duration;

use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::{ExporterBuildError, WithExportConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

//KNOWN ISSUES:
// - EnvFilter on layer-level looses log-statements, therefore every layer gets its own filter instance

#[derive(Debug, Clone, serde::Deserialize)]
pub struct MonitoringConfig {
    pub service_name: String,
    pub logs: EnvFilterConfig,
    #[serde(default)]
    pub traces: Option<EnvFilterConfig>,
    #[serde(default)]
    pub otlp: Option<OtlpConfig>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct EnvFilterConfig {
    pub default_level: String,
    #[serde(default)]
    pub filters: Vec<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct OtlpConfig {
    pub url: Option<String>,
    #[serde(default = "default_metrics_interval_secs")]
    pub metrics_interval_secs: u64,
}

fn default_metrics_interval_secs() -> u64 {
    15
}

impl TryInto<EnvFilter> for EnvFilterConfig {
    type Error = tracing_subscriber::filter::ParseError;

    fn try_into(self) -> Result<EnvFilter, Self::Error> {
        EnvFilter::builder()
            .with_default_directive(self.default_level.parse()?)
            .parse(self.filters.join(","))
    }
}

impl MonitoringConfig {
    pub fn init(&self) -> Result<(), Box<dyn Error>> {
        let Some(otlp_config) = &self.otlp else {
            let logging_filter: EnvFilter = self.logs.clone().try_into()?;
            tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer())
                .with(logging_filter)
                .init();
            return Ok(());
        };

        let resource = Resource::builder()
            .with_attribute(KeyValue::new("service.name", self.service_name.clone()))
            .build();

        opentelemetry::global::set_text_map_propagator(TraceContextPropagator::default());

        let fmt_filter: EnvFilter = self.logs.clone().try_into()?;
        let fmt_layer = tracing_subscriber::fmt::layer().with_filter(fmt_filter);

        let logger_provider = init_logs(resource.clone(), otlp_config.url.clone())?;
        let logging_filter: EnvFilter = self.logs.clone().try_into()?;
        let logging_layer = OpenTelemetryTracingBridge::new(&logger_provider).with_filter(logging_filter);

        let tracer_provider = init_traces(resource.clone(), otlp_config.url.clone())?;
        let tracer = tracer_provider.tracer(self.service_name.clone());
        let tracing_filter: EnvFilter = self.traces.clone().unwrap_or_else(|| self.logs.clone()).try_into()?;
        let tracing_layer = OpenTelemetryLayer::new(tracer).with_filter(tracing_filter);

        let metrics = init_metrics(
            resource,
            otlp_config.url.clone(),
            Duration::from_secs(otlp_config.metrics_interval_secs),
        )?;
        opentelemetry::global::set_meter_provider(metrics);

        tracing_subscriber::registry()
            .with(tracing_layer)
            .with(logging_layer)
            .with(fmt_layer)
            .init();

        Ok(())
    }
}

fn init_traces(resource: Resource, url: Option<String>) -> Result<SdkTracerProvider, ExporterBuildError> {
    let builder = SdkTracerProvider::builder().with_resource(resource);

    match url {
        Some(url) => {
            let exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(url)
                .build()?;
            Ok(builder.with_batch_exporter(exporter).build())
        }
        None => Ok(builder
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build()),
    }
}

fn init_metrics(resource: Resource, url: Option<String>, interval: Duration) -> Result<SdkMeterProvider, ExporterBuildError> {
    let builder = SdkMeterProvider::builder().with_resource(resource);

    //PeriodicReader is generic over the exporter, so each arm builds its own provider
    match url {
        Some(url) => {
            let exporter = opentelemetry_otlp::MetricExporter::builder()
                .with_tonic()
                .with_endpoint(url)
                .build()?;
            Ok(builder
                .with_reader(PeriodicReader::builder(exporter).with_interval(interval).build())
                .build())
        }
        None => Ok(builder
            .with_reader(
                PeriodicReader::builder(opentelemetry_stdout::MetricExporter::default())
                    .with_interval(interval)
                    .build(),
            )
            .build()),
    }
}

fn init_logs(resource: Resource, url: Option<String>) -> Result<SdkLoggerProvider, ExporterBuildError> {
    let builder = SdkLoggerProvider::builder().with_resource(resource);

    match url {
        Some(url) => {
            let exporter = opentelemetry_otlp::LogExporter::builder()
                .with_tonic()
                .with_endpoint(url)
                .build()?;
            Ok(builder.with_batch_exporter(exporter).build())
        }
        None => Ok(builder
            .with_simple_exporter(opentelemetry_stdout::LogExporter::default())
            .build()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_from_config() {
        let config = EnvFilterConfig {
            default_level: "info".to_string(),
            filters: vec!["irrigation=debug".to_string(), "reqwest=warn".to_string()],
        };

        let filter: Result<EnvFilter, _> = config.try_into();
        assert!(filter.is_ok());
    }

    #[test]
    fn test_invalid_default_level_is_rejected() {
        let config = EnvFilterConfig {
            default_level: "irrigation=loud".to_string(),
            filters: vec![],
        };

        let filter: Result<EnvFilter, _> = config.try_into();
        assert!(filter.is_err());
    }

    #[test]
    fn test_stdout_meter_provider() {
        let resource = Resource::builder()
            .with_attribute(KeyValue::new("service.name", "irrigation"))
            .build();

        let provider = init_metrics(resource, None, Duration::from_secs(15));

        assert!(provider.is_ok());
    }
}
