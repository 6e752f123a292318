use opentelemetry::{KeyValue, global, trace::TracerProvider};
use opentelemetry_sdk::{
    Resource,
    propagation::TraceContextPropagator,
    trace::{SdkTracer, SdkTracerProvider},
};
use opentelemetry_stdout::SpanExporter;
use tracing::Subscriber;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{EnvFilter, fmt::format::Format, prelude::*, registry::LookupSpan};

use crate::{
    config::{AppConfig, TracingConfig},
    error::{AppError, AppResult},
};

/// Installed tracing pipeline.
///
/// Keep it alive for the lifetime of the process and call
/// [`Tracer::shutdown`] before exiting to flush pending spans.
#[derive(Debug)]
pub struct Tracer {
    provider: Option<SdkTracerProvider>,
}

impl Tracer {
    /// Installs tracing as configured. `Memory` installs nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if a global subscriber is already installed.
    pub fn install(config: &AppConfig) -> AppResult<Self> {
        match config.tracing {
            TracingConfig::Memory => Ok(Self { provider: None }),
            TracingConfig::Stdout => Self::install_stdout(config),
        }
    }

    /// Installs stdout tracing with OpenTelemetry.
    ///
    /// # Errors
    ///
    /// Returns an error if a global subscriber is already installed.
    pub fn install_stdout(config: &AppConfig) -> AppResult<Self> {
        global::set_text_map_propagator(TraceContextPropagator::new());

        let mut resource = Resource::builder().with_service_name(config.distribution.name.clone());
        if let Some(version) = config.distribution.version.clone() {
            resource = resource.with_attribute(KeyValue::new("version", version));
        }

        let provider = SdkTracerProvider::builder()
            .with_resource(resource.build())
            .with_simple_exporter(SpanExporter::default())
            .build();
        global::set_tracer_provider(provider.clone());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .event_format(Format::default().pretty())
            .with_filter(EnvFilter::from_default_env());
        let otel_layer = span_layer(&provider, &config.distribution.name)
            .with_filter(EnvFilter::from_default_env());

        tracing_subscriber::registry()
            .with(fmt_layer)
            .with(otel_layer)
            .try_init()
            .map_err(|err| AppError::Internal(err.into()))?;

        Ok(Self {
            provider: Some(provider),
        })
    }

    pub fn shutdown(self) {
        if let Some(provider) = self.provider {
            if let Err(err) = provider.shutdown() {
                eprintln!("failed to shut down tracer provider: {err}");
            }
        }
    }
}

/// Bridges `tracing` spans into the provider's exporter.
pub fn span_layer<S>(provider: &SdkTracerProvider, name: &str) -> OpenTelemetryLayer<S, SdkTracer>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    tracing_opentelemetry::layer().with_tracer(provider.tracer(name.to_string()))
}
