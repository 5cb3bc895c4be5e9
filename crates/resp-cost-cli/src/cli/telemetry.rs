//! # Telemetry Features
//!
//! Console logging through `tracing-subscriber` is always on. OpenTelemetry
//! export is optional.
//!
//! ## Feature matrix
//!
//! - `tracing`: export spans from the loader, the reclaim monitor and the
//!   populate session.
//! - `metrics`: export counters and histograms for every run.
//! - `stdout`: print both through the OpenTelemetry stdout exporter.
//!
//! ## Feature constraints
//!
//! - `stdout` requires at least one of `tracing` or `metrics`.
//!
//! ## Example usage
//!
//! ```bash
//! cargo run --features tracing,metrics,stdout -- populate -e -c 100000
//! ```
//!
//! `RUST_LOG` controls the console filter and defaults to `info`.

#[cfg(all(feature = "stdout", not(any(feature = "tracing", feature = "metrics"))))]
compile_error!(
    "The 'stdout' feature requires at least one of 'tracing' or 'metrics' to be enabled."
);

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "metrics")]
use opentelemetry::metrics::{Counter, Histogram, Meter};
#[cfg(feature = "metrics")]
use opentelemetry_sdk::metrics as sdkmetrics;
#[cfg(feature = "metrics")]
use std::sync::OnceLock;

#[cfg(any(feature = "metrics", feature = "tracing"))]
use opentelemetry::{InstrumentationScope, KeyValue};
#[cfg(any(feature = "metrics", feature = "tracing"))]
use opentelemetry_sdk::Resource;
#[cfg(any(feature = "metrics", feature = "tracing"))]
use opentelemetry_semantic_conventions as semvcns;

#[cfg(feature = "tracing")]
use opentelemetry::trace::TracerProvider;
#[cfg(feature = "tracing")]
use opentelemetry_sdk::trace as sdktrace;

pub struct TelemetryProviders {
    #[cfg(feature = "tracing")]
    pub tracer_provider: sdktrace::SdkTracerProvider,
    #[cfg(feature = "metrics")]
    pub meter_provider: sdkmetrics::SdkMeterProvider,
}

impl TelemetryProviders {
    /// Flushes pending exports. Errors go to stderr since the subscriber may
    /// already be gone.
    pub fn shutdown(self) {
        #[cfg(feature = "tracing")]
        {
            if let Err(err) = self.tracer_provider.force_flush() {
                eprintln!("Error flushing traces: {err:#?}");
            }
            if let Err(err) = self.tracer_provider.shutdown() {
                eprintln!("Error shutting down tracer: {err:#?}");
            }
        }

        #[cfg(feature = "metrics")]
        {
            if let Err(err) = self.meter_provider.force_flush() {
                eprintln!("Error flushing metrics: {err:#?}");
            }
            if let Err(err) = self.meter_provider.shutdown() {
                eprintln!("Error shutting down meter: {err:#?}");
            }
        }
    }
}

pub fn init_telemetry() -> anyhow::Result<TelemetryProviders> {
    #[cfg(feature = "tracing")]
    let tracer_provider = init_tracer();

    #[cfg(feature = "metrics")]
    let meter_provider = init_metrics();

    #[cfg(any(feature = "metrics", feature = "tracing"))]
    let scope = InstrumentationScope::builder("resp-cost")
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_schema_url(semvcns::SCHEMA_URL)
        .build();

    // Logs go to stderr so that stdout carries only results.
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true),
        );

    #[cfg(feature = "tracing")]
    let registry = {
        opentelemetry::global::set_tracer_provider(tracer_provider.clone());
        registry.with(
            tracing_opentelemetry::layer()
                .with_tracer(tracer_provider.tracer_with_scope(scope.clone()))
                .with_error_records_to_exceptions(true),
        )
    };

    #[cfg(feature = "metrics")]
    let registry = {
        opentelemetry::global::set_meter_provider(meter_provider.clone());
        let meter = opentelemetry::global::meter_with_scope(scope);
        init_metric_handles(meter);

        registry.with(tracing_opentelemetry::MetricsLayer::new(
            meter_provider.clone(),
        ))
    };

    registry.try_init()?;

    Ok(TelemetryProviders {
        #[cfg(feature = "tracing")]
        tracer_provider,
        #[cfg(feature = "metrics")]
        meter_provider,
    })
}

#[cfg(any(feature = "metrics", feature = "tracing"))]
fn resource() -> Resource {
    Resource::builder()
        .with_service_name("resp-cost")
        .with_schema_url(
            [KeyValue::new(
                semvcns::resource::SERVICE_VERSION,
                env!("CARGO_PKG_VERSION"),
            )],
            semvcns::SCHEMA_URL,
        )
        .build()
}

#[cfg(feature = "metrics")]
fn init_metrics() -> sdkmetrics::SdkMeterProvider {
    let builder = sdkmetrics::SdkMeterProvider::builder().with_resource(resource());

    #[cfg(feature = "stdout")]
    let builder = {
        use opentelemetry_stdout::MetricExporter;
        let exporter = MetricExporter::default();
        let reader = sdkmetrics::PeriodicReader::builder(exporter)
            .with_interval(std::time::Duration::from_secs(5))
            .build();

        builder.with_reader(reader)
    };

    builder.build()
}

#[cfg(feature = "tracing")]
fn init_tracer() -> sdktrace::SdkTracerProvider {
    let builder = sdktrace::SdkTracerProvider::builder().with_resource(resource());

    #[cfg(feature = "stdout")]
    let builder = {
        use opentelemetry_stdout::SpanExporter;
        let batch = sdktrace::BatchSpanProcessor::builder(SpanExporter::default())
            .with_batch_config(
                sdktrace::BatchConfigBuilder::default()
                    .with_scheduled_delay(std::time::Duration::from_secs(5))
                    .with_max_queue_size(2048)
                    .build(),
            )
            .build();
        builder.with_span_processor(batch)
    };

    builder.build()
}

#[cfg(feature = "metrics")]
static KEYS_WRITTEN: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static WRITE_ERRORS: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static LOAD_DURATION_MS: OnceLock<Histogram<f64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static RECLAIM_POLLS: OnceLock<Histogram<u64>> = OnceLock::new();

#[cfg(feature = "metrics")]
fn init_metric_handles(meter: Meter) {
    let _ = KEYS_WRITTEN.set(
        meter
            .u64_counter("keys_written")
            .with_description("Keys acknowledged by the store")
            .build(),
    );

    let _ = WRITE_ERRORS.set(
        meter
            .u64_counter("write_errors")
            .with_description("Bulk loads aborted by a failed write")
            .build(),
    );

    let _ = LOAD_DURATION_MS.set(
        meter
            .f64_histogram("load_duration")
            .with_unit("ms")
            .with_description("Wall-clock duration of one bulk load")
            .build(),
    );

    let _ = RECLAIM_POLLS.set(
        meter
            .u64_histogram("reclaim_polls")
            .with_description("INFO samples taken before memory settled")
            .build(),
    );
}

#[cfg(feature = "metrics")]
pub fn increment_keys_written(count: u64) {
    if let Some(counter) = KEYS_WRITTEN.get() {
        counter.add(count, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_keys_written(_count: u64) {}

#[cfg(feature = "metrics")]
pub fn increment_write_errors() {
    if let Some(counter) = WRITE_ERRORS.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_write_errors() {}

#[cfg(feature = "metrics")]
pub fn record_load_duration(duration_ms: f64) {
    if let Some(histogram) = LOAD_DURATION_MS.get() {
        histogram.record(duration_ms, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn record_load_duration(_duration_ms: f64) {}

#[cfg(feature = "metrics")]
pub fn record_reclaim_polls(polls: u64) {
    if let Some(histogram) = RECLAIM_POLLS.get() {
        histogram.record(polls, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn record_reclaim_polls(_polls: u64) {}
