//! The fixed catalog of collector self-telemetry queries
//!
//! Every query targets the collector's own metrics as scraped under the
//! `otel-collector-self` job. The catalog is ordered: reports are produced and
//! summarized in the order the entries appear here.

use std::fmt;

/// Display unit attached to a [`MetricDefinition`]
///
/// The unit decides how a sample is rendered by
/// [`crate::format::format_value`]. `Items` and `Count` carry no scaling and
/// render as plain numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    /// A quantity of bytes, rendered in the largest fitting 1024-based unit.
    Bytes,
    /// A fraction, rendered as a percentage.
    Ratio,
    /// A per-second rate.
    Ops,
    /// A duration in seconds, rendered in hours, minutes or seconds.
    Seconds,
    /// A number of items.
    Items,
    /// A plain count.
    Count,
}

impl Unit {
    /// The tag used for this unit in reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Unit::Bytes => "bytes",
            Unit::Ratio => "ratio",
            Unit::Ops => "ops",
            Unit::Seconds => "seconds",
            Unit::Items => "items",
            Unit::Count => "count",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named range query against the metrics backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDefinition {
    /// Unique name, also the stem of the report filename.
    pub name: &'static str,
    /// The PromQL expression to evaluate.
    pub query: &'static str,
    /// Human readable description, copied into reports and the summary.
    pub description: &'static str,
    /// How sample values are rendered.
    pub unit: Unit,
}

const fn metric(
    name: &'static str,
    query: &'static str,
    description: &'static str,
    unit: Unit,
) -> MetricDefinition {
    MetricDefinition {
        name,
        query,
        description,
        unit,
    }
}

/// All exported metrics, in report order.
pub const CATALOG: &[MetricDefinition] = &[
    // Memory overview
    metric(
        "Heap_Alloc_bytes",
        r#"otelcol_process_runtime_heap_alloc_bytes{job="otel-collector-self"}"#,
        "Collector Heap Memory - bytes of heap currently allocated",
        Unit::Bytes,
    ),
    metric(
        "Total_Alloc_bytes",
        r#"otelcol_process_runtime_total_alloc_bytes_total{job="otel-collector-self"}"#,
        "Total Alloc (cumulative) - bytes allocated since start",
        Unit::Bytes,
    ),
    metric(
        "Sys_Memory_bytes",
        r#"otelcol_process_runtime_total_sys_memory_bytes{job="otel-collector-self"}"#,
        "Sys Memory - bytes obtained from the OS",
        Unit::Bytes,
    ),
    metric(
        "RSS_Memory_bytes",
        r#"otelcol_process_memory_rss_bytes{job="otel-collector-self"}"#,
        "RSS (Resident Set Size) - physical memory in use",
        Unit::Bytes,
    ),
    metric(
        "Uptime_seconds",
        r#"otelcol_process_uptime_seconds_total{job="otel-collector-self"}"#,
        "Collector Uptime - time since start",
        Unit::Seconds,
    ),
    metric(
        "CPU_Usage_Rate",
        r#"rate(otelcol_process_cpu_seconds_total{job="otel-collector-self"}[1m])"#,
        "CPU Usage Rate - fraction of one core in use",
        Unit::Ratio,
    ),
    // Receivers
    metric(
        "Receiver_Accepted_Spans_Rate",
        r#"rate(otelcol_receiver_accepted_spans_total{job="otel-collector-self"}[1m])"#,
        "Receiver: rate of accepted spans",
        Unit::Ops,
    ),
    metric(
        "Receiver_Refused_Spans_Rate",
        r#"rate(otelcol_receiver_refused_spans_total{job="otel-collector-self"}[1m])"#,
        "Receiver: rate of refused spans",
        Unit::Ops,
    ),
    metric(
        "Receiver_Accepted_Metrics_Rate",
        r#"rate(otelcol_receiver_accepted_metric_points_total{job="otel-collector-self"}[1m])"#,
        "Receiver: rate of accepted metric points",
        Unit::Ops,
    ),
    metric(
        "Receiver_Refused_Metrics_Rate",
        r#"rate(otelcol_receiver_refused_metric_points_total{job="otel-collector-self"}[1m])"#,
        "Receiver: rate of refused metric points",
        Unit::Ops,
    ),
    metric(
        "Receiver_Accepted_Logs_Rate",
        r#"rate(otelcol_receiver_accepted_log_records_total{job="otel-collector-self"}[1m])"#,
        "Receiver: rate of accepted log records",
        Unit::Ops,
    ),
    metric(
        "Receiver_Refused_Logs_Rate",
        r#"rate(otelcol_receiver_refused_log_records_total{job="otel-collector-self"}[1m])"#,
        "Receiver: rate of refused log records",
        Unit::Ops,
    ),
    // Processors
    metric(
        "Processor_Batch_Avg_Size",
        r#"rate(otelcol_processor_batch_batch_send_size_sum{job="otel-collector-self"}[1m]) / rate(otelcol_processor_batch_batch_send_size_count{job="otel-collector-self"}[1m])"#,
        "Batch Processor: average batch size",
        Unit::Items,
    ),
    metric(
        "Processor_Batch_Metadata_Cardinality",
        r#"otelcol_processor_batch_metadata_cardinality{job="otel-collector-self"}"#,
        "Batch Processor: metadata cardinality",
        Unit::Count,
    ),
    metric(
        "Processor_Batch_Size_Trigger_Rate",
        r#"rate(otelcol_processor_batch_batch_size_trigger_send_total{job="otel-collector-self"}[1m])"#,
        "Batch Processor: rate of size-triggered sends",
        Unit::Ops,
    ),
    metric(
        "Processor_Batch_Timeout_Trigger_Rate",
        r#"rate(otelcol_processor_batch_timeout_trigger_send_total{job="otel-collector-self"}[1m])"#,
        "Batch Processor: rate of timeout-triggered sends",
        Unit::Ops,
    ),
    // Exporters
    metric(
        "Exporter_Sent_Spans_Rate",
        r#"rate(otelcol_exporter_sent_spans_total{job="otel-collector-self"}[1m])"#,
        "Exporter: rate of spans sent successfully",
        Unit::Ops,
    ),
    metric(
        "Exporter_Failed_Spans_Rate",
        r#"rate(otelcol_exporter_send_failed_spans_total{job="otel-collector-self"}[1m])"#,
        "Exporter: rate of spans that failed to send",
        Unit::Ops,
    ),
    metric(
        "Exporter_Sent_Metrics_Rate",
        r#"rate(otelcol_exporter_sent_metric_points_total{job="otel-collector-self"}[1m])"#,
        "Exporter: rate of metric points sent successfully",
        Unit::Ops,
    ),
    metric(
        "Exporter_Failed_Metrics_Rate",
        r#"rate(otelcol_exporter_send_failed_metric_points_total{job="otel-collector-self"}[1m])"#,
        "Exporter: rate of metric points that failed to send",
        Unit::Ops,
    ),
    metric(
        "Exporter_Sent_Logs_Rate",
        r#"rate(otelcol_exporter_sent_log_records_total{job="otel-collector-self"}[1m])"#,
        "Exporter: rate of log records sent successfully",
        Unit::Ops,
    ),
    metric(
        "Exporter_Failed_Logs_Rate",
        r#"rate(otelcol_exporter_send_failed_log_records_total{job="otel-collector-self"}[1m])"#,
        "Exporter: rate of log records that failed to send",
        Unit::Ops,
    ),
    metric(
        "Exporter_Queue_Usage",
        r#"otelcol_exporter_queue_size{job="otel-collector-self"} / otelcol_exporter_queue_capacity{job="otel-collector-self"}"#,
        "Exporter: sending queue utilization",
        Unit::Ratio,
    ),
    metric(
        "Exporter_Enqueue_Failed_Rate",
        r#"rate(otelcol_exporter_enqueue_failed_spans_total{job="otel-collector-self"}[1m])"#,
        "Exporter: rate of spans that failed to enqueue",
        Unit::Ops,
    ),
];
