//! Metrics definitions for a relay stage.

use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "request.duration",
    metric_type: MetricType::Histogram,
    description: "Request duration in seconds",
};

pub const REQUESTS_INFLIGHT: MetricDef = MetricDef {
    name: "requests.inflight",
    metric_type: MetricType::Gauge,
    description: "Number of requests currently being processed",
};

pub const RECORDS_ACCEPTED: MetricDef = MetricDef {
    name: "records.accepted",
    metric_type: MetricType::Counter,
    description: "Number of records appended to the value store",
};

pub const RECORDS_STORED: MetricDef = MetricDef {
    name: "records.stored",
    metric_type: MetricType::Gauge,
    description: "Number of records currently held by the value store",
};

pub const DECODE_FAILURES: MetricDef = MetricDef {
    name: "decode.failures",
    metric_type: MetricType::Counter,
    description: "Number of inbound bodies rejected before reaching the store",
};

pub const RELAY_FAILURES: MetricDef = MetricDef {
    name: "relay.failures",
    metric_type: MetricType::Counter,
    description: "Number of values that could not be forwarded downstream",
};

pub const ALL_METRICS: &[MetricDef] = &[
    REQUEST_DURATION,
    REQUESTS_INFLIGHT,
    RECORDS_ACCEPTED,
    RECORDS_STORED,
    DECODE_FAILURES,
    RELAY_FAILURES,
];
