//! Metrics definitions for the generator.

use shared::metrics_defs::{MetricDef, MetricType};

pub const VALUES_SENT: MetricDef = MetricDef {
    name: "generator.values.sent",
    metric_type: MetricType::Counter,
    description: "Number of values posted to the first stage",
};

pub const ALL_METRICS: &[MetricDef] = &[VALUES_SENT];
