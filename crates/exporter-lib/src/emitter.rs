//! Conversion of scrape reports into Prometheus metric families
//!
//! Descriptors are built once at startup and handed to the emitter. Every
//! scrape renders into its own short-lived registry, so concurrent scrapes
//! never write into each other's gauges.

use crate::aggregation::{FleetKey, FrequencyTable, QueueKey, ScrapeReport, TableKey, FLEET_LABELS};
use prometheus::{proto::MetricFamily, Gauge, GaugeVec, Opts, Registry};

/// Namespace of the TeamCity metrics
pub const NAMESPACE: &str = "teamcity";

/// Name, help text and label names of one exposed metric
#[derive(Debug, Clone)]
pub struct MetricDescriptor {
    pub name: &'static str,
    pub help: &'static str,
    pub labels: Vec<&'static str>,
}

impl MetricDescriptor {
    fn opts(&self) -> Opts {
        Opts::new(self.name, self.help).namespace(NAMESPACE)
    }
}

/// Descriptors of every metric a scrape exposes
#[derive(Debug, Clone)]
pub struct MetricDescriptors {
    pub up: MetricDescriptor,
    pub queue_size: MetricDescriptor,
    pub queue_wait: MetricDescriptor,
    pub agent_type: MetricDescriptor,
}

impl MetricDescriptors {
    /// `queue_os_flags` must match the scraper's setting
    pub fn new(queue_os_flags: bool) -> Self {
        Self {
            up: MetricDescriptor {
                name: "up",
                help: "Was the last query of TeamCity successful",
                labels: Vec::new(),
            },
            queue_size: MetricDescriptor {
                name: "build_queue_size",
                help: "How many builds are in the queue",
                labels: Vec::new(),
            },
            queue_wait: MetricDescriptor {
                name: "build_queue_wait_count",
                help: "How many builds in queue waiting in queue",
                labels: QueueKey::label_names(queue_os_flags),
            },
            agent_type: MetricDescriptor {
                name: "agent_type_count",
                help: "How many agents by metadata",
                labels: FLEET_LABELS.to_vec(),
            },
        }
    }
}

/// Renders scrape reports as metric families
#[derive(Debug, Clone)]
pub struct ObservationEmitter {
    descriptors: MetricDescriptors,
}

impl ObservationEmitter {
    pub fn new(descriptors: MetricDescriptors) -> Self {
        Self { descriptors }
    }

    /// Metric families for one scrape
    ///
    /// `up` is always present. The queue size is present whenever the queue
    /// listing was fetched. Tables contribute one sample per leaf and nothing
    /// when empty.
    pub fn emit(&self, report: &ScrapeReport) -> prometheus::Result<Vec<MetricFamily>> {
        let registry = Registry::new();

        let up = Gauge::with_opts(self.descriptors.up.opts())?;
        up.set(if report.up { 1.0 } else { 0.0 });
        registry.register(Box::new(up))?;

        if !report.up {
            return Ok(registry.gather());
        }

        if let Some(size) = report.queue_size {
            let queue_size = Gauge::with_opts(self.descriptors.queue_size.opts())?;
            queue_size.set(size as f64);
            registry.register(Box::new(queue_size))?;
        }

        let queue_wait = self.table_gauge(&self.descriptors.queue_wait, &report.queue)?;
        registry.register(Box::new(queue_wait))?;

        if let Some(fleet) = &report.fleet {
            let agent_type = self.table_gauge::<FleetKey>(&self.descriptors.agent_type, fleet)?;
            registry.register(Box::new(agent_type))?;
        }

        Ok(registry.gather())
    }

    fn table_gauge<K: TableKey>(
        &self,
        descriptor: &MetricDescriptor,
        table: &FrequencyTable<K>,
    ) -> prometheus::Result<GaugeVec> {
        let gauge = GaugeVec::new(descriptor.opts(), &descriptor.labels)?;
        for observation in table.observations() {
            let values: Vec<&str> = observation.labels.iter().map(String::as_str).collect();
            gauge
                .get_metric_with_label_values(&values)?
                .set(observation.value as f64);
        }
        Ok(gauge)
    }
}
