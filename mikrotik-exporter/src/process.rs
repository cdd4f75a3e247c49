//! The exporter's own metrics, served on `/metrics`.
//!
//! A fresh registry is built on every scrape from the startup constants and
//! the current process state, so nothing here is shared or mutated between
//! requests.

use std::sync::atomic::AtomicU64;
use std::time::Instant;

use chrono::{DateTime, Utc};
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

/// Content type of the rendered body.
pub const CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

type Labels = Vec<(String, String)>;

/// Startup facts needed to describe the running exporter.
#[derive(Debug, Clone)]
pub struct SelfMetrics {
    started_at: DateTime<Utc>,
    started: Instant,
    collectors: usize,
}

impl SelfMetrics {
    pub fn new(collectors: usize) -> Self {
        Self {
            started_at: Utc::now(),
            started: Instant::now(),
            collectors,
        }
    }

    /// Encode the current metrics in OpenMetrics text format.
    pub fn render(&self) -> Result<String, std::fmt::Error> {
        let mut registry = Registry::default();

        {
            let exporter = registry.sub_registry_with_prefix("mikrotik_exporter");

            let build_info = Family::<Labels, Gauge>::default();
            build_info
                .get_or_create(&vec![(
                    "version".to_string(),
                    env!("CARGO_PKG_VERSION").to_string(),
                )])
                .set(1);
            exporter.register("build_info", "Exporter build information", build_info);

            let start_time = Gauge::<i64>::default();
            start_time.set(self.started_at.timestamp());
            exporter.register(
                "start_time_seconds",
                "Exporter start time since the Unix epoch in seconds",
                start_time,
            );

            let uptime = Gauge::<f64, AtomicU64>::default();
            uptime.set(self.started.elapsed().as_secs_f64());
            exporter.register("uptime_seconds", "Exporter uptime in seconds", uptime);

            let collectors = Gauge::<i64>::default();
            collectors.set(self.collectors as i64);
            exporter.register(
                "collectors",
                "Number of registered device collectors",
                collectors,
            );
        }

        #[cfg(target_os = "linux")]
        register_process_metrics(registry.sub_registry_with_prefix("process"));

        let mut body = String::new();
        encode(&mut body, &registry)?;
        Ok(body)
    }
}

/// Process resource usage from `/proc/self`.
///
/// Unreadable entries are left out rather than reported as zero.
#[cfg(target_os = "linux")]
fn register_process_metrics(registry: &mut Registry) {
    use prometheus_client::metrics::counter::Counter;

    let process = match procfs::process::Process::myself() {
        Ok(process) => process,
        Err(e) => {
            tracing::debug!(error = %e, "Failed to open /proc/self");
            return;
        }
    };

    if let Ok(stat) = process.stat() {
        let resident = Gauge::<i64>::default();
        resident.set((stat.rss * procfs::page_size()) as i64);
        registry.register(
            "resident_memory_bytes",
            "Resident memory size in bytes",
            resident,
        );

        let virtual_memory = Gauge::<i64>::default();
        virtual_memory.set(stat.vsize as i64);
        registry.register(
            "virtual_memory_bytes",
            "Virtual memory size in bytes",
            virtual_memory,
        );

        let ticks = procfs::ticks_per_second() as f64;
        let cpu = Counter::<f64, AtomicU64>::default();
        cpu.inc_by((stat.utime + stat.stime) as f64 / ticks);
        registry.register(
            "cpu_seconds",
            "Total user and system CPU time spent in seconds",
            cpu,
        );

        let threads = Gauge::<i64>::default();
        threads.set(stat.num_threads);
        registry.register("threads", "Number of OS threads", threads);
    }

    if let Ok(fds) = process.fd_count() {
        let open_fds = Gauge::<i64>::default();
        open_fds.set(fds as i64);
        registry.register("open_fds", "Number of open file descriptors", open_fds);
    }
}
