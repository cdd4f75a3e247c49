//! Board resources from `/rest/system/resource`.

use std::sync::Arc;

use async_trait::async_trait;

use super::Collector;
use crate::decode::{decode_duration, decode_unsigned};
use crate::device::{Device, DeviceError, ResourceRecord};
use crate::metric::{MetricDesc, MetricSample, SampleBuffer};

const RESOURCE_PATH: &str = "system/resource";

const LABELS: &[&str] = &["target"];

pub struct SystemCollector {
    info: Arc<MetricDesc>,
    /// Unsigned families keyed by their RouterOS field.
    unsigned: Vec<(&'static str, Arc<MetricDesc>)>,
    uptime: Arc<MetricDesc>,
}

impl SystemCollector {
    pub fn new(namespace: &str) -> Self {
        let gauge = |field: &'static str, suffix: &str, help: &str| {
            (field, MetricDesc::gauge(namespace, suffix, help, LABELS))
        };

        let unsigned = vec![
            gauge("cpu-count", "system_cpu_cores", "Number of CPU cores"),
            gauge("cpu-frequency", "system_cpu_freq", "CPU frequency in MHz"),
            gauge("cpu-load", "system_cpu_load", "CPU load percentage"),
            gauge(
                "total-hdd-space",
                "system_total_disk",
                "Total disk space in bytes",
            ),
            gauge("free-hdd-space", "system_free_disk", "Free disk space in bytes"),
            gauge("bad-blocks", "system_bad_blocks", "Number of bad blocks"),
            (
                "write-sect-total",
                MetricDesc::counter(
                    namespace,
                    "system_write_sect_total",
                    "Total write sectors",
                    LABELS,
                ),
            ),
            gauge("total-memory", "system_total_memory", "Total memory in bytes"),
            gauge("free-memory", "system_free_memory", "Free memory in bytes"),
        ];

        Self {
            info: MetricDesc::gauge(
                namespace,
                "system_info",
                "System information",
                &["target", "board_name", "cpu_model", "version", "platform"],
            ),
            unsigned,
            uptime: MetricDesc::gauge(
                namespace,
                "system_uptime",
                "System uptime in seconds",
                LABELS,
            ),
        }
    }

    fn process(&self, target: &str, record: &ResourceRecord) -> Vec<MetricSample> {
        let mut buffer = SampleBuffer::new();
        let labels = [target];

        buffer.push(
            &self.info,
            1.0,
            &[
                target,
                record.get("board-name"),
                record.get("cpu"),
                record.get("version"),
                record.get("platform"),
            ],
        );

        for (field, desc) in &self.unsigned {
            buffer.push_some(
                desc,
                decode_unsigned(record.get(field)).map(|v| v as f64),
                &labels,
            );
        }

        buffer.push_some(
            &self.uptime,
            decode_duration(record.get("uptime")).map(|s| s as f64),
            &labels,
        );

        buffer.into_samples()
    }
}

#[async_trait]
impl Collector for SystemCollector {
    fn name(&self) -> &'static str {
        "system"
    }

    fn describe(&self) -> Vec<Arc<MetricDesc>> {
        let mut descs = vec![self.info.clone()];
        descs.extend(self.unsigned.iter().map(|(_, d)| d.clone()));
        descs.push(self.uptime.clone());
        descs
    }

    async fn collect(&self, device: &Device) -> Result<Vec<MetricSample>, DeviceError> {
        let record = device.fetch_one(RESOURCE_PATH).await?;
        Ok(self.process(device.target(), &record))
    }
}
