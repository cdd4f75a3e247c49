//! BGP session state from `/rest/routing/bgp/session`.

use std::sync::Arc;

use async_trait::async_trait;

use super::Collector;
use crate::decode::{decode_duration, decode_flag, decode_float, flag_value};
use crate::device::{Device, DeviceError, ResourceRecord};
use crate::metric::{MetricDesc, MetricSample, SampleBuffer};

const RESOURCE_PATH: &str = "routing/bgp/session";

const LABELS: &[&str] = &["name"];

pub struct BgpCollector {
    session_up: Arc<MetricDesc>,
    /// Float-valued families keyed by their RouterOS field.
    numeric: Vec<(&'static str, Arc<MetricDesc>)>,
    uptime: Arc<MetricDesc>,
    info: Arc<MetricDesc>,
}

impl BgpCollector {
    pub fn new(namespace: &str) -> Self {
        let numeric = vec![
            (
                "prefix-count",
                MetricDesc::gauge(
                    namespace,
                    "bgp_session_prefix_count",
                    "Number of prefixes in BGP session",
                    LABELS,
                ),
            ),
            (
                "remote.bytes",
                MetricDesc::counter(
                    namespace,
                    "bgp_session_remote_bytes_total",
                    "Total bytes received from remote BGP peer",
                    LABELS,
                ),
            ),
            (
                "remote.messages",
                MetricDesc::counter(
                    namespace,
                    "bgp_session_remote_messages_total",
                    "Total messages received from remote BGP peer",
                    LABELS,
                ),
            ),
            (
                "local.bytes",
                MetricDesc::counter(
                    namespace,
                    "bgp_session_local_bytes_total",
                    "Total bytes sent to remote BGP peer",
                    LABELS,
                ),
            ),
            (
                "local.messages",
                MetricDesc::counter(
                    namespace,
                    "bgp_session_local_messages_total",
                    "Total messages sent to remote BGP peer",
                    LABELS,
                ),
            ),
        ];

        Self {
            session_up: MetricDesc::gauge(
                namespace,
                "bgp_session_up",
                "BGP session status (1 = established, 0 = not established)",
                LABELS,
            ),
            numeric,
            uptime: MetricDesc::gauge(
                namespace,
                "bgp_session_uptime",
                "BGP session uptime in seconds",
                LABELS,
            ),
            info: MetricDesc::gauge(
                namespace,
                "bgp_session_info",
                "BGP session information",
                &[
                    "name",
                    "remote_address",
                    "remote_id",
                    "remote_as",
                    "local_address",
                    "local_id",
                    "local_as",
                ],
            ),
        }
    }

    fn process(&self, records: &[ResourceRecord]) -> Vec<MetricSample> {
        let mut buffer = SampleBuffer::new();

        for record in records {
            let name = record.get("name");
            if name.is_empty() {
                continue;
            }
            let labels = [name];

            buffer.push(
                &self.session_up,
                flag_value(decode_flag(record.get("established"), "true")),
                &labels,
            );

            for (field, desc) in &self.numeric {
                buffer.push_some(desc, decode_float(record.get(field)), &labels);
            }

            buffer.push_some(
                &self.uptime,
                decode_duration(record.get("uptime")).map(|s| s as f64),
                &labels,
            );

            buffer.push(
                &self.info,
                1.0,
                &[
                    name,
                    record.get("remote.address"),
                    record.get("remote.id"),
                    record.get("remote.as"),
                    record.get("local.address"),
                    record.get("local.id"),
                    record.get("local.as"),
                ],
            );
        }

        buffer.into_samples()
    }
}

#[async_trait]
impl Collector for BgpCollector {
    fn name(&self) -> &'static str {
        "bgp"
    }

    fn describe(&self) -> Vec<Arc<MetricDesc>> {
        let mut descs = vec![self.session_up.clone()];
        descs.extend(self.numeric.iter().map(|(_, d)| d.clone()));
        descs.push(self.uptime.clone());
        descs.push(self.info.clone());
        descs
    }

    async fn collect(&self, device: &Device) -> Result<Vec<MetricSample>, DeviceError> {
        let records = device.fetch(RESOURCE_PATH).await?;
        Ok(self.process(&records))
    }
}
