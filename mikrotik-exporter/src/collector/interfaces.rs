//! Interface status and traffic counters from `/rest/interface`.

use std::sync::Arc;

use async_trait::async_trait;

use super::Collector;
use crate::decode::{decode_flag, decode_timestamp, decode_unsigned, flag_value};
use crate::device::{Device, DeviceError, ResourceRecord};
use crate::metric::{MetricDesc, MetricSample, SampleBuffer};

const RESOURCE_PATH: &str = "interface";

const BASIC_LABELS: &[&str] = &["name", "type"];
const ALL_LABELS: &[&str] = &["mac", "name", "type", "comment"];

/// Unsigned counters and gauges keyed by their RouterOS field.
struct UnsignedMetric {
    field: &'static str,
    desc: Arc<MetricDesc>,
}

pub struct InterfacesCollector {
    enabled: Arc<MetricDesc>,
    up: Arc<MetricDesc>,
    unsigned: Vec<UnsignedMetric>,
    last_link_up: Arc<MetricDesc>,
    last_link_down: Arc<MetricDesc>,
}

impl InterfacesCollector {
    pub fn new(namespace: &str) -> Self {
        let counter = |field: &'static str, suffix: &str, help: &str| UnsignedMetric {
            field,
            desc: MetricDesc::counter(namespace, suffix, help, BASIC_LABELS),
        };

        let unsigned = vec![
            counter(
                "rx-byte",
                "interface_rx_bytes_total",
                "Number of bytes received on interface",
            ),
            counter(
                "rx-packet",
                "interface_rx_packets_total",
                "Number of packets received on interface",
            ),
            counter(
                "fp-rx-byte",
                "interface_fp_rx_bytes_total",
                "Number of fast path bytes received on interface",
            ),
            counter(
                "fp-rx-packet",
                "interface_fp_rx_packets_total",
                "Number of fast path packets received on interface",
            ),
            counter(
                "tx-byte",
                "interface_tx_bytes_total",
                "Number of bytes transmitted on interface",
            ),
            counter(
                "tx-packet",
                "interface_tx_packets_total",
                "Number of packets transmitted on interface",
            ),
            counter(
                "fp-tx-byte",
                "interface_fp_tx_bytes_total",
                "Number of fast path bytes transmitted on interface",
            ),
            counter(
                "fp-tx-packet",
                "interface_fp_tx_packets_total",
                "Number of fast path packets transmitted on interface",
            ),
            counter(
                "tx-queue-drop",
                "interface_tx_queue_drop_total",
                "Number of packets dropped from TX queue",
            ),
            UnsignedMetric {
                field: "mtu",
                desc: MetricDesc::gauge(
                    namespace,
                    "interface_mtu",
                    "Interface MTU in bytes",
                    BASIC_LABELS,
                ),
            },
            counter(
                "link-downs",
                "interface_link_downs_total",
                "Number of link down events",
            ),
        ];

        Self {
            enabled: MetricDesc::gauge(
                namespace,
                "interface_enabled",
                "Interface enabled status (1 = enabled, 0 = disabled)",
                BASIC_LABELS,
            ),
            up: MetricDesc::gauge(
                namespace,
                "interface_up",
                "Interface running status (1 = running, 0 = not running)",
                ALL_LABELS,
            ),
            unsigned,
            last_link_up: MetricDesc::gauge(
                namespace,
                "interface_last_link_up_time",
                "Last link up time (Unix timestamp)",
                BASIC_LABELS,
            ),
            last_link_down: MetricDesc::gauge(
                namespace,
                "interface_last_link_down_time",
                "Last link down time (Unix timestamp)",
                BASIC_LABELS,
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

            let basic = [name, record.get("type")];
            let all = [
                record.get("mac-address"),
                name,
                record.get("type"),
                record.get("comment"),
            ];

            buffer.push(
                &self.enabled,
                flag_value(!decode_flag(record.get("disabled"), "true")),
                &basic,
            );
            buffer.push(
                &self.up,
                flag_value(decode_flag(record.get("running"), "true")),
                &all,
            );

            for metric in &self.unsigned {
                buffer.push_some(
                    &metric.desc,
                    decode_unsigned(record.get(metric.field)).map(|v| v as f64),
                    &basic,
                );
            }

            buffer.push_some(
                &self.last_link_up,
                decode_timestamp(record.get("last-link-up-time")).map(|t| t as f64),
                &basic,
            );
            buffer.push_some(
                &self.last_link_down,
                decode_timestamp(record.get("last-link-down-time")).map(|t| t as f64),
                &basic,
            );
        }

        buffer.into_samples()
    }
}

#[async_trait]
impl Collector for InterfacesCollector {
    fn name(&self) -> &'static str {
        "interfaces"
    }

    fn describe(&self) -> Vec<Arc<MetricDesc>> {
        let mut descs = vec![self.enabled.clone(), self.up.clone()];
        descs.extend(self.unsigned.iter().map(|m| m.desc.clone()));
        descs.push(self.last_link_up.clone());
        descs.push(self.last_link_down.clone());
        descs
    }

    async fn collect(&self, device: &Device) -> Result<Vec<MetricSample>, DeviceError> {
        let records = device.fetch(RESOURCE_PATH).await?;
        Ok(self.process(&records))
    }
}
