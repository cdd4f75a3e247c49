//! Firewall rule counters from `/rest/ip/firewall/<table>`.

use std::sync::Arc;

use async_trait::async_trait;

use super::Collector;
use crate::decode::{decode_flag, decode_float, flag_value};
use crate::device::{Device, DeviceError, ResourceRecord};
use crate::metric::{MetricDesc, MetricSample, SampleBuffer};

/// Rule tables, fetched in this order.
const TABLES: [&str; 4] = ["filter", "nat", "mangle", "raw"];

const LABELS: &[&str] = &["id", "table"];

pub struct FirewallCollector {
    rule_enabled: Arc<MetricDesc>,
    rule_bytes: Arc<MetricDesc>,
    rule_packets: Arc<MetricDesc>,
    rule_info: Arc<MetricDesc>,
}

impl FirewallCollector {
    pub fn new(namespace: &str) -> Self {
        Self {
            rule_enabled: MetricDesc::gauge(
                namespace,
                "firewall_rule_enabled",
                "Firewall rule enabled status (1 = enabled, 0 = disabled)",
                LABELS,
            ),
            rule_bytes: MetricDesc::counter(
                namespace,
                "firewall_rule_bytes",
                "Number of bytes matched by firewall rule",
                LABELS,
            ),
            rule_packets: MetricDesc::counter(
                namespace,
                "firewall_rule_packets",
                "Number of packets matched by firewall rule",
                LABELS,
            ),
            rule_info: MetricDesc::gauge(
                namespace,
                "firewall_rule_info",
                "Firewall rule information",
                &["id", "table", "chain", "action", "comment"],
            ),
        }
    }

    fn process_table(&self, table: &str, records: &[ResourceRecord], buffer: &mut SampleBuffer) {
        for record in records {
            let id = record.get(".id");
            if id.is_empty() {
                continue;
            }
            let labels = [id, table];

            buffer.push(
                &self.rule_enabled,
                flag_value(!decode_flag(record.get("disabled"), "true")),
                &labels,
            );
            buffer.push_some(&self.rule_bytes, decode_float(record.get("bytes")), &labels);
            buffer.push_some(
                &self.rule_packets,
                decode_float(record.get("packets")),
                &labels,
            );
            buffer.push(
                &self.rule_info,
                1.0,
                &[
                    id,
                    table,
                    record.get("chain"),
                    record.get("action"),
                    record.get("comment"),
                ],
            );
        }
    }
}

#[async_trait]
impl Collector for FirewallCollector {
    fn name(&self) -> &'static str {
        "firewall"
    }

    fn describe(&self) -> Vec<Arc<MetricDesc>> {
        vec![
            self.rule_enabled.clone(),
            self.rule_bytes.clone(),
            self.rule_packets.clone(),
            self.rule_info.clone(),
        ]
    }

    async fn collect(&self, device: &Device) -> Result<Vec<MetricSample>, DeviceError> {
        let mut buffer = SampleBuffer::new();

        // Any table failing fails the collector; partial tables are dropped
        for table in TABLES {
            let records = device.fetch(&format!("ip/firewall/{}", table)).await?;
            self.process_table(table, &records, &mut buffer);
        }

        Ok(buffer.into_samples())
    }
}
