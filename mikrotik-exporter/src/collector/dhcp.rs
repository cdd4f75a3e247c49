//! DHCP lease state from `/rest/ip/dhcp-server/lease`.

use std::sync::Arc;

use async_trait::async_trait;

use super::Collector;
use crate::decode::{decode_flag, flag_value, select_fallback};
use crate::device::{Device, DeviceError, ResourceRecord};
use crate::metric::{MetricDesc, MetricSample, SampleBuffer};

const RESOURCE_PATH: &str = "ip/dhcp-server/lease";

/// Host name reported for leases whose client sent none.
const UNKNOWN_HOSTNAME: &str = "unknown";

pub struct DhcpCollector {
    bound: Arc<MetricDesc>,
}

impl DhcpCollector {
    pub fn new(namespace: &str) -> Self {
        Self {
            bound: MetricDesc::gauge(
                namespace,
                "dhcp_bound",
                "DHCP lease bound status (1 = bound, 0 = not bound)",
                &["device_ip", "mac", "dhcp_server", "device_hostname"],
            ),
        }
    }

    fn process(&self, records: &[ResourceRecord]) -> Vec<MetricSample> {
        let mut buffer = SampleBuffer::new();

        for record in records {
            // Active values win over the configured ones
            let Some(ip) = select_fallback(record.get("active-address"), record.get("address"))
            else {
                continue;
            };
            let Some(mac) = select_fallback(
                record.get("active-mac-address"),
                record.get("mac-address"),
            ) else {
                continue;
            };
            let Some(server) = select_fallback(record.get("active-server"), record.get("server"))
            else {
                continue;
            };

            let hostname = match record.get("host-name") {
                "" => UNKNOWN_HOSTNAME,
                name => name,
            };

            buffer.push(
                &self.bound,
                flag_value(decode_flag(record.get("status"), "bound")),
                &[ip, mac, server, hostname],
            );
        }

        buffer.into_samples()
    }
}

#[async_trait]
impl Collector for DhcpCollector {
    fn name(&self) -> &'static str {
        "dhcp"
    }

    fn describe(&self) -> Vec<Arc<MetricDesc>> {
        vec![self.bound.clone()]
    }

    async fn collect(&self, device: &Device) -> Result<Vec<MetricSample>, DeviceError> {
        let records = device.fetch(RESOURCE_PATH).await?;
        Ok(self.process(&records))
    }
}
