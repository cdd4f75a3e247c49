//! Wireless client registrations from `/rest/interface/wifi/registration-table`.

use std::sync::Arc;

use async_trait::async_trait;

use super::Collector;
use crate::decode::{decode_duration, decode_float, decode_pair, decode_unsigned};
use crate::device::{Device, DeviceError, ResourceRecord};
use crate::metric::{MetricDesc, MetricSample, SampleBuffer};

const RESOURCE_PATH: &str = "interface/wifi/registration-table";

const LABELS: &[&str] = &["mac"];

pub struct WirelessCollector {
    client_info: Arc<MetricDesc>,
    tx_bytes: Arc<MetricDesc>,
    rx_bytes: Arc<MetricDesc>,
    tx_packets: Arc<MetricDesc>,
    rx_packets: Arc<MetricDesc>,
    rx_rate: Arc<MetricDesc>,
    tx_rate: Arc<MetricDesc>,
    uptime: Arc<MetricDesc>,
    signal: Arc<MetricDesc>,
}

impl WirelessCollector {
    pub fn new(namespace: &str) -> Self {
        Self {
            client_info: MetricDesc::gauge(
                namespace,
                "wireless_client_info",
                "Wireless client information (always 1 for connected clients)",
                &["mac", "interface", "ssid"],
            ),
            tx_bytes: MetricDesc::counter(
                namespace,
                "wireless_tx_bytes_total",
                "Number of bytes transmitted by wireless client",
                LABELS,
            ),
            rx_bytes: MetricDesc::counter(
                namespace,
                "wireless_rx_bytes_total",
                "Number of bytes received by wireless client",
                LABELS,
            ),
            tx_packets: MetricDesc::counter(
                namespace,
                "wireless_tx_packets_total",
                "Number of packets transmitted by wireless client",
                LABELS,
            ),
            rx_packets: MetricDesc::counter(
                namespace,
                "wireless_rx_packets_total",
                "Number of packets received by wireless client",
                LABELS,
            ),
            rx_rate: MetricDesc::gauge(
                namespace,
                "wireless_rx_rate",
                "Wireless RX rate in bits per second",
                LABELS,
            ),
            tx_rate: MetricDesc::gauge(
                namespace,
                "wireless_tx_rate",
                "Wireless TX rate in bits per second",
                LABELS,
            ),
            uptime: MetricDesc::gauge(
                namespace,
                "wireless_uptime",
                "Wireless client uptime in seconds",
                LABELS,
            ),
            signal: MetricDesc::gauge(
                namespace,
                "wireless_signal",
                "Wireless client signal strength in dBm",
                LABELS,
            ),
        }
    }

    fn process(&self, records: &[ResourceRecord]) -> Vec<MetricSample> {
        let mut buffer = SampleBuffer::new();

        for record in records {
            let mac = record.get("mac-address");
            if mac.is_empty() {
                continue;
            }
            let labels = [mac];

            buffer.push(
                &self.client_info,
                1.0,
                &[mac, record.get("interface"), record.get("ssid")],
            );

            // Counters come as "tx,rx" pairs
            if let Some((tx, rx)) = decode_pair(record.get("bytes")) {
                buffer.push(&self.tx_bytes, tx as f64, &labels);
                buffer.push(&self.rx_bytes, rx as f64, &labels);
            }
            if let Some((tx, rx)) = decode_pair(record.get("packets")) {
                buffer.push(&self.tx_packets, tx as f64, &labels);
                buffer.push(&self.rx_packets, rx as f64, &labels);
            }

            buffer.push_some(
                &self.rx_rate,
                decode_unsigned(record.get("rx-rate")).map(|v| v as f64),
                &labels,
            );
            buffer.push_some(
                &self.tx_rate,
                decode_unsigned(record.get("tx-rate")).map(|v| v as f64),
                &labels,
            );
            buffer.push_some(
                &self.uptime,
                decode_duration(record.get("uptime")).map(|s| s as f64),
                &labels,
            );
            buffer.push_some(&self.signal, decode_float(record.get("signal")), &labels);
        }

        buffer.into_samples()
    }
}

#[async_trait]
impl Collector for WirelessCollector {
    fn name(&self) -> &'static str {
        "wireless"
    }

    fn describe(&self) -> Vec<Arc<MetricDesc>> {
        vec![
            self.client_info.clone(),
            self.tx_bytes.clone(),
            self.rx_bytes.clone(),
            self.tx_packets.clone(),
            self.rx_packets.clone(),
            self.rx_rate.clone(),
            self.tx_rate.clone(),
            self.uptime.clone(),
            self.signal.clone(),
        ]
    }

    async fn collect(&self, device: &Device) -> Result<Vec<MetricSample>, DeviceError> {
        let records = device.fetch(RESOURCE_PATH).await?;
        Ok(self.process(&records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::testing::{assert_samples_described, count_of, value_of};

    const MAC: &str = "11:22:33:44:55:66";

    #[test]
    fn test_registration() {
        let collector = WirelessCollector::new("ns");
        let record: ResourceRecord = [
            ("mac-address", MAC),
            ("interface", "wifi1"),
            ("ssid", "office"),
            ("bytes", "1000,2000"),
            ("packets", "10,20"),
            ("rx-rate", "866700000"),
            ("tx-rate", "780000000"),
            ("uptime", "1h2m3s"),
            ("signal", "-58"),
        ]
        .into_iter()
        .collect();

        let samples = collector.process(&[record]);

        assert_samples_described(&samples, &collector.describe());
        assert_eq!(value_of(&samples, "ns_wireless_tx_bytes_total", MAC), Some(1000.0));
        assert_eq!(value_of(&samples, "ns_wireless_rx_bytes_total", MAC), Some(2000.0));
        assert_eq!(value_of(&samples, "ns_wireless_tx_packets_total", MAC), Some(10.0));
        assert_eq!(value_of(&samples, "ns_wireless_rx_packets_total", MAC), Some(20.0));
        assert_eq!(value_of(&samples, "ns_wireless_rx_rate", MAC), Some(866_700_000.0));
        assert_eq!(value_of(&samples, "ns_wireless_uptime", MAC), Some(3723.0));
        assert_eq!(value_of(&samples, "ns_wireless_signal", MAC), Some(-58.0));

        let info = samples
            .iter()
            .find(|s| s.desc().name() == "ns_wireless_client_info")
            .unwrap();
        assert_eq!(info.label("ssid"), Some("office"));
    }

    #[test]
    fn test_malformed_pair_suppresses_both_halves() {
        let collector = WirelessCollector::new("ns");
        let record: ResourceRecord = [("mac-address", MAC), ("bytes", "1000"), ("packets", "5,x")]
            .into_iter()
            .collect();

        let samples = collector.process(&[record]);

        assert_eq!(count_of(&samples, "ns_wireless_tx_bytes_total"), 0);
        assert_eq!(count_of(&samples, "ns_wireless_rx_bytes_total"), 0);
        assert_eq!(count_of(&samples, "ns_wireless_tx_packets_total"), 0);
        assert_eq!(count_of(&samples, "ns_wireless_rx_packets_total"), 0);
        assert_eq!(count_of(&samples, "ns_wireless_client_info"), 1);
    }

    #[test]
    fn test_registration_without_mac_skipped() {
        let collector = WirelessCollector::new("ns");
        let record: ResourceRecord = [("interface", "wifi1"), ("signal", "-70")]
            .into_iter()
            .collect();

        assert!(collector.process(&[record]).is_empty());
    }
}
