//! Domain collectors.
//!
//! Each collector fetches one or more RouterOS resources from a device and
//! turns the records into metric samples. Collectors are stateless: the
//! descriptors are built once from the namespace and every `collect` call
//! starts from scratch.

mod bgp;
mod dhcp;
mod firewall;
mod interfaces;
mod system;
mod wireless;

use std::sync::Arc;

use async_trait::async_trait;

use crate::device::{Device, DeviceError};
use crate::metric::{MetricDesc, MetricSample};

pub use bgp::BgpCollector;
pub use dhcp::DhcpCollector;
pub use firewall::FirewallCollector;
pub use interfaces::InterfacesCollector;
pub use system::SystemCollector;
pub use wireless::WirelessCollector;

/// A named source of metrics for one device.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Name used in module selections and in the `collector` label.
    fn name(&self) -> &'static str;

    /// Every metric family this collector can emit.
    fn describe(&self) -> Vec<Arc<MetricDesc>>;

    /// Fetch from the device and produce samples.
    ///
    /// An error fails this collector only; the prober keeps the results of
    /// every other collector.
    async fn collect(&self, device: &Device) -> Result<Vec<MetricSample>, DeviceError>;
}

/// Shared collector handle.
pub type CollectorHandle = Arc<dyn Collector>;

/// Build all built-in collectors for a namespace.
pub fn builtin(namespace: &str) -> Vec<CollectorHandle> {
    vec![
        Arc::new(InterfacesCollector::new(namespace)),
        Arc::new(DhcpCollector::new(namespace)),
        Arc::new(BgpCollector::new(namespace)),
        Arc::new(SystemCollector::new(namespace)),
        Arc::new(WirelessCollector::new(namespace)),
        Arc::new(FirewallCollector::new(namespace)),
    ]
}
