//! Multi-target Prometheus exporter for MikroTik RouterOS devices.
//!
//! Each `/probe` request fetches one device's resources over the RouterOS
//! REST API and renders them as a Prometheus text exposition snapshot.
//! Nothing is cached between probes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ HTTP /probe  │────>│    Prober    │────>│  Collectors  │────>│ RouterOS     │
//! │ (target,     │     │ (deadline,   │     │ (decode,     │     │ /rest/...    │
//! │  auth,module)│<────│  isolation)  │<────│  samples)    │<────│              │
//! └──────────────┘     └──────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! mikrotik-exporter --config mikrotik.json5
//! curl 'http://localhost:9261/probe?target=192.168.88.1:80&module=default'
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod collector;
pub mod config;
pub mod decode;
pub mod device;
pub mod exposition;
pub mod http;
pub mod metric;
pub mod probe;
pub mod process;
pub mod registry;

pub use collector::{Collector, CollectorHandle};
pub use config::ExporterConfig;
pub use device::{Credential, Device, DeviceClient, DeviceError, ResourceRecord};
pub use http::{AppState, HttpServer, create_router};
pub use metric::{MetricDesc, MetricKind, MetricSample, SampleBuffer};
pub use probe::{ProbeReport, Prober};
pub use registry::CollectorRegistry;
