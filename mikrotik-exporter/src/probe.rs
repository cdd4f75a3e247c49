//! Per-request probe orchestration.
//!
//! A probe runs every selected collector against one device concurrently,
//! bounded by a single deadline. A collector that errors, overruns the
//! deadline or panics is reported as failed through its
//! `collector_success` sample; the samples of the others are kept.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::{Instant, timeout_at};

use crate::collector::CollectorHandle;
use crate::decode::flag_value;
use crate::device::{Credential, Device, DeviceClient, DeviceError};
use crate::exposition;
use crate::metric::{MetricDesc, MetricSample, SampleBuffer};

/// Default deadline for a whole probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest deadline a probe is ever given.
pub const MAX_PROBE_TIMEOUT: Duration = Duration::from_secs(24 * 3600);

/// Why a collector produced no samples.
#[derive(Debug, Error)]
pub enum CollectorFailure {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("probe deadline exceeded")]
    DeadlineExceeded,

    #[error("collector panicked")]
    Panicked,
}

/// Result of running one collector.
#[derive(Debug)]
pub struct CollectorOutcome {
    pub collector: &'static str,
    pub elapsed: Duration,
    pub error: Option<CollectorFailure>,
}

impl CollectorOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Everything one probe produced.
#[derive(Debug)]
pub struct ProbeReport {
    samples: Vec<MetricSample>,
    outcomes: Vec<CollectorOutcome>,
}

impl ProbeReport {
    /// Collector samples followed by one success sample per collector.
    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }

    /// Per-collector outcomes, in resolution order.
    pub fn outcomes(&self) -> &[CollectorOutcome] {
        &self.outcomes
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.succeeded()).count()
    }

    /// Render as Prometheus text exposition.
    pub fn render(&self) -> String {
        exposition::render(&self.samples)
    }
}

/// What a collector task hands back when it settles.
struct TaskResult {
    index: usize,
    elapsed: Duration,
    result: Result<Vec<MetricSample>, CollectorFailure>,
}

/// Runs collectors against devices.
///
/// Holds only immutable state; one instance serves all requests.
#[derive(Debug, Clone)]
pub struct Prober {
    client: DeviceClient,
    timeout: Duration,
    success: Arc<MetricDesc>,
}

impl Prober {
    pub fn new(client: DeviceClient, timeout: Duration, namespace: &str) -> Self {
        Self {
            client,
            timeout,
            success: MetricDesc::gauge(
                namespace,
                "collector_success",
                "Whether the collector succeeded (1 = success, 0 = failure)",
                &["collector"],
            ),
        }
    }

    /// Probe one device with the given collectors.
    ///
    /// Dropping the returned future aborts every collector still running.
    pub async fn probe(
        &self,
        target: &str,
        credential: Credential,
        collectors: &[CollectorHandle],
    ) -> ProbeReport {
        let started = Instant::now();
        let deadline = started + self.timeout.min(MAX_PROBE_TIMEOUT);
        let device = Arc::new(Device::new(self.client.clone(), target, credential));

        let mut tasks = JoinSet::new();
        for (index, collector) in collectors.iter().enumerate() {
            let collector = Arc::clone(collector);
            let device = Arc::clone(&device);

            tasks.spawn(async move {
                let task_started = Instant::now();
                let result = match timeout_at(deadline, collector.collect(&device)).await {
                    Ok(Ok(samples)) => Ok(samples),
                    Ok(Err(e)) => Err(CollectorFailure::Device(e)),
                    Err(_) => Err(CollectorFailure::DeadlineExceeded),
                };
                TaskResult {
                    index,
                    elapsed: task_started.elapsed(),
                    result,
                }
            });
        }

        let mut settled: Vec<Option<TaskResult>> = collectors.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(task) => {
                    let index = task.index;
                    settled[index] = Some(task);
                }
                Err(e) if e.is_panic() => {
                    // Attributed below: a panicked task leaves its slot empty
                    tracing::trace!(device = %target, "Collector task panicked");
                }
                Err(e) => {
                    tracing::trace!(device = %target, error = %e, "Collector task cancelled");
                }
            }
        }

        let mut buffer = SampleBuffer::new();
        let mut collected = Vec::new();
        let mut outcomes = Vec::with_capacity(collectors.len());

        for (collector, slot) in collectors.iter().zip(settled) {
            let name = collector.name();
            let (elapsed, result) = match slot {
                Some(task) => (task.elapsed, task.result),
                None => (started.elapsed(), Err(CollectorFailure::Panicked)),
            };

            let error = match result {
                Ok(samples) => {
                    tracing::debug!(
                        device = %target,
                        collector = name,
                        samples = samples.len(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Collector succeeded"
                    );
                    collected.extend(samples);
                    None
                }
                Err(CollectorFailure::Panicked) => {
                    tracing::error!(
                        device = %target,
                        collector = name,
                        "Collector panicked"
                    );
                    Some(CollectorFailure::Panicked)
                }
                Err(e) => {
                    tracing::warn!(
                        device = %target,
                        collector = name,
                        error = %e,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Collector failed"
                    );
                    Some(e)
                }
            };

            buffer.push(&self.success, flag_value(error.is_none()), &[name]);
            outcomes.push(CollectorOutcome {
                collector: name,
                elapsed,
                error,
            });
        }

        collected.extend(buffer.into_samples());

        let report = ProbeReport {
            samples: collected,
            outcomes,
        };

        tracing::debug!(
            device = %target,
            collectors = collectors.len(),
            failed = report.failed(),
            samples = report.samples.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Probe finished"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::Collector;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Emits one fixed gauge.
    struct StaticCollector {
        name: &'static str,
        desc: Arc<MetricDesc>,
    }

    impl StaticCollector {
        fn new(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                desc: MetricDesc::gauge("ns", &format!("{}_value", name), "Static value", &[]),
            })
        }
    }

    #[async_trait]
    impl Collector for StaticCollector {
        fn name(&self) -> &'static str {
            self.name
        }

        fn describe(&self) -> Vec<Arc<MetricDesc>> {
            vec![self.desc.clone()]
        }

        async fn collect(&self, _device: &Device) -> Result<Vec<MetricSample>, DeviceError> {
            let mut buffer = SampleBuffer::new();
            buffer.push(&self.desc, 7.0, &[]);
            Ok(buffer.into_samples())
        }
    }

    enum Misbehaviour {
        Fail,
        Hang,
        Panic,
    }

    struct BrokenCollector {
        name: &'static str,
        how: Misbehaviour,
    }

    #[async_trait]
    impl Collector for BrokenCollector {
        fn name(&self) -> &'static str {
            self.name
        }

        fn describe(&self) -> Vec<Arc<MetricDesc>> {
            Vec::new()
        }

        async fn collect(&self, _device: &Device) -> Result<Vec<MetricSample>, DeviceError> {
            match self.how {
                Misbehaviour::Fail => Err(DeviceError::Status {
                    path: "broken".to_string(),
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                }),
                Misbehaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(Vec::new())
                }
                Misbehaviour::Panic => panic!("collector bug"),
            }
        }
    }

    fn broken(name: &'static str, how: Misbehaviour) -> CollectorHandle {
        Arc::new(BrokenCollector { name, how })
    }

    fn prober(timeout: Duration) -> Prober {
        let client = DeviceClient::new("http", Duration::from_secs(1), false).unwrap();
        Prober::new(client, timeout, "ns")
    }

    fn credential() -> Credential {
        Credential::new("admin", "secret")
    }

    fn success_of(report: &ProbeReport, collector: &str) -> Option<f64> {
        report
            .samples()
            .iter()
            .find(|s| {
                s.desc().name() == "ns_collector_success" && s.label("collector") == Some(collector)
            })
            .map(|s| s.value())
    }

    #[tokio::test]
    async fn test_all_collectors_succeed() {
        let collectors: Vec<CollectorHandle> =
            vec![StaticCollector::new("a"), StaticCollector::new("b")];
        let report = prober(DEFAULT_PROBE_TIMEOUT)
            .probe("10.0.0.1:80", credential(), &collectors)
            .await;

        assert_eq!(report.failed(), 0);
        assert_eq!(success_of(&report, "a"), Some(1.0));
        assert_eq!(success_of(&report, "b"), Some(1.0));

        let names: Vec<_> = report.samples().iter().map(|s| s.desc().name()).collect();
        assert_eq!(
            names,
            vec![
                "ns_a_value",
                "ns_b_value",
                "ns_collector_success",
                "ns_collector_success"
            ]
        );
    }

    #[tokio::test]
    async fn test_failing_collector_is_isolated() {
        let collectors = vec![
            broken("a", Misbehaviour::Fail),
            StaticCollector::new("b") as CollectorHandle,
        ];
        let report = prober(DEFAULT_PROBE_TIMEOUT)
            .probe("10.0.0.1:80", credential(), &collectors)
            .await;

        assert_eq!(success_of(&report, "a"), Some(0.0));
        assert_eq!(success_of(&report, "b"), Some(1.0));
        assert!(report.samples().iter().any(|s| s.desc().name() == "ns_b_value"));
        assert!(matches!(
            report.outcomes()[0].error,
            Some(CollectorFailure::Device(DeviceError::Status { .. }))
        ));
    }

    #[tokio::test]
    async fn test_panicking_collector_is_isolated() {
        let collectors = vec![
            StaticCollector::new("a") as CollectorHandle,
            broken("b", Misbehaviour::Panic),
        ];
        let report = prober(DEFAULT_PROBE_TIMEOUT)
            .probe("10.0.0.1:80", credential(), &collectors)
            .await;

        assert_eq!(success_of(&report, "a"), Some(1.0));
        assert_eq!(success_of(&report, "b"), Some(0.0));
        assert!(matches!(
            report.outcomes()[1].error,
            Some(CollectorFailure::Panicked)
        ));
    }

    #[tokio::test]
    async fn test_hung_collector_hits_deadline() {
        let collectors = vec![
            broken("a", Misbehaviour::Hang),
            StaticCollector::new("b") as CollectorHandle,
        ];
        let started = std::time::Instant::now();
        let report = prober(Duration::from_millis(200))
            .probe("10.0.0.1:80", credential(), &collectors)
            .await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(success_of(&report, "a"), Some(0.0));
        assert_eq!(success_of(&report, "b"), Some(1.0));
        assert!(matches!(
            report.outcomes()[0].error,
            Some(CollectorFailure::DeadlineExceeded)
        ));
        assert!(report.samples().iter().any(|s| s.desc().name() == "ns_b_value"));
    }

    #[tokio::test]
    async fn test_oversized_timeout_is_clamped() {
        let collectors = vec![StaticCollector::new("a") as CollectorHandle];
        let report = prober(Duration::MAX)
            .probe("10.0.0.1:80", credential(), &collectors)
            .await;

        assert_eq!(report.failed(), 0);
        assert_eq!(success_of(&report, "a"), Some(1.0));
    }

    /// Sets its flag when dropped.
    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    /// Hangs forever while holding a [`DropFlag`].
    struct GuardedCollector {
        dropped: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Collector for GuardedCollector {
        fn name(&self) -> &'static str {
            "guarded"
        }

        fn describe(&self) -> Vec<Arc<MetricDesc>> {
            Vec::new()
        }

        async fn collect(&self, _device: &Device) -> Result<Vec<MetricSample>, DeviceError> {
            let _guard = DropFlag(Arc::clone(&self.dropped));
            std::future::pending::<()>().await;
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_dropped_probe_aborts_collectors() {
        let dropped = Arc::new(AtomicBool::new(false));
        let collectors: Vec<CollectorHandle> = vec![Arc::new(GuardedCollector {
            dropped: Arc::clone(&dropped),
        })];
        let prober = prober(DEFAULT_PROBE_TIMEOUT);

        let result = tokio::time::timeout(
            Duration::from_millis(50),
            prober.probe("10.0.0.1:80", credential(), &collectors),
        )
        .await;
        assert!(result.is_err());

        // Aborted tasks are dropped by the runtime, not synchronously
        for _ in 0..100 {
            if dropped.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_empty_probe() {
        let report = prober(DEFAULT_PROBE_TIMEOUT)
            .probe("10.0.0.1:80", credential(), &[])
            .await;

        assert!(report.samples().is_empty());
        assert_eq!(report.render(), "");
    }
}
