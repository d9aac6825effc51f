//! Lifecycle simulation for the `run` command.
//!
//! Drives a coordinator through repeated start/stop cycles against a
//! blocking worker that allocates a buffer per load, then checks that every
//! buffer the worker created was released.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use eyre::{Context, Result};
use log::{debug, info, warn};
use rand::Rng;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use loadcycle::loader::{self, HostEvent};
use loadcycle::{ChannelHost, Coordinator, LoadResult, LoaderConfig, LoaderStats, Resource, TaskWorker};

use crate::config::SimulationConfig;

/// What the simulated worker produces.
pub type Payload = LoadResult<Resource<Vec<u8>>, String>;

const LOAD_STEP: Duration = Duration::from_millis(5);

/// Buffer bookkeeping shared with the worker closure.
#[derive(Debug, Default)]
struct BufferCounters {
    created: AtomicUsize,
    released: AtomicUsize,
    in_flight: AtomicUsize,
}

impl BufferCounters {
    fn outstanding(&self) -> usize {
        self.created
            .load(Ordering::SeqCst)
            .saturating_sub(self.released.load(Ordering::SeqCst))
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// What the host observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostTally {
    /// Deliveries carrying a live buffer
    pub data: u64,
    /// Deliveries carrying a load error
    pub errors: u64,
    /// Deliveries with no value
    pub empty: u64,
    /// Deliveries whose buffer was already released when the host read it
    pub stale: u64,
    /// Cancellation notices
    pub canceled: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SimulationReport {
    pub cycles: u32,
    pub stats: LoaderStats,
    pub host: HostTally,
    pub buffers_created: usize,
    pub buffers_released: usize,
}

impl SimulationReport {
    /// Buffers that were created but never released.
    pub fn leaked(&self) -> usize {
        self.buffers_created.saturating_sub(self.buffers_released)
    }
}

fn load_payload(config: &SimulationConfig, counters: &Arc<BufferCounters>, cancel: &CancellationToken) -> Option<Payload> {
    let _guard = InFlight::enter(&counters.in_flight);

    let mut remaining = Duration::from_millis(config.load_delay_ms);
    while !remaining.is_zero() {
        if config.honor_cancel && cancel.is_cancelled() {
            debug!("Load abandoned after cancel");
            return None;
        }
        let step = remaining.min(LOAD_STEP);
        std::thread::sleep(step);
        remaining -= step;
    }

    let mut rng = rand::rng();
    if rng.random_bool(config.error_rate) {
        return Some(LoadResult::Error("simulated read failure".to_string()));
    }

    let mut buffer = vec![0u8; config.payload_bytes];
    rng.fill(&mut buffer[..]);
    counters.created.fetch_add(1, Ordering::SeqCst);

    let released = counters.clone();
    Some(LoadResult::Data(Resource::with_release(buffer, move |_| {
        released.released.fetch_add(1, Ordering::SeqCst);
    })))
}

async fn observe(mut events: mpsc::UnboundedReceiver<HostEvent<Payload>>) -> HostTally {
    let mut tally = HostTally::default();
    while let Some(event) = events.recv().await {
        match event {
            HostEvent::Loaded(None) => tally.empty += 1,
            HostEvent::Loaded(Some(value)) => match value.as_ref() {
                LoadResult::Error(_) => tally.errors += 1,
                LoadResult::Data(buffer) => match buffer.with(|bytes| bytes.len()) {
                    Some(len) => {
                        debug!("Host received {} bytes", len);
                        tally.data += 1;
                    }
                    None => tally.stale += 1,
                },
            },
            HostEvent::Canceled => tally.canceled += 1,
        }
    }
    tally
}

/// Run the simulation on the current tokio runtime.
pub async fn run(config: &SimulationConfig, loader_config: LoaderConfig) -> Result<SimulationReport> {
    let counters = Arc::new(BufferCounters::default());

    let load_config = config.clone();
    let load_counters = counters.clone();
    let worker = TaskWorker::new(Handle::current(), move |cancel: &CancellationToken| {
        load_payload(&load_config, &load_counters, cancel)
    });

    let (host, events) = ChannelHost::new();
    let observer = tokio::spawn(observe(events));
    let handle = loader::spawn(Coordinator::new(worker, host).with_config(loader_config));

    let pause = Duration::from_millis(config.pause_ms);
    for cycle in 1..=config.cycles {
        debug!("Cycle {}/{}", cycle, config.cycles);
        handle.start()?;
        tokio::time::sleep(pause).await;
        handle.stop()?;
        if config.content_change_every > 0 && cycle % config.content_change_every == 0 {
            handle.content_changed()?;
        }
    }

    let stats = handle.shutdown().await.context("Failed to shut down loader")?;

    // Loads that ignore cancellation may still be running; their results are
    // released as soon as they report into the closed loader.
    let settle = Duration::from_millis(config.load_delay_ms.saturating_mul(2)) + Duration::from_secs(1);
    let drained = tokio::time::timeout(settle, async {
        while counters.in_flight.load(Ordering::SeqCst) > 0 || counters.outstanding() > 0 {
            tokio::time::sleep(LOAD_STEP).await;
        }
    })
    .await;
    if drained.is_err() {
        warn!("Buffers still live after {:?}", settle);
    }

    let host = observer.await.context("Host observer failed")?;

    let report = SimulationReport {
        cycles: config.cycles,
        stats,
        host,
        buffers_created: counters.created.load(Ordering::SeqCst),
        buffers_released: counters.released.load(Ordering::SeqCst),
    };
    info!(
        "Simulation finished: {} loads, {} delivered, {} leaked",
        report.stats.loads_started,
        report.stats.delivered,
        report.leaked()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick(cycles: u32) -> SimulationConfig {
        SimulationConfig {
            cycles,
            load_delay_ms: 2,
            pause_ms: 40,
            honor_cancel: true,
            error_rate: 0.0,
            content_change_every: 0,
            payload_bytes: 16,
        }
    }

    #[tokio::test]
    async fn test_simulation_releases_every_buffer() {
        let report = run(&quick(4), LoaderConfig::default()).await.unwrap();

        assert_eq!(report.cycles, 4);
        assert!(report.buffers_created >= 1);
        assert_eq!(report.leaked(), 0);
        assert!(report.host.data >= 1);
    }

    #[tokio::test]
    async fn test_cached_buffer_is_redelivered() {
        let report = run(&quick(3), LoaderConfig::default()).await.unwrap();

        // One load, then two re-deliveries of the cached buffer.
        assert_eq!(report.stats.loads_started, 1);
        assert_eq!(report.stats.redelivered, 2);
        assert_eq!(report.leaked(), 0);
    }

    #[tokio::test]
    async fn test_content_change_reloads() {
        let mut config = quick(4);
        config.content_change_every = 1;

        let report = run(&config, LoaderConfig::default()).await.unwrap();

        assert_eq!(report.stats.loads_started, 4);
        assert_eq!(report.leaked(), 0);
    }

    #[tokio::test]
    async fn test_errors_allocate_nothing() {
        let mut config = quick(2);
        config.error_rate = 1.0;

        let report = run(&config, LoaderConfig::default()).await.unwrap();

        assert_eq!(report.buffers_created, 0);
        assert!(report.host.errors >= 1);
        assert_eq!(report.host.data, 0);
    }

    #[tokio::test]
    async fn test_ignored_cancel_still_releases() {
        let config = SimulationConfig {
            cycles: 3,
            load_delay_ms: 30,
            pause_ms: 5,
            honor_cancel: false,
            error_rate: 0.0,
            content_change_every: 1,
            payload_bytes: 8,
        };

        let report = run(&config, LoaderConfig::default()).await.unwrap();

        assert_eq!(report.leaked(), 0);
    }
}
