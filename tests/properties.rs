//! Property tests over random host and worker interleavings.
//!
//! Each case replays a random sequence of lifecycle calls and worker
//! completions against a coordinator, then tears it down and checks the
//! release bookkeeping for every value the worker produced.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use loadcycle::{Coordinator, ExternalWorker, Host, Releasable};
use proptest::prelude::*;

struct Tracked {
    id: usize,
    releases: Arc<AtomicUsize>,
}

impl Releasable for Tracked {
    fn is_released(&self) -> bool {
        self.releases.load(Ordering::SeqCst) > 0
    }

    fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct RecordingHost {
    delivered: Vec<Option<usize>>,
    delivered_released: usize,
    canceled: usize,
}

impl Host<Tracked> for RecordingHost {
    fn on_load_complete(&mut self, value: Option<Arc<Tracked>>) {
        if value.as_ref().is_some_and(|v| v.is_released()) {
            self.delivered_released += 1;
        }
        self.delivered.push(value.map(|v| v.id));
    }

    fn on_load_canceled(&mut self) {
        self.canceled += 1;
    }
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Start,
    Stop,
    Reset,
    ContentChanged,
    ForceLoad,
    /// Complete the oldest parked sink with a value
    CompleteOldest,
    /// Complete the newest parked sink with a value
    CompleteNewest,
    /// Complete the newest parked sink without a value
    CompleteEmpty,
    RunPending,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Start),
        2 => Just(Op::Stop),
        1 => Just(Op::Reset),
        2 => Just(Op::ContentChanged),
        2 => Just(Op::ForceLoad),
        3 => Just(Op::CompleteOldest),
        3 => Just(Op::CompleteNewest),
        1 => Just(Op::CompleteEmpty),
        4 => Just(Op::RunPending),
    ]
}

struct Harness {
    worker: Arc<ExternalWorker<Tracked>>,
    coordinator: Coordinator<Tracked, Arc<ExternalWorker<Tracked>>, RecordingHost>,
    produced: Vec<Arc<AtomicUsize>>,
}

impl Harness {
    fn new() -> Self {
        let worker = Arc::new(ExternalWorker::new());
        let coordinator = Coordinator::new(worker.clone(), RecordingHost::default());
        Self {
            worker,
            coordinator,
            produced: Vec::new(),
        }
    }

    fn produce(&mut self) -> Tracked {
        let releases = Arc::new(AtomicUsize::new(0));
        self.produced.push(releases.clone());
        Tracked {
            id: self.produced.len() - 1,
            releases,
        }
    }

    fn apply(&mut self, op: Op) {
        match op {
            Op::Start => self.coordinator.on_start(),
            Op::Stop => self.coordinator.on_stop(),
            Op::Reset => self.coordinator.on_reset(),
            Op::ContentChanged => self.coordinator.on_content_changed(),
            Op::ForceLoad => self.coordinator.force_load(),
            Op::CompleteOldest => {
                if let Some(sink) = self.worker.take_sink() {
                    let value = self.produce();
                    sink.on_result(value);
                }
            }
            Op::CompleteNewest => {
                if let Some(sink) = self.worker.take_latest() {
                    let value = self.produce();
                    sink.on_result(value);
                }
            }
            Op::CompleteEmpty => {
                if let Some(sink) = self.worker.take_latest() {
                    sink.on_empty();
                }
            }
            Op::RunPending => {
                self.coordinator.run_pending();
            }
        }
    }

    fn release_counts(&self) -> Vec<usize> {
        self.produced.iter().map(|r| r.load(Ordering::SeqCst)).collect()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn at_most_one_load_is_current(ops in prop::collection::vec(op(), 1..60)) {
        let mut harness = Harness::new();
        for op in ops {
            harness.apply(op);

            let outstanding = harness.coordinator.outstanding();
            if harness.coordinator.is_reset() {
                prop_assert!(outstanding.is_none());
            }
            // Only the newest sink can still be current.
            if let Some(token) = outstanding {
                let newest = harness.worker.take_latest();
                prop_assert_eq!(newest.as_ref().map(|s| s.token()), Some(token));
                if let Some(sink) = newest {
                    sink.on_empty();
                }
            }
        }
    }

    #[test]
    fn values_are_released_at_most_once(ops in prop::collection::vec(op(), 1..80)) {
        let mut harness = Harness::new();
        for op in ops {
            harness.apply(op);
            for count in harness.release_counts() {
                prop_assert!(count <= 1);
            }
        }
        prop_assert_eq!(harness.coordinator.host().delivered_released, 0);
    }

    #[test]
    fn teardown_releases_everything(ops in prop::collection::vec(op(), 1..80)) {
        let mut harness = Harness::new();
        for op in ops {
            harness.apply(op);
        }

        harness.coordinator.shutdown();
        prop_assert!(harness.coordinator.current().is_none());

        // Workers that report after teardown release their own values.
        while let Some(sink) = harness.worker.take_sink() {
            let value = harness.produce();
            sink.on_result(value);
        }

        for count in harness.release_counts() {
            prop_assert_eq!(count, 1);
        }
    }

    #[test]
    fn host_sees_nothing_while_stopped(ops in prop::collection::vec(op(), 1..60)) {
        let mut harness = Harness::new();
        for op in ops {
            let before = harness.coordinator.host().delivered.len();
            let started = harness.coordinator.is_started();
            harness.apply(op);
            if !started && !matches!(op, Op::Start) {
                prop_assert_eq!(harness.coordinator.host().delivered.len(), before);
            }
        }
    }
}
