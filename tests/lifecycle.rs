//! Lifecycle integration tests
//!
//! Drives coordinators through the public API with real workers and checks
//! what the host sees and what gets released.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use loadcycle::coordination::channel;
use loadcycle::error::Result;
use loadcycle::loader::{self, Command};
use loadcycle::{
    AsyncWorker, ChannelHost, Coordinator, ExternalWorker, HostEvent, LoadResult, LoaderConfig, Plain, Releasable,
    Resource, SimpleResult, TaskWorker,
};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

async fn next_event<V>(events: &mut mpsc::UnboundedReceiver<HostEvent<V>>) -> HostEvent<V> {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for host event")
        .expect("host channel closed")
}

/// Integration test: a cursor-like result is released when it is replaced
#[tokio::test]
async fn test_reload_releases_superseded_cursor() -> Result<()> {
    let generation = Arc::new(AtomicUsize::new(0));
    let released = Arc::new(AtomicUsize::new(0));

    let load_generation = generation.clone();
    let load_released = released.clone();
    let worker = TaskWorker::new(Handle::current(), move |_: &CancellationToken| {
        let id = load_generation.fetch_add(1, Ordering::SeqCst);
        let released = load_released.clone();
        Some(Resource::with_release(id, move |_| {
            released.fetch_add(1, Ordering::SeqCst);
        }))
    });
    let (host, mut events) = ChannelHost::new();
    let handle = loader::spawn(Coordinator::new(worker, host).with_config(LoaderConfig::default().with_name("cursor")));

    handle.start()?;
    let first = match next_event(&mut events).await {
        HostEvent::Loaded(Some(value)) => value,
        other => panic!("unexpected event: {:?}", other),
    };
    assert_eq!(first.with(|id| *id), Some(0));

    handle.content_changed()?;
    let second = match next_event(&mut events).await {
        HostEvent::Loaded(Some(value)) => value,
        other => panic!("unexpected event: {:?}", other),
    };
    assert_eq!(second.with(|id| *id), Some(1));
    assert!(first.is_released());
    assert!(!second.is_released());

    let stats = handle.shutdown().await?;
    assert!(second.is_released());
    assert_eq!(released.load(Ordering::SeqCst), 2);
    assert_eq!(stats.loads_started, 2);
    assert_eq!(stats.released, 2);
    Ok(())
}

/// Integration test: errors are delivered like data
#[tokio::test]
async fn test_error_result_is_delivered() -> Result<()> {
    let worker = AsyncWorker::new(Handle::current(), |_| async {
        Some(SimpleResult::<u32>::failed(eyre::eyre!("backing store offline")))
    });
    let (host, mut events) = ChannelHost::new();
    let handle = loader::spawn(Coordinator::new(worker, host));

    handle.start()?;
    match next_event(&mut events).await {
        HostEvent::Loaded(Some(value)) => {
            assert!(value.has_error());
            assert!(value.is_released());
            assert!(value.error().unwrap().to_string().contains("offline"));
        }
        other => panic!("unexpected event: {:?}", other),
    }

    handle.shutdown().await?;
    Ok(())
}

/// Integration test: a stop while loading discards the late result
#[tokio::test]
async fn test_stop_discards_in_flight_load() -> Result<()> {
    let worker = Arc::new(ExternalWorker::new());
    let (host, mut events) = ChannelHost::new();
    let handle = loader::spawn(Coordinator::new(worker.clone(), host));

    handle.start()?;
    handle.stop()?;
    handle.stats().await?;
    assert_eq!(worker.starts(), 1);
    assert_eq!(worker.cancels(), 1);

    let late = Arc::new(Resource::new(vec![0u8; 32]));
    let sink = worker.take_sink().expect("sink parked");
    assert!(!sink.is_current());
    sink.on_result(Shared(late.clone()));

    assert!(matches!(next_event(&mut events).await, HostEvent::Canceled));
    assert!(late.is_released());

    let stats = handle.shutdown().await?;
    assert_eq!(stats.canceled, 1);
    assert_eq!(stats.delivered, 0);
    Ok(())
}

/// Integration test: commands sent through `send` behave like the helpers
#[tokio::test]
async fn test_commands_after_reset_are_ignored() -> Result<()> {
    let worker = Arc::new(ExternalWorker::<Plain<u8>>::new());
    let (host, _events) = ChannelHost::new();
    let handle = loader::spawn(Coordinator::new(worker.clone(), host));

    handle.send(Command::Reset)?;
    handle.send(Command::Start)?;
    handle.send(Command::ForceLoad)?;
    handle.send(Command::ContentChanged)?;
    let stats = handle.stats().await?;

    assert_eq!(stats.loads_started, 0);
    assert_eq!(worker.starts(), 0);
    handle.shutdown().await?;
    Ok(())
}

/// Integration test: a host-owned dispatcher routes completions by hand
#[test]
fn test_external_dispatcher_routing() {
    let (tx, mut rx) = channel::<LoadResult<Plain<&'static str>, String>>();
    let worker = Arc::new(ExternalWorker::new());
    let (host, mut events) = ChannelHost::new();
    let mut coordinator = Coordinator::with_dispatcher(worker.clone(), host, Arc::new(tx));

    coordinator.on_start();
    worker.take_sink().unwrap().on_result(LoadResult::Data(Plain("ready")));
    assert!(coordinator.current().is_none());

    let completion = rx.try_recv().unwrap();
    coordinator.handle_completion(completion);

    let current = coordinator.current().unwrap();
    assert_eq!(current.data().map(|d| *d.get()), Some("ready"));
    assert!(matches!(events.try_recv(), Ok(HostEvent::Loaded(Some(_)))));
    assert!(coordinator.outstanding().is_none());
}

/// Integration test: dropping the only handle tears the loader down
#[tokio::test]
async fn test_dropping_handle_releases_current() -> Result<()> {
    let resource = Arc::new(Resource::new(String::from("report.csv")));
    let loaded = resource.clone();
    let worker = AsyncWorker::new(Handle::current(), move |_| {
        let loaded = loaded.clone();
        async move { Some(Shared(loaded)) }
    });
    let (host, mut events) = ChannelHost::new();
    let handle = loader::spawn(Coordinator::new(worker, host));

    handle.start()?;
    assert!(matches!(next_event(&mut events).await, HostEvent::Loaded(Some(_))));
    drop(handle);

    // The host channel closes once the control task has torn down.
    while events.recv().await.is_some() {}
    assert!(resource.is_released());
    Ok(())
}

/// Shares a resource with the test so its release can be observed.
struct Shared<T>(Arc<Resource<T>>);

impl<T: Send> Releasable for Shared<T> {
    fn is_released(&self) -> bool {
        self.0.is_released()
    }

    fn release(&self) {
        self.0.release()
    }
}
