mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::broadcast;
use tokio::time::{self, Instant};
use workvisor::{
    CallbackHandle, ConfigStore, EventKind, JsonFileStore, LifecycleEvent, LifecycleListener,
    MemoryStore,
    ServiceAction, ServiceStatus, StarterReason, SupervisorConfig, SupervisorState, TaskData,
    TaskEventAction, TaskSupervisor, WorkerCall,
};

use common::{DestroyMode, FakeRuntime, Recorder, settle};

const HANDLE: CallbackHandle = CallbackHandle(42);

fn developer_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store
        .set_service_status(ServiceStatus::new(ServiceAction::Start))
        .unwrap();
    store.set_task_data(TaskData::new(HANDLE)).unwrap();
    store
}

fn supervisor(runtime: &Arc<FakeRuntime>, store: &Arc<MemoryStore>) -> (TaskSupervisor, Arc<Recorder>) {
    let sup = TaskSupervisor::builder(runtime.clone())
        .with_store(store.clone())
        .build();
    let rec = Recorder::new();
    assert!(sup.add_listener(rec.clone()));
    (sup, rec)
}

fn drain(rx: &mut broadcast::Receiver<workvisor::Event>) -> Vec<EventKind> {
    let mut kinds = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        kinds.push(ev.kind);
    }
    kinds
}

#[tokio::test(start_paused = true)]
async fn test_repeat_start_notifies_then_ticks_every_interval() {
    let runtime = FakeRuntime::new();
    let (sup, rec) = supervisor(&runtime, &developer_store());

    sup.start(TaskData::new(HANDLE), TaskEventAction::repeat(1000));
    time::sleep(Duration::from_millis(3500)).await;

    assert_eq!(
        rec.events(),
        vec![
            LifecycleEvent::EngineCreate,
            LifecycleEvent::TaskStart(StarterReason::Developer),
            LifecycleEvent::TaskRepeatEvent,
            LifecycleEvent::TaskRepeatEvent,
            LifecycleEvent::TaskRepeatEvent,
        ]
    );
    let calls = runtime.channel(0).calls();
    assert_eq!(
        calls[0],
        WorkerCall::Start {
            reason: StarterReason::Developer
        }
    );
    assert_eq!(runtime.count(WorkerCall::REPEAT_EVENT), 3);
    assert_eq!(sup.state(), SupervisorState::Running);
}

#[tokio::test(start_paused = true)]
async fn test_repeat_count_is_elapsed_over_interval() {
    for (interval, expected) in [(100u64, 26usize), (250, 10), (700, 3)] {
        let runtime = FakeRuntime::new();
        let (sup, _rec) = supervisor(&runtime, &developer_store());

        sup.start(TaskData::new(HANDLE), TaskEventAction::repeat(interval));
        settle().await;
        time::sleep(Duration::from_millis(2649)).await;

        assert_eq!(
            runtime.count(WorkerCall::REPEAT_EVENT),
            expected,
            "interval {interval}ms"
        );
        sup.destroy();
        sup.stopped().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_missing_callback_handle_creates_nothing() {
    let runtime = FakeRuntime::new();
    let (sup, rec) = supervisor(&runtime, &developer_store());

    sup.start(TaskData::empty(), TaskEventAction::repeat(1000));
    time::sleep(Duration::from_secs(5)).await;

    assert!(runtime.created().is_empty());
    assert!(rec.events().is_empty());
    assert_eq!(sup.state(), SupervisorState::Idle);

    // No engine was created, so releasing the supervisor announces nothing.
    sup.destroy();
    sup.stopped().await;
    settle().await;
    assert!(rec.events().is_empty());
    assert!(runtime.destroyed().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_once_dispatches_a_single_event() {
    let runtime = FakeRuntime::new();
    let (sup, rec) = supervisor(&runtime, &developer_store());

    sup.start(TaskData::new(HANDLE), TaskEventAction::once());
    settle().await;
    assert_eq!(runtime.count(WorkerCall::REPEAT_EVENT), 1);

    time::sleep(Duration::from_secs(10)).await;
    assert_eq!(runtime.count(WorkerCall::REPEAT_EVENT), 1);
    assert_eq!(rec.count(LifecycleEvent::TaskRepeatEvent), 1);
}

#[tokio::test(start_paused = true)]
async fn test_nothing_never_dispatches() {
    let runtime = FakeRuntime::new();
    let (sup, rec) = supervisor(&runtime, &developer_store());

    sup.start(TaskData::new(HANDLE), TaskEventAction::nothing());
    time::sleep(Duration::from_secs(10)).await;

    assert_eq!(runtime.count(WorkerCall::REPEAT_EVENT), 0);
    assert_eq!(
        rec.events(),
        vec![
            LifecycleEvent::EngineCreate,
            LifecycleEvent::TaskStart(StarterReason::Developer),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_update_with_same_handle_keeps_worker() {
    let runtime = FakeRuntime::new();
    let (sup, rec) = supervisor(&runtime, &developer_store());

    sup.start(TaskData::new(HANDLE), TaskEventAction::nothing());
    settle().await;
    sup.update(TaskEventAction::once());
    settle().await;
    time::sleep(Duration::from_secs(5)).await;

    assert_eq!(runtime.count(WorkerCall::REPEAT_EVENT), 1);
    assert_eq!(runtime.created(), vec![HANDLE]);
    assert_eq!(rec.count(LifecycleEvent::EngineCreate), 1);
    assert_eq!(rec.count(LifecycleEvent::EngineWillDestroy), 0);
}

#[tokio::test(start_paused = true)]
async fn test_update_with_changed_interval_reschedules() {
    let runtime = FakeRuntime::new();
    let (sup, _rec) = supervisor(&runtime, &developer_store());

    sup.start(TaskData::new(HANDLE), TaskEventAction::repeat(1000));
    settle().await;
    time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(runtime.count(WorkerCall::REPEAT_EVENT), 1);

    sup.update(TaskEventAction::repeat(300));
    time::sleep(Duration::from_millis(1000)).await;

    assert_eq!(runtime.count(WorkerCall::REPEAT_EVENT), 4);
    assert_eq!(runtime.created().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_update_with_identical_action_keeps_timer_phase() {
    let runtime = FakeRuntime::new();
    let (sup, _rec) = supervisor(&runtime, &developer_store());

    sup.start(TaskData::new(HANDLE), TaskEventAction::repeat(1000));
    settle().await;
    time::sleep(Duration::from_millis(1500)).await;

    sup.update(TaskEventAction::repeat(1000));
    time::sleep(Duration::from_millis(600)).await;

    // A rescheduled timer would not fire before 2.5s.
    assert_eq!(runtime.count(WorkerCall::REPEAT_EVENT), 2);
}

#[tokio::test(start_paused = true)]
async fn test_update_with_new_handle_recreates_worker() {
    let runtime = FakeRuntime::new();
    let store = developer_store();
    let (sup, rec) = supervisor(&runtime, &store);

    sup.start(TaskData::new(HANDLE), TaskEventAction::repeat(1000));
    settle().await;
    time::sleep(Duration::from_millis(1500)).await;

    store.set_task_data(TaskData::new(CallbackHandle(7))).unwrap();
    sup.update(TaskEventAction::repeat(1000));
    settle().await;

    assert_eq!(runtime.created(), vec![HANDLE, CallbackHandle(7)]);
    assert_eq!(runtime.destroyed(), vec![0]);
    assert_eq!(
        rec.transitions(),
        vec![
            LifecycleEvent::EngineCreate,
            LifecycleEvent::TaskStart(StarterReason::Developer),
            LifecycleEvent::TaskDestroy,
            LifecycleEvent::EngineWillDestroy,
            LifecycleEvent::EngineCreate,
            LifecycleEvent::TaskStart(StarterReason::Developer),
        ]
    );

    time::sleep(Duration::from_millis(2000)).await;
    assert_eq!(runtime.channel(0).count(WorkerCall::REPEAT_EVENT), 1);
    assert_eq!(runtime.channel(0).count(WorkerCall::DESTROY), 1);
    assert_eq!(runtime.channel(1).count(WorkerCall::REPEAT_EVENT), 2);
}

#[tokio::test(start_paused = true)]
async fn test_update_without_handle_is_ignored() {
    let runtime = FakeRuntime::new();
    let store = Arc::new(MemoryStore::new());
    let (sup, rec) = supervisor(&runtime, &store);

    sup.update(TaskEventAction::repeat(100));
    time::sleep(Duration::from_secs(1)).await;

    assert!(runtime.created().is_empty());
    assert!(rec.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_destroy_before_start_ack_never_schedules() {
    let runtime = FakeRuntime::new();
    let (sup, rec) = supervisor(&runtime, &developer_store());
    let gate = runtime.hold_next_start();

    sup.start(TaskData::new(HANDLE), TaskEventAction::repeat(100));
    settle().await;
    sup.destroy();
    sup.stopped().await;
    let _ = gate.send(());
    time::sleep(Duration::from_secs(1)).await;

    assert_eq!(runtime.count(WorkerCall::REPEAT_EVENT), 0);
    assert_eq!(
        rec.transitions(),
        vec![
            LifecycleEvent::EngineCreate,
            LifecycleEvent::TaskStart(StarterReason::Developer),
            LifecycleEvent::TaskDestroy,
            LifecycleEvent::EngineWillDestroy,
        ]
    );
    assert_eq!(sup.state(), SupervisorState::Destroyed);
}

#[tokio::test(start_paused = true)]
async fn test_destroy_twice_matches_destroy_once() {
    let once_rt = FakeRuntime::new();
    let (once, once_rec) = supervisor(&once_rt, &developer_store());
    let twice_rt = FakeRuntime::new();
    let (twice, twice_rec) = supervisor(&twice_rt, &developer_store());

    for sup in [&once, &twice] {
        sup.start(TaskData::new(HANDLE), TaskEventAction::nothing());
    }
    settle().await;

    once.destroy();
    twice.destroy();
    twice.destroy();
    once.stopped().await;
    twice.stopped().await;
    twice.destroy();
    settle().await;

    assert_eq!(once_rec.events(), twice_rec.events());
    assert_eq!(twice_rec.count(LifecycleEvent::EngineWillDestroy), 1);
    assert_eq!(twice_rt.destroyed(), vec![0]);
    assert_eq!(twice_rt.count(WorkerCall::DESTROY), 1);
}

#[tokio::test(start_paused = true)]
async fn test_no_traffic_after_destroy() {
    let runtime = FakeRuntime::new();
    let (sup, rec) = supervisor(&runtime, &developer_store());

    sup.start(TaskData::new(HANDLE), TaskEventAction::repeat(100));
    settle().await;
    sup.destroy();
    sup.stopped().await;
    settle().await;

    let calls = runtime.channel(0).calls();
    let events = rec.events();

    sup.start(TaskData::new(HANDLE), TaskEventAction::once());
    sup.update(TaskEventAction::once());
    sup.invoke(WorkerCall::ReceiveData(json!("late")));
    time::sleep(Duration::from_secs(1)).await;

    assert!(sup.is_destroyed());
    assert_eq!(runtime.created().len(), 1);
    assert_eq!(runtime.channel(0).calls(), calls);
    assert_eq!(rec.events(), events);
}

#[tokio::test(start_paused = true)]
async fn test_unresponsive_worker_is_released_after_timeout() {
    let runtime = FakeRuntime::new();
    runtime.set_destroy_mode(DestroyMode::Hang);
    let (sup, rec) = supervisor(&runtime, &developer_store());
    let mut events = sup.events();

    sup.start(TaskData::new(HANDLE), TaskEventAction::nothing());
    settle().await;
    let begun = Instant::now();
    sup.destroy();
    sup.stopped().await;
    settle().await;

    assert!(begun.elapsed() >= SupervisorConfig::default().destroy_ack_timeout);
    assert_eq!(runtime.destroyed(), vec![0]);
    assert_eq!(drain(&mut events), vec![EventKind::DestroyAckTimeout]);
    assert_eq!(
        rec.transitions()[2..],
        [LifecycleEvent::TaskDestroy, LifecycleEvent::EngineWillDestroy]
    );
}

#[tokio::test(start_paused = true)]
async fn test_destroy_ack_failure_still_releases_context() {
    let runtime = FakeRuntime::new();
    runtime.set_destroy_mode(DestroyMode::Fail);
    let (sup, rec) = supervisor(&runtime, &developer_store());
    let mut events = sup.events();

    sup.start(TaskData::new(HANDLE), TaskEventAction::nothing());
    settle().await;
    sup.destroy();
    sup.stopped().await;
    settle().await;

    assert_eq!(runtime.destroyed(), vec![0]);
    assert_eq!(drain(&mut events), vec![EventKind::DestroyAckFailed]);
    assert_eq!(rec.count(LifecycleEvent::EngineWillDestroy), 1);
}

#[tokio::test(start_paused = true)]
async fn test_engine_create_failure_leaves_supervisor_idle() {
    let runtime = FakeRuntime::new();
    runtime.fail_create(true);
    let (sup, rec) = supervisor(&runtime, &developer_store());
    let mut events = sup.events();

    sup.start(TaskData::new(HANDLE), TaskEventAction::repeat(100));
    settle().await;

    assert_eq!(drain(&mut events), vec![EventKind::EngineCreateFailed]);
    assert!(rec.events().is_empty());
    assert_eq!(sup.state(), SupervisorState::Idle);

    runtime.fail_create(false);
    sup.start(TaskData::new(HANDLE), TaskEventAction::nothing());
    settle().await;
    assert_eq!(runtime.created(), vec![HANDLE]);
    assert_eq!(sup.state(), SupervisorState::Running);
}

#[tokio::test(start_paused = true)]
async fn test_channel_bind_failure_releases_context() {
    let runtime = FakeRuntime::new();
    runtime.fail_bind(true);
    let (sup, rec) = supervisor(&runtime, &developer_store());
    let mut events = sup.events();

    sup.start(TaskData::new(HANDLE), TaskEventAction::nothing());
    settle().await;

    assert_eq!(drain(&mut events), vec![EventKind::ChannelBindFailed]);
    assert_eq!(runtime.destroyed(), vec![0]);
    assert!(rec.events().is_empty());
    assert_eq!(sup.state(), SupervisorState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_failure_keeps_timer_running() {
    let runtime = FakeRuntime::new();
    let (sup, _rec) = supervisor(&runtime, &developer_store());
    let mut events = sup.events();

    sup.start(TaskData::new(HANDLE), TaskEventAction::repeat(100));
    settle().await;
    time::sleep(Duration::from_millis(250)).await;
    assert_eq!(runtime.count(WorkerCall::REPEAT_EVENT), 2);

    runtime.channel(0).close();
    time::sleep(Duration::from_millis(300)).await;
    assert_eq!(
        drain(&mut events),
        vec![EventKind::DispatchFailed; 3]
    );

    runtime.channel(0).reopen();
    time::sleep(Duration::from_millis(200)).await;
    assert_eq!(runtime.count(WorkerCall::REPEAT_EVENT), 4);
}

#[tokio::test(start_paused = true)]
async fn test_invoke_forwards_without_ack() {
    let runtime = FakeRuntime::new();
    let (sup, _rec) = supervisor(&runtime, &developer_store());

    sup.invoke(WorkerCall::NotificationPressed);
    sup.start(TaskData::new(HANDLE), TaskEventAction::nothing());
    sup.invoke(WorkerCall::ReceiveData(json!({"counter": 1})));
    settle().await;

    assert_eq!(
        runtime.channel(0).calls(),
        vec![
            WorkerCall::Start {
                reason: StarterReason::Developer
            },
            WorkerCall::ReceiveData(json!({"counter": 1})),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_system_actions_yield_system_reason() {
    for status in [
        None,
        Some(ServiceAction::Reboot),
        Some(ServiceAction::SystemRestart),
    ] {
        let runtime = FakeRuntime::new();
        let store = Arc::new(MemoryStore::new());
        if let Some(action) = status {
            store.set_service_status(ServiceStatus::new(action)).unwrap();
        }
        let (sup, rec) = supervisor(&runtime, &store);

        sup.start(TaskData::new(HANDLE), TaskEventAction::nothing());
        settle().await;

        assert_eq!(
            rec.events()[1],
            LifecycleEvent::TaskStart(StarterReason::System),
            "status {status:?}"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_unreadable_status_falls_back_to_system() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("service_status.json"), "not json").unwrap();
    let runtime = FakeRuntime::new();
    let sup = TaskSupervisor::builder(runtime.clone())
        .with_store(Arc::new(JsonFileStore::new(dir.path())))
        .build();
    let rec = Recorder::new();
    sup.add_listener(rec.clone());
    let mut events = sup.events();

    sup.start(TaskData::new(HANDLE), TaskEventAction::nothing());
    settle().await;

    assert_eq!(drain(&mut events), vec![EventKind::StoreReadFailed]);
    assert_eq!(
        rec.events()[1],
        LifecycleEvent::TaskStart(StarterReason::System)
    );
}

#[tokio::test(start_paused = true)]
async fn test_second_start_while_running_is_ignored() {
    let runtime = FakeRuntime::new();
    let (sup, rec) = supervisor(&runtime, &developer_store());

    sup.start(TaskData::new(HANDLE), TaskEventAction::nothing());
    sup.start(TaskData::new(CallbackHandle(9)), TaskEventAction::once());
    settle().await;

    assert_eq!(runtime.created(), vec![HANDLE]);
    assert_eq!(rec.count(LifecycleEvent::EngineCreate), 1);
    assert_eq!(runtime.count(WorkerCall::REPEAT_EVENT), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_all_handles_tears_worker_down() {
    let runtime = FakeRuntime::new();
    let (sup, rec) = supervisor(&runtime, &developer_store());

    sup.start(TaskData::new(HANDLE), TaskEventAction::repeat(100));
    settle().await;
    drop(sup);
    time::sleep(Duration::from_secs(1)).await;

    assert_eq!(runtime.destroyed(), vec![0]);
    assert_eq!(runtime.count(WorkerCall::REPEAT_EVENT), 0);
    assert_eq!(rec.count(LifecycleEvent::EngineWillDestroy), 1);
}

#[tokio::test(start_paused = true)]
async fn test_removed_listener_sees_nothing_further() {
    let runtime = FakeRuntime::new();
    let (sup, rec) = supervisor(&runtime, &developer_store());
    let listener: workvisor::ListenerRef = rec.clone();

    assert!(!sup.add_listener(listener.clone()));
    assert!(sup.remove_listener(&listener));
    sup.start(TaskData::new(HANDLE), TaskEventAction::once());
    settle().await;

    assert!(rec.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_destroy_during_update_teardown_does_not_recreate() {
    let runtime = FakeRuntime::new();
    runtime.set_destroy_mode(DestroyMode::Hang);
    let store = developer_store();
    let (sup, rec) = supervisor(&runtime, &store);

    sup.start(TaskData::new(HANDLE), TaskEventAction::repeat(1000));
    settle().await;
    store.set_task_data(TaskData::new(CallbackHandle(7))).unwrap();
    sup.update(TaskEventAction::repeat(1000));
    time::sleep(Duration::from_millis(10)).await;
    sup.destroy();
    sup.stopped().await;
    time::sleep(Duration::from_secs(5)).await;

    assert_eq!(runtime.created(), vec![HANDLE]);
    assert_eq!(runtime.channels().len(), 1);
    assert_eq!(runtime.destroyed(), vec![0]);
    assert_eq!(
        rec.transitions(),
        vec![
            LifecycleEvent::EngineCreate,
            LifecycleEvent::TaskStart(StarterReason::Developer),
            LifecycleEvent::TaskDestroy,
            LifecycleEvent::EngineWillDestroy,
        ]
    );
    assert_eq!(sup.state(), SupervisorState::Destroyed);
}

/// Listener that takes far longer per repeat event than the repeat interval.
#[derive(Default)]
struct SlowListener {
    transitions: Mutex<Vec<LifecycleEvent>>,
}

#[async_trait]
impl LifecycleListener for SlowListener {
    async fn on_engine_create(&self) {
        self.transitions.lock().unwrap().push(LifecycleEvent::EngineCreate);
    }

    async fn on_task_repeat_event(&self) {
        time::sleep(Duration::from_millis(10)).await;
    }

    async fn on_task_destroy(&self) {
        self.transitions.lock().unwrap().push(LifecycleEvent::TaskDestroy);
    }

    async fn on_engine_will_destroy(&self) {
        self.transitions
            .lock()
            .unwrap()
            .push(LifecycleEvent::EngineWillDestroy);
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}

#[tokio::test(start_paused = true)]
async fn test_backlogged_listener_still_sees_teardown_once() {
    let runtime = FakeRuntime::new();
    let (sup, _rec) = supervisor(&runtime, &developer_store());
    let slow = Arc::new(SlowListener::default());
    assert!(sup.add_listener(slow.clone()));

    sup.start(TaskData::new(HANDLE), TaskEventAction::repeat(1));
    time::sleep(Duration::from_secs(2)).await;
    sup.destroy();
    sup.stopped().await;
    time::sleep(Duration::from_secs(60)).await;

    assert!(runtime.count(WorkerCall::REPEAT_EVENT) > 1024);
    assert_eq!(
        *slow.transitions.lock().unwrap(),
        vec![
            LifecycleEvent::EngineCreate,
            LifecycleEvent::TaskDestroy,
            LifecycleEvent::EngineWillDestroy,
        ]
    );
}
