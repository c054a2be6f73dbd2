use alarmclock::prelude::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};

fn tod(s: &str) -> TimeOfDay {
    s.parse().unwrap()
}

fn engine_at(start: &str) -> (AlarmClockEngine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(tod(start)));
    let engine = AlarmClockEngine::with_clock(AlarmClockConfig::default(), clock.clone());
    (engine, clock)
}

/// Drains every event currently queued on a receiver.
fn drain(rx: &mut broadcast::Receiver<AlarmEvent>) -> Vec<AlarmEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn fired_ids(events: &[AlarmEvent]) -> Vec<AlarmId> {
    events
        .iter()
        .filter_map(|event| match event {
            AlarmEvent::Fired { id, .. } => Some(*id),
            _ => None,
        })
        .collect()
}

#[derive(Default)]
struct RecordingSink {
    calls: Mutex<Vec<String>>,
}

impl RecordingSink {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn on_alarm_fired(&self, _alarm_id: AlarmId, display_time: &str) {
        self.calls.lock().unwrap().push(format!("fired {display_time}"));
    }

    fn acknowledge(&self, _alarm_id: AlarmId) {
        self.calls.lock().unwrap().push("ack".to_string());
    }
}

#[tokio::test]
async fn alarm_fires_once_then_stays_quiet() {
    let (engine, _clock) = engine_at("08:00:00");
    let mut events = engine.subscribe_alarm_events();

    let id = engine.set_alarm("08", "15", "30").await.unwrap();
    let dup = engine.set_alarm("8", "15", "30").await.unwrap_err();
    assert!(matches!(dup, AlarmError::Duplicate(_)));
    assert_eq!(engine.list().await.len(), 1);

    let fired = engine.process_tick(tod("08:15:30")).await;
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].id, id);
    assert_eq!(engine.get(id).await.unwrap().state, AlarmState::Fired);

    assert!(engine.process_tick(tod("08:15:31")).await.is_empty());

    let events = drain(&mut events);
    assert_eq!(fired_ids(&events), vec![id]);
    assert!(events.contains(&AlarmEvent::Fired {
        id,
        time_of_day: tod("08:15:30"),
        display_time: "08:15:30".to_string(),
    }));
}

#[tokio::test]
async fn non_matching_tick_changes_nothing() {
    let (engine, _clock) = engine_at("08:00:00");
    engine.add_alarm(tod("09:00:00")).await.unwrap();
    let before = engine.list().await;
    let mut events = engine.subscribe_alarm_events();

    assert!(engine.process_tick(tod("08:59:59")).await.is_empty());
    assert!(drain(&mut events).is_empty());
    assert_eq!(engine.list().await, before);
}

#[tokio::test]
async fn invalid_input_is_rejected_without_state_change() {
    let (engine, _clock) = engine_at("08:00:00");
    let err = engine.set_alarm("24", "00", "00").await.unwrap_err();
    assert!(matches!(
        err,
        AlarmError::Validation(ValidationError::OutOfRange { .. })
    ));
    let err = engine.set_alarm("seven", "00", "00").await.unwrap_err();
    assert!(matches!(
        err,
        AlarmError::Validation(ValidationError::NotNumeric { .. })
    ));
    assert!(engine.list().await.is_empty());
}

#[tokio::test]
async fn fired_alarm_uses_active_display_format() {
    let (engine, _clock) = engine_at("08:00:00");
    engine.set_format(ClockFormat::TwelveHour).await;
    let mut events = engine.subscribe_alarm_events();
    engine.add_alarm(tod("19:30:00")).await.unwrap();

    engine.process_tick(tod("19:30:00")).await;
    let displayed: Vec<String> = drain(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            AlarmEvent::Fired { display_time, .. } => Some(display_time),
            _ => None,
        })
        .collect();
    assert_eq!(displayed, vec!["07:30:00 PM".to_string()]);
}

#[tokio::test]
async fn toggling_format_only_changes_display() {
    let (engine, _clock) = engine_at("07:00:00");
    assert_eq!(engine.display_now().await, "07:00:00");
    assert_eq!(engine.toggle_format().await, ClockFormat::TwelveHour);
    assert_eq!(engine.display_now().await, "07:00:00 AM");

    let id = engine.add_alarm(tod("07:00:01")).await.unwrap();
    let fired = engine.process_tick(tod("07:00:01")).await;
    assert_eq!(fired[0].id, id);
}

#[tokio::test]
async fn acknowledge_moves_fired_alarm_to_acknowledged() {
    let (engine, _clock) = engine_at("08:00:00");
    let id = engine.add_alarm(tod("06:00:00")).await.unwrap();
    assert!(!engine.acknowledge(id).await);

    engine.process_tick(tod("06:00:00")).await;
    assert_eq!(engine.acknowledge_all().await, vec![id]);
    assert_eq!(engine.get(id).await.unwrap().state, AlarmState::Acknowledged);
    assert!(!engine.acknowledge(id).await);
}

#[tokio::test]
async fn rearmed_alarm_fires_again() {
    let (engine, _clock) = engine_at("08:00:00");
    let id = engine.add_alarm(tod("06:00:00")).await.unwrap();
    engine.process_tick(tod("06:00:00")).await;
    assert!(engine.process_tick(tod("06:00:00")).await.is_empty());

    assert_eq!(engine.enable(id).await, Ok(true));
    assert_eq!(engine.process_tick(tod("06:00:00")).await.len(), 1);
}

#[tokio::test]
async fn selection_errors_leave_registry_alone() {
    let (engine, _clock) = engine_at("08:00:00");
    engine.add_alarm(tod("06:00:00")).await.unwrap();

    assert_eq!(
        engine.remove_selected(None).await,
        Err(SelectionError::NothingSelected)
    );
    assert_eq!(
        engine.remove_selected(Some(3)).await,
        Err(SelectionError::OutOfRange {
            position: 3,
            len: 1
        })
    );
    assert_eq!(engine.list().await.len(), 1);
    assert!(engine.remove_selected(Some(0)).await.is_ok());
    assert!(engine.list().await.is_empty());
}

#[tokio::test]
async fn remove_all_clears_and_reports_count() {
    let (engine, _clock) = engine_at("08:00:00");
    for time in ["06:00:00", "06:30:00", "07:00:00"] {
        engine.add_alarm(tod(time)).await.unwrap();
    }
    let mut events = engine.subscribe_alarm_events();
    assert_eq!(engine.remove_all().await, 3);
    assert!(engine.list().await.is_empty());
    assert!(matches!(
        drain(&mut events).as_slice(),
        [AlarmEvent::Cleared { ids }] if ids.len() == 3
    ));
    assert_eq!(engine.remove_all().await, 0);
}

#[tokio::test]
async fn sink_hears_fired_and_acknowledged_alarms() {
    let (engine, _clock) = engine_at("08:00:00");
    let sink = Arc::new(RecordingSink::default());
    engine.attach_sink(sink.clone());

    let id = engine.add_alarm(tod("08:15:30")).await.unwrap();
    engine.process_tick(tod("08:15:30")).await;
    engine.acknowledge(id).await;

    tokio::time::timeout(Duration::from_secs(2), async {
        while sink.calls().len() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("sink was not notified");
    assert_eq!(sink.calls(), vec!["fired 08:15:30", "ack"]);
}

#[tokio::test]
async fn running_engine_fires_on_matching_tick() {
    let (engine, clock) = engine_at("08:15:29");
    let id = engine.add_alarm(tod("08:15:30")).await.unwrap();
    let mut events = engine.subscribe_alarm_events();
    let mut system = engine.subscribe_system_events();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let runner = engine.clone();
    let handle = tokio::spawn(async move {
        runner
            .run_until(async {
                stop_rx.await.ok();
            })
            .await;
    });

    // Wait until the dispatcher is listening before moving the clock.
    let started = tokio::time::timeout(Duration::from_secs(2), system.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(started, SystemEvent::EngineStarted { .. }));
    clock.set(tod("08:15:30"));

    let event = tokio::time::timeout(Duration::from_secs(3), events.recv())
        .await
        .expect("alarm did not fire")
        .unwrap();
    assert!(matches!(event, AlarmEvent::Fired { id: fired, .. } if fired == id));
    assert_eq!(engine.get(id).await.unwrap().state, AlarmState::Fired);

    stop_tx.send(()).unwrap();
    handle.await.unwrap();
    assert!(matches!(
        system.recv().await.unwrap(),
        SystemEvent::EngineShutdown
    ));
}

#[tokio::test]
async fn engine_exposes_its_configuration() {
    let config = AlarmClockConfig {
        beep_interval_ms: 750,
        sound: None,
        ..AlarmClockConfig::default()
    };
    let engine = AlarmClockEngine::with_clock(config, Arc::new(ManualClock::new(tod("09:00:00"))));
    assert_eq!(engine.beep_interval(), Duration::from_millis(750));
    assert_eq!(engine.config().sound, None);
    assert_eq!(engine.config().format, ClockFormat::TwentyFourHour);
}
