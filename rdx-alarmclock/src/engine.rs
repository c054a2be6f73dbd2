//! The core engine that orchestrates the alarm clock.

use crate::common::AlarmId;
use crate::components::matcher::AlarmMatcher;
use crate::config::AlarmClockConfig;
use crate::error::{AlarmError, DuplicateError, SelectionError};
use crate::events::{AlarmEvent, SystemEvent};
use crate::notify::{spawn_notifier, NotificationSink};
use crate::registry::{AlarmEntry, AlarmFired, AlarmRegistry};
use crate::time::{ClockFormat, ClockSource, LocalClock, SystemClock, TickEvent, TimeOfDay};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

/// The main alarm clock engine.
///
/// This struct is the central point of control. It owns the alarm registry,
/// the current display format and the event channels, and drives the tick
/// loop that matches alarms against the clock. The `Engine` is designed to be
/// cloned and shared across tasks; every clone is a handle to the same state.
#[derive(Clone)]
pub struct AlarmClockEngine {
    config: Arc<AlarmClockConfig>,
    clock: Arc<dyn ClockSource>,
    registry: Arc<RwLock<AlarmRegistry>>,
    format: Arc<RwLock<ClockFormat>>,
    tick_sender: broadcast::Sender<Arc<TickEvent>>,
    alarm_event_sender: broadcast::Sender<AlarmEvent>,
    system_event_sender: broadcast::Sender<SystemEvent>,
}

// Core implementation block for internal logic.
impl AlarmClockEngine {
    /// Creates an engine reading the local system clock.
    pub fn new(config: AlarmClockConfig) -> Self {
        Self::with_clock(config, Arc::new(LocalClock))
    }

    /// Creates an engine reading the given clock source.
    pub fn with_clock(config: AlarmClockConfig, clock: Arc<dyn ClockSource>) -> Self {
        const CHANNEL_CAPACITY: usize = 256;
        let (tick_sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (alarm_event_sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (system_event_sender, _) = broadcast::channel(64);

        Self {
            format: Arc::new(RwLock::new(config.format)),
            config: Arc::new(config),
            clock,
            registry: Arc::new(RwLock::new(AlarmRegistry::new())),
            tick_sender,
            alarm_event_sender,
            system_event_sender,
        }
    }

    /// Runs the engine until Ctrl+C is received.
    pub async fn run(&self) -> anyhow::Result<()> {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
        };
        self.run_until(ctrl_c).await;
        Ok(())
    }

    /// Runs the engine until `shutdown` completes.
    ///
    /// This method will:
    /// 1. Spawn the `SystemClock` task.
    /// 2. Spawn the dispatcher task that matches alarms on every tick.
    /// 3. Wait for `shutdown`, then stop both tasks.
    pub async fn run_until(&self, shutdown: impl Future<Output = ()>) {
        info!("AlarmClockEngine starting up...");
        let (shutdown_tx, _) = broadcast::channel(1);

        let clock = SystemClock::new(
            self.config.resolution.clone(),
            self.clock.clone(),
            self.tick_sender.clone(),
        );
        let clock_shutdown_rx = shutdown_tx.subscribe();
        let clock_task = tokio::spawn(async move { clock.run(clock_shutdown_rx).await });

        let dispatcher = self.clone();
        let dispatcher_shutdown_rx = shutdown_tx.subscribe();
        let dispatcher_task =
            tokio::spawn(async move { dispatcher.dispatcher_loop(dispatcher_shutdown_rx).await });

        info!(
            "Engine running at {} tick(s) per second.",
            self.config.resolution.ticks_per_second()
        );
        shutdown.await;

        info!("Shutdown signal received. Broadcasting to all tasks...");
        if shutdown_tx.send(()).is_err() {
            error!("Failed to send shutdown signal. Some tasks may not terminate gracefully.");
        }
        for task in [clock_task, dispatcher_task] {
            if let Err(e) = task.await {
                error!("Engine task ended abnormally: {}", e);
            }
        }
        self.system_event_sender
            .send(SystemEvent::EngineShutdown)
            .ok();
        info!("AlarmClockEngine has shut down.");
    }

    #[doc(hidden)]
    async fn dispatcher_loop(self, mut shutdown_rx: broadcast::Receiver<()>) {
        // Subscribe before announcing the start so no tick is missed.
        let mut tick_rx = self.tick_sender.subscribe();
        let mut matcher = AlarmMatcher::new();
        self.system_event_sender
            .send(SystemEvent::EngineStarted {
                timestamp: tokio::time::Instant::now(),
            })
            .ok();
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                tick = tick_rx.recv() => match tick {
                    Ok(tick) => {
                        trace!("Tick #{} received.", tick.tick_count);
                        let fired = {
                            let mut registry = self.registry.write().await;
                            matcher.process_tick(&mut registry, tick.time_of_day)
                        };
                        self.announce_fired(fired).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("Dispatcher skipped {} stale ticks.", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    }

    /// Broadcasts one `Fired` event per alarm. Never blocks on listeners.
    async fn announce_fired(&self, fired: Vec<AlarmFired>) {
        if fired.is_empty() {
            return;
        }
        let format = *self.format.read().await;
        for alarm in fired {
            let display_time = alarm.time_of_day.format(format);
            info!("Alarm {:?} fired at {}.", alarm.id, display_time);
            // A send only fails when nobody listens; the alarm is still marked fired.
            self.alarm_event_sender
                .send(AlarmEvent::Fired {
                    id: alarm.id,
                    time_of_day: alarm.time_of_day,
                    display_time,
                })
                .ok();
        }
    }

    fn emit(&self, event: AlarmEvent) {
        self.alarm_event_sender.send(event).ok();
    }
}

// Public API implementation block.
impl AlarmClockEngine {
    /// Validates raw hour/minute/second input and registers an alarm for it.
    pub async fn set_alarm(
        &self,
        hour: &str,
        minute: &str,
        second: &str,
    ) -> Result<AlarmId, AlarmError> {
        let time_of_day = TimeOfDay::parse_fields(hour, minute, second)?;
        Ok(self.add_alarm(time_of_day).await?)
    }

    /// Registers an enabled alarm.
    ///
    /// # Returns
    /// The new alarm's id, or a `DuplicateError` if an enabled alarm already
    /// exists at `time_of_day`. The registry is unchanged on error.
    pub async fn add_alarm(&self, time_of_day: TimeOfDay) -> Result<AlarmId, DuplicateError> {
        let id = self.registry.write().await.add(time_of_day)?;
        self.emit(AlarmEvent::Added { id, time_of_day });
        Ok(id)
    }

    /// Disables an enabled alarm. Unknown ids and inactive alarms are a no-op.
    ///
    /// Returns `true` if the alarm changed.
    pub async fn disable(&self, id: AlarmId) -> bool {
        let changed = self.registry.write().await.disable(id);
        if changed {
            self.emit(AlarmEvent::Disabled { id });
        }
        changed
    }

    /// Re-arms an alarm that is disabled, ringing or silenced.
    ///
    /// A ringing alarm is silenced first.
    pub async fn enable(&self, id: AlarmId) -> Result<bool, DuplicateError> {
        let (was_ringing, changed) = {
            let mut registry = self.registry.write().await;
            let was_ringing = registry.get(id).is_some_and(AlarmEntry::is_ringing);
            (was_ringing, registry.enable(id)?)
        };
        if was_ringing {
            self.emit(AlarmEvent::Acknowledged { id });
        }
        if changed {
            self.emit(AlarmEvent::Enabled { id });
        }
        Ok(changed)
    }

    /// Deletes an alarm. Returns the removed entry, or `None` for unknown ids.
    pub async fn remove(&self, id: AlarmId) -> Option<AlarmEntry> {
        let removed = self.registry.write().await.remove(id)?;
        self.emit(AlarmEvent::Removed { id });
        Some(removed)
    }

    /// Deletes the alarm at a 0-based list position, as selected by the user.
    pub async fn remove_selected(
        &self,
        selection: Option<usize>,
    ) -> Result<AlarmEntry, SelectionError> {
        let removed = self.registry.write().await.remove_selected(selection)?;
        self.emit(AlarmEvent::Removed { id: removed.id });
        Ok(removed)
    }

    /// Deletes every alarm. Returns how many were removed.
    pub async fn remove_all(&self) -> usize {
        let ids = self.registry.write().await.remove_all();
        let count = ids.len();
        if count > 0 {
            self.emit(AlarmEvent::Cleared { ids });
        }
        count
    }

    /// A snapshot of all alarms in insertion order.
    pub async fn list(&self) -> Vec<AlarmEntry> {
        self.registry.read().await.list().cloned().collect()
    }

    /// Looks up a single alarm.
    pub async fn get(&self, id: AlarmId) -> Option<AlarmEntry> {
        self.registry.read().await.get(id).cloned()
    }

    /// The id of the alarm at a 0-based list position.
    pub async fn id_at(&self, position: usize) -> Option<AlarmId> {
        self.registry.read().await.id_at(position)
    }

    /// Silences a ringing alarm. Returns `true` if it was ringing.
    pub async fn acknowledge(&self, id: AlarmId) -> bool {
        let acknowledged = self.registry.write().await.acknowledge(id);
        if acknowledged {
            self.emit(AlarmEvent::Acknowledged { id });
        }
        acknowledged
    }

    /// Silences every ringing alarm and returns their ids.
    pub async fn acknowledge_all(&self) -> Vec<AlarmId> {
        let acknowledged: Vec<AlarmId> = {
            let mut registry = self.registry.write().await;
            let ringing = registry.ringing();
            ringing
                .into_iter()
                .filter(|id| registry.acknowledge(*id))
                .collect()
        };
        for id in &acknowledged {
            self.emit(AlarmEvent::Acknowledged { id: *id });
        }
        acknowledged
    }

    /// Runs one matcher step for `now`, as the tick loop would.
    ///
    /// Every enabled alarm set for `now` is moved to `Fired` and announced.
    /// Unlike the tick loop this does not skip a second it has already seen.
    pub async fn process_tick(&self, now: TimeOfDay) -> Vec<AlarmFired> {
        let fired = self.registry.write().await.fire_due(now);
        self.announce_fired(fired.clone()).await;
        fired
    }

    /// The current display format.
    pub async fn format(&self) -> ClockFormat {
        *self.format.read().await
    }

    /// Changes the display format. Matching is unaffected.
    pub async fn set_format(&self, format: ClockFormat) {
        *self.format.write().await = format;
        self.system_event_sender
            .send(SystemEvent::FormatChanged { format })
            .ok();
    }

    /// Switches between 24-hour and 12-hour display and returns the new format.
    pub async fn toggle_format(&self) -> ClockFormat {
        let format = self.format().await.toggled();
        self.set_format(format).await;
        format
    }

    /// The clock source's current reading.
    pub fn now(&self) -> TimeOfDay {
        self.clock.now()
    }

    /// The current time rendered in the active display format.
    pub async fn display_now(&self) -> String {
        self.now().format(self.format().await)
    }

    /// Renders any time of day in the active display format.
    pub async fn display(&self, time_of_day: TimeOfDay) -> String {
        time_of_day.format(self.format().await)
    }

    /// The configuration the engine was built with.
    pub fn config(&self) -> &AlarmClockConfig {
        &self.config
    }

    /// Pause between bells configured for fallback ringing.
    pub fn beep_interval(&self) -> Duration {
        self.config.beep_interval()
    }

    /// Delivers fired alarms and acknowledgements to `sink` on a separate task.
    pub fn attach_sink(&self, sink: Arc<dyn NotificationSink>) -> JoinHandle<()> {
        spawn_notifier(self.alarm_event_sender.subscribe(), sink)
    }

    /// Subscribes to the `SystemEvent` stream.
    pub fn subscribe_system_events(&self) -> broadcast::Receiver<SystemEvent> {
        self.system_event_sender.subscribe()
    }

    /// Subscribes to the `AlarmEvent` stream.
    pub fn subscribe_alarm_events(&self) -> broadcast::Receiver<AlarmEvent> {
        self.alarm_event_sender.subscribe()
    }

    /// Subscribes to the raw tick stream, e.g. to refresh a clock readout.
    pub fn subscribe_tick_events(&self) -> broadcast::Receiver<Arc<TickEvent>> {
        self.tick_sender.subscribe()
    }
}
