//! The notification sink contract and its delivery task.
//!
//! The engine never calls a sink directly. [`spawn_notifier`] forwards the
//! alarm event stream to a sink on its own task, so a slow or blocking sink
//! delays other notifications but never the matcher's next tick.

use crate::common::AlarmId;
use crate::components::ringer::Ringer;
use crate::events::AlarmEvent;
use colored::Colorize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Presents a fired alarm to the user.
pub trait NotificationSink: Send + Sync {
    /// An alarm fired. Start playback and show an acknowledgment affordance.
    fn on_alarm_fired(&self, alarm_id: AlarmId, display_time: &str);

    /// The alarm was silenced (or deleted). Stop any playback for it.
    ///
    /// May be called for alarms that are not ringing; that must be a no-op.
    fn acknowledge(&self, alarm_id: AlarmId);
}

/// Delivers alarm events to `sink` until the event channel closes.
pub fn spawn_notifier(
    mut events: broadcast::Receiver<AlarmEvent>,
    sink: Arc<dyn NotificationSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(AlarmEvent::Fired {
                    id, display_time, ..
                }) => sink.on_alarm_fired(id, &display_time),
                Ok(AlarmEvent::Acknowledged { id }) | Ok(AlarmEvent::Removed { id }) => {
                    sink.acknowledge(id)
                }
                Ok(AlarmEvent::Cleared { ids }) => ids.into_iter().for_each(|id| sink.acknowledge(id)),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Notification sink fell behind; {} alarm events dropped.", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!("Notifier stopped.");
    })
}

/// Rings in the terminal and prints a banner for each fired alarm.
#[derive(Debug)]
pub struct TerminalSink {
    sound: Option<PathBuf>,
    beep_interval: Duration,
    ringing: Mutex<HashMap<AlarmId, Ringer>>,
}

impl TerminalSink {
    pub fn new(sound: Option<PathBuf>, beep_interval: Duration) -> Self {
        Self {
            sound,
            beep_interval,
            ringing: Mutex::new(HashMap::new()),
        }
    }

    /// Number of alarms currently making noise.
    pub fn ringing_count(&self) -> usize {
        self.ringing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl NotificationSink for TerminalSink {
    fn on_alarm_fired(&self, alarm_id: AlarmId, display_time: &str) {
        println!(
            "\n{} {} {}",
            "[ALARM]".red().bold(),
            format!("Time's up! It's {display_time}.").bold(),
            "Type 'stop' to silence it.".dimmed()
        );
        info!("Alarm {:?} ringing for {}.", alarm_id, display_time);
        let ringer = Ringer::start(self.sound.as_deref(), self.beep_interval);
        let mut ringing = self.ringing.lock().unwrap_or_else(PoisonError::into_inner);
        // Replacing an old ringer drops it, which silences it.
        ringing.insert(alarm_id, ringer);
    }

    fn acknowledge(&self, alarm_id: AlarmId) {
        let removed = self
            .ringing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&alarm_id);
        if let Some(mut ringer) = removed {
            ringer.stop();
            println!("{}", "Alarm stopped.".green());
            info!("Alarm {:?} silenced.", alarm_id);
        }
    }
}
