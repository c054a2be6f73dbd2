use alarmclock::prelude::*;
use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// How long the demo lets an alarm ring before silencing it itself.
const DEMO_RING_TIME: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load the configuration and initialize structured logging.
    let config = AlarmClockConfig::load()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_target(false)
        .init();

    // 2. Create the engine and attach the terminal sink.
    let engine = AlarmClockEngine::new(config);
    engine.attach_sink(Arc::new(TerminalSink::new(
        engine.config().sound.clone(),
        engine.beep_interval(),
    )));

    // 3. Spawn tasks that log events, draw the readout and silence alarms.
    spawn_event_listeners(&engine);

    // 4. Register two alarms a few seconds ahead.
    register_demo_alarms(&engine).await?;

    // 5. Run the engine.
    engine.run().await?;

    Ok(())
}

/// Spawns several tasks, each subscribing to a different event stream from the engine.
fn spawn_event_listeners(engine: &AlarmClockEngine) {
    let mut system_rx = engine.subscribe_system_events();
    tokio::spawn(async move {
        while let Ok(event) = system_rx.recv().await {
            info!("[SYSTEM] => {:?}", event);
        }
    });

    let mut tick_rx = engine.subscribe_tick_events();
    let readout_engine = engine.clone();
    tokio::spawn(async move {
        while let Ok(tick) = tick_rx.recv().await {
            let readout = readout_engine.display(tick.time_of_day).await;
            print!("\r{}  ", readout.green().bold());
            std::io::stdout().flush().ok();
        }
    });

    // Nobody is at the keyboard in the demo, so alarms silence themselves.
    let mut alarm_rx = engine.subscribe_alarm_events();
    let ack_engine = engine.clone();
    tokio::spawn(async move {
        while let Ok(event) = alarm_rx.recv().await {
            info!("[ALARM] => {:?}", event);
            if let AlarmEvent::Fired { id, .. } = event {
                let engine = ack_engine.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(DEMO_RING_TIME).await;
                    engine.acknowledge(id).await;
                });
            }
        }
    });
}

/// Registers demo alarms relative to the current time.
async fn register_demo_alarms(engine: &AlarmClockEngine) -> Result<()> {
    let now = engine.now();
    for offset in [5, 15] {
        let at = now.plus_seconds(offset);
        engine.add_alarm(at).await?;
        info!("Alarm set for {}.", engine.display(at).await);
    }
    Ok(())
}
