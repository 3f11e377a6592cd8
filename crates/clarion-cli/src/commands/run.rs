use std::sync::Arc;

use clap::Args;
use clarion_core::{
    AlarmStore, AlarmsFile, Config, Engine, Event, EngineSettings, Notifier, RodioBackend,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::info;

#[derive(Args)]
pub struct RunArgs {
    /// Print engine events as JSON lines instead of text
    #[arg(long)]
    pub json: bool,
}

/// Desktop notifications, falling back to stdout when the desktop bus is
/// unavailable (headless sessions, ssh).
struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, message: &str) {
        let shown = notify_rust::Notification::new()
            .summary(title)
            .body(message)
            .show();
        if let Err(e) = shown {
            tracing::debug!("desktop notification failed: {e}");
            println!("* {title}: {message}");
        }
    }
}

fn print_event(event: &Event, json: bool) {
    if json {
        if let Ok(line) = serde_json::to_string(event) {
            println!("{line}");
        }
        return;
    }
    match event {
        Event::AlarmFired { alarm_id, label, at } => {
            println!("[{}] ringing: {label} ({alarm_id})", at.format("%H:%M:%S"));
        }
        Event::AlarmUnsnoozed { alarm_id, at } => {
            println!("[{}] snooze expired: {alarm_id}", at.format("%H:%M:%S"));
        }
        Event::AlarmSnoozed { alarm_id, until, at } => {
            println!(
                "[{}] snoozed until {}: {alarm_id}",
                at.format("%H:%M:%S"),
                until.format("%H:%M")
            );
        }
        Event::AlarmStopped { alarm_id, at } => {
            println!("[{}] stopped: {alarm_id}", at.format("%H:%M:%S"));
        }
        Event::SessionStartFailed { alarm_id, reason, at } => {
            println!("[{}] sound failed for {alarm_id}: {reason}", at.format("%H:%M:%S"));
        }
    }
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::load_or_default();
    let settings = EngineSettings::from(&config);
    let store = Arc::new(AlarmStore::open(Box::new(AlarmsFile::open()?))?);
    let audio = Arc::new(RodioBackend::new(config.sound_dir.clone()));
    let notifier: Arc<dyn Notifier> = Arc::new(DesktopNotifier);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let engine = Engine::new(store, audio, notifier, settings);
        let mut events = engine.subscribe();
        engine.start();
        info!(alarms = engine.store().list().len(), "clarion running, ctrl-c to exit");

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                event = events.recv() => match event {
                    Ok(event) => print_event(&event, args.json),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                },
            }
        }
        engine.shutdown();
    });
    Ok(())
}
