//! TrackPal - single-finger edge scrolling for precision trackpads
//!
//! Wires the multitouch source, the intent engine, the suppressing
//! event tap and the display-link clock together and drains the
//! producer rings on the main loop.

use anyhow::Context;
use trackpal::app::cli::{Cli, Commands, ConfigAction};
use trackpal::store::SettingsStore;
use trackpal::time::Timebase;
#[cfg(target_os = "macos")]
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    Timebase::init();

    let store = match &cli.settings {
        Some(path) => SettingsStore::new(path.clone()),
        None => SettingsStore::at_default_path(),
    };

    match cli.command {
        Commands::Run {
            duration,
            dump_sessions,
        } => run_engine(&store, duration, dump_sessions),
        Commands::Doctor => run_doctor(&store),
        Commands::Config { action } => run_config(action, &store),
    }
}

#[cfg(target_os = "macos")]
fn run_engine(store: &SettingsStore, duration: u64, dump_sessions: bool) -> anyhow::Result<()> {
    use trackpal::engine::{AdaptiveLearner, Engine};
    use trackpal::events::clock::DisplayLinkClock;
    use trackpal::events::sink::QuartzEventSink;
    use trackpal::events::tap::{QuartzInterceptor, SharedState};
    use trackpal::touch::source::MultitouchDevice;
    use trackpal::touch::types::FrameMessage;

    let (config, adaptive) = store.load().context("failed to load settings")?;
    if !config.is_enabled {
        info!("TrackPal is disabled in settings (isEnabled = false); nothing to do");
        return Ok(());
    }

    let (frame_producer, mut frame_consumer) = rtrb::RingBuffer::<FrameMessage>::new(1024);
    let (tick_producer, mut tick_consumer) = rtrb::RingBuffer::<f64>::new(256);

    let shared = SharedState::new();
    let interceptor = QuartzInterceptor::new(shared.clone());
    let clock = DisplayLinkClock::new(tick_producer);

    let mut engine = Engine::new(
        config,
        AdaptiveLearner::from_state(adaptive),
        Box::new(QuartzEventSink::new()),
        Box::new(clock),
        shared,
    )
    .with_interceptor(Box::new(interceptor))
    .with_store(store.clone());

    // No trackpad is a degradation, not a failure: the engine runs but
    // accepts no touches
    match MultitouchDevice::open(frame_producer) {
        Ok(source) => {
            engine = engine.with_source(Box::new(source));
        }
        Err(e) => {
            tracing::warn!("Multitouch source unavailable: {e}");
        }
    }

    engine.start().context("failed to start the engine")?;
    if duration == 0 {
        info!("Running until killed (Ctrl+C)");
    } else {
        info!("Running for {} second(s)", duration);
    }

    let started = std::time::Instant::now();
    loop {
        while let Ok(message) = frame_consumer.pop() {
            engine.handle_frame(message);
        }
        while let Ok(tick) = tick_consumer.pop() {
            engine.handle_tick(tick);
        }

        if duration > 0 && started.elapsed().as_secs() >= duration {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(1));
    }

    if dump_sessions {
        dump_session_history(&engine, store)?;
    }
    engine.stop();
    Ok(())
}

#[cfg(not(target_os = "macos"))]
fn run_engine(_store: &SettingsStore, _duration: u64, _dump_sessions: bool) -> anyhow::Result<()> {
    anyhow::bail!("the engine needs the macOS multitouch and Quartz frameworks")
}

#[cfg(target_os = "macos")]
fn dump_session_history(
    engine: &trackpal::engine::Engine,
    store: &SettingsStore,
) -> anyhow::Result<()> {
    let json = engine.recorder().export_json()?;
    let name = chrono::Local::now()
        .format("sessions_%Y%m%d_%H%M%S.json")
        .to_string();
    let path = store
        .path()
        .parent()
        .map(|dir| dir.join(&name))
        .unwrap_or_else(|| std::path::PathBuf::from(&name));
    std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    info!("Session history written to {}", path.display());
    Ok(())
}

#[cfg(target_os = "macos")]
fn run_doctor(store: &SettingsStore) -> anyhow::Result<()> {
    use trackpal::events::tap::QuartzInterceptor;
    use trackpal::touch::source::MultitouchDevice;
    use trackpal::touch::types::FrameMessage;

    println!("Settings file: {}", store.path().display());
    match store.load() {
        Ok((config, adaptive)) => {
            println!("Settings:      ok (enabled: {})", config.is_enabled);
            println!(
                "Adaptive:      centers h={:.3} v={:.3}, bonuses h={:.3} v={:.3}",
                adaptive.dir_center_h,
                adaptive.dir_center_v,
                adaptive.retry_bonus_h,
                adaptive.retry_bonus_v
            );
        }
        Err(e) => println!("Settings:      ERROR ({e})"),
    }

    let trusted = QuartzInterceptor::accessibility_trusted();
    println!(
        "Accessibility: {}",
        if trusted {
            "granted"
        } else {
            "NOT granted - enable TrackPal under System Settings > Privacy & Security > Accessibility"
        }
    );

    let (probe_producer, _probe_consumer) = rtrb::RingBuffer::<FrameMessage>::new(8);
    match MultitouchDevice::open(probe_producer) {
        Ok(_) => println!("Trackpad:      found"),
        Err(e) => println!("Trackpad:      NOT found ({e})"),
    }

    Ok(())
}

#[cfg(not(target_os = "macos"))]
fn run_doctor(store: &SettingsStore) -> anyhow::Result<()> {
    println!("Settings file: {}", store.path().display());
    println!("Platform:      not macOS; device and permission checks skipped");
    Ok(())
}

fn run_config(action: ConfigAction, store: &SettingsStore) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let (config, adaptive) = store.load().context("failed to load settings")?;
            println!("{:#?}", config);
            println!("{:#?}", adaptive);
        }
        ConfigAction::Init { force } => {
            if store.path().exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    store.path().display()
                );
            }
            store.save(&Default::default(), &Default::default())?;
            println!("Wrote {}", store.path().display());
        }
        ConfigAction::Path => {
            println!("{}", store.path().display());
        }
    }
    Ok(())
}
