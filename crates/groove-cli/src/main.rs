//! groove-cli: headless player for groove files

mod config;
mod sink;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use groove_core::{GridId, HitType, Instrument, InstrumentRegistry};
use groove_services::{
    EditorEvent, GrooveEditor, JsonDirPersistence, Persistence, SectionChangeFn, SinkReporter,
};
use sink::LoggingSink;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Longest sleep between pumps when the clock has no deadline to report
const MAX_IDLE: Duration = Duration::from_millis(2);

fn default_kit() -> Vec<Instrument> {
    vec![
        Instrument::new(1, "Kick", vec![HitType::new(1, "X", "Kick").with_sample("kick.wav")]),
        Instrument::new(
            2,
            "Snare",
            vec![
                HitType::new(1, "X", "Snare").with_sample("snare.wav"),
                HitType::new(2, "O", "Rim").with_sample("rim.wav"),
            ],
        ),
        Instrument::new(
            3,
            "Hi-hat",
            vec![
                HitType::new(1, "X", "Closed").with_sample("hat-closed.wav"),
                HitType::new(2, "O", "Open").with_sample("hat-open.wav"),
            ],
        ),
    ]
}

fn log_event(event: EditorEvent) {
    match event {
        EditorEvent::DatabaseError { doing_what, error } => {
            tracing::error!(doing_what = %doing_what, error = %error, "Database error")
        }
        EditorEvent::MissingSampleAudio(hit) => {
            tracing::warn!(instrument = %hit.instrument_id, hit = hit.hit_id.0, "Missing sample")
        }
        other => tracing::debug!(?other, "Editor event"),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("groove=debug".parse()?))
        .init();

    let config = config::load_config();
    let data_dir = std::env::args()
        .nth(1)
        .map(Into::into)
        .unwrap_or_else(|| config.data_dir());
    tracing::info!(path = %data_dir.display(), timing = ?config.playback.timing, "Starting groove");

    let mut store = JsonDirPersistence::open(&data_dir)
        .with_context(|| format!("opening grid store at {}", data_dir.display()))?;
    let mut instruments = store.all_instruments().context("reading instruments")?;
    if instruments.is_empty() {
        instruments = default_kit();
        for instrument in &instruments {
            store.save_instrument(instrument).context("saving default kit")?;
        }
    }
    let registry = InstrumentRegistry::from_instruments(instruments);

    let (reporter, reports) = SinkReporter::channel();
    let sink = Arc::new(LoggingSink::new(registry.clone(), reporter));
    let mut editor = GrooveEditor::new(registry, Box::new(store), sink, &config.playback)
        .with_sink_reports(reports);
    editor.load();
    let events = editor.events();

    let on_section: SectionChangeFn = Arc::new(|grid: GridId, section: usize| {
        tracing::info!(grid = %grid, section, "Section");
    });
    editor.play_sequence(Some(on_section), Instant::now())?;

    while editor.is_playing() {
        let now = Instant::now();
        editor.pump(now)?;
        events.try_iter().for_each(log_event);

        let wake = editor
            .next_wakeup()
            .map_or(now + MAX_IDLE, |t| t.min(now + MAX_IDLE));
        thread::sleep(wake.saturating_duration_since(Instant::now()));
    }
    events.try_iter().for_each(log_event);

    tracing::info!("Playback finished");
    Ok(())
}
