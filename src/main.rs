//! Cube Strike entry point
//!
//! Runs a headless session: a randomly wandering stick plays against the
//! engine on real threads, draw calls go to the log, and the debug
//! counters are printed as JSON when the session ends.
//!
//! Usage: `cube-strike [settings.json] [rounds]`

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cube_strike::Settings;
use cube_strike::audio::{AudioManager, LogSink};
use cube_strike::platform::{Button, ButtonEvent, WanderingStick};
use cube_strike::renderer::LogSurface;
use cube_strike::runtime::ThreadRunner;
use cube_strike::sim::{Arena, SessionController, SessionPhase};

/// Give up on a round that runs longer than this
const ROUND_LIMIT: Duration = Duration::from_secs(300);
const POLL: Duration = Duration::from_millis(100);

fn main() {
    env_logger::init();
    log::info!("Cube Strike (headless) starting...");

    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => Settings::load_or_default(Path::new(&path)),
        None => Settings::default(),
    };
    let rounds: u32 = args.next().and_then(|r| r.parse().ok()).unwrap_or(1).max(1);

    let seed = settings.seed.unwrap_or_else(rand::random);
    let arena = Arena::builder(settings)
        .surface(LogSurface)
        .input(WanderingStick::new(seed))
        .audio(AudioManager::new(LogSink))
        .build();
    let arena = match arena {
        Ok(arena) => Arc::new(arena),
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    let mut controller = SessionController::new(Arc::clone(&arena), ThreadRunner::new());
    controller.handle(ButtonEvent::new(Button::Start, arena.now()));

    for round in 1..=rounds {
        let started = arena.now();
        while controller.poll() != SessionPhase::GameOver {
            if arena.now().saturating_sub(started) > ROUND_LIMIT {
                log::warn!("Round {round} hit the time limit");
                break;
            }
            thread::sleep(POLL);
        }
        log::info!(
            "Round {round}: score {}, level {}",
            arena.session.score(),
            arena.session.level()
        );
        if round < rounds {
            controller.handle(ButtonEvent::new(Button::Restart, arena.now()));
        }
    }
    controller.shutdown();

    match serde_json::to_string_pretty(&arena.diagnostics.report()) {
        Ok(json) => println!("{json}"),
        Err(e) => log::error!("Failed to serialize diagnostics: {e}"),
    }
    if let Ok(json) = serde_json::to_string_pretty(&arena.highscores()) {
        println!("{json}");
    }
}
