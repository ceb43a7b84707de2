//! Round runners
//!
//! [`ThreadRunner`] gives every actor of a round its own OS thread: the
//! periodic sampler, the cursor consumer, the director and one thread per
//! live target. [`StepRunner`] runs the same actors in lock-step from a
//! single thread, one [`StepRunner::tick`] at a time, for deterministic
//! runs under a [`ManualClock`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::platform::{ManualClock, Signal, suspend_until};
use crate::sim::director::{Director, DirectorStep, TargetSpawner, round_seed};
use crate::sim::input::{CursorUpdater, Pull, SampleOutcome, Sampler, cursor_queue};
use crate::sim::session::RoundRunner;
use crate::sim::target::{ActorStep, TargetActor, TargetState};
use crate::sim::Arena;

/// How long the consumer waits on an empty queue before rechecking the round
const CONSUMER_POLL: Duration = Duration::from_millis(20);
/// Upper bound on a director nap while a wave is alive
const DIRECTOR_POLL: Duration = Duration::from_millis(20);
/// Nap of a target waiting for its move interval
const ACTOR_NAP: Duration = Duration::from_millis(1);

/// Drive one target until it terminates
fn run_actor(mut actor: TargetActor) {
    loop {
        match actor.step() {
            ActorStep::Continue => thread::yield_now(),
            ActorStep::Idle => thread::park_timeout(ACTOR_NAP),
            ActorStep::Done(_) => break,
        }
    }
}

/// Spawns each target on a thread of its own
#[derive(Debug, Default)]
struct ThreadSpawner {
    handles: Vec<JoinHandle<()>>,
}

impl ThreadSpawner {
    /// Join the threads of actors that already finished
    fn reap(&mut self) {
        let (done, live): (Vec<_>, Vec<_>) =
            self.handles.drain(..).partition(|h| h.is_finished());
        self.handles = live;
        for handle in done {
            join_logged(handle, "target");
        }
    }

    fn join_all(&mut self) {
        for handle in self.handles.drain(..) {
            join_logged(handle, "target");
        }
    }
}

impl TargetSpawner for ThreadSpawner {
    fn spawn(&mut self, actor: TargetActor) {
        let name = format!("target-{}", actor.id().0);
        match thread::Builder::new().name(name).spawn(move || run_actor(actor)) {
            Ok(handle) => self.handles.push(handle),
            // The actor was dropped with the closure, which frees its slot
            Err(e) => log::error!("Failed to spawn target thread: {e}"),
        }
    }
}

fn join_logged(handle: JoinHandle<()>, what: &str) {
    if handle.join().is_err() {
        log::error!("{what} thread panicked");
    }
}

fn spawn_named(name: &str, f: impl FnOnce() + Send + 'static) -> Option<JoinHandle<()>> {
    match thread::Builder::new().name(name.to_string()).spawn(f) {
        Ok(handle) => Some(handle),
        Err(e) => {
            log::error!("Failed to spawn {name} thread: {e}");
            None
        }
    }
}

fn sampler_loop(arena: Arc<Arena>, mut sampler: Sampler, running: Arc<AtomicBool>) {
    let clock = Arc::clone(arena.clock());
    let period = arena.settings.sample_period();
    let mut deadline = clock.now();
    while running.load(Ordering::Acquire) {
        if sampler.sample() == SampleOutcome::Finished {
            log::info!("Sample run length reached");
            break;
        }
        deadline += period;
        suspend_until(clock.as_ref(), deadline);
    }
}

fn consumer_loop(mut updater: CursorUpdater, running: Arc<AtomicBool>) {
    updater.refresh_hud();
    while running.load(Ordering::Acquire) {
        match updater.pull_timeout(CONSUMER_POLL) {
            Pull::Applied(_) => {}
            Pull::Empty => {
                updater.refresh_hud();
            }
            // Sampler finished its run; keep the HUD current until the round ends
            Pull::Closed => {
                updater.refresh_hud();
                thread::sleep(CONSUMER_POLL);
            }
        }
    }
}

fn director_loop(arena: Arc<Arena>, mut director: Director, restart: Arc<Signal>) {
    let mut spawner = ThreadSpawner::default();
    loop {
        match director.poll(&mut spawner) {
            DirectorStep::Spawned(_) => {}
            DirectorStep::Waiting => {
                arena.slots.wait_clear(DIRECTOR_POLL);
            }
            DirectorStep::RoundOver | DirectorStep::AwaitingRestart => restart.wait(),
            DirectorStep::Terminated => break,
        }
        spawner.reap();
    }
    spawner.join_all();
}

struct RoundThreads {
    arena: Arc<Arena>,
    restart: Arc<Signal>,
    running: Arc<AtomicBool>,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

/// One OS thread per actor
#[derive(Default)]
pub struct ThreadRunner {
    round: Option<RoundThreads>,
    rounds: u32,
}

impl ThreadRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.round.is_some()
    }
}

impl RoundRunner for ThreadRunner {
    fn start_round(&mut self, arena: &Arc<Arena>, restart: Arc<Signal>) {
        self.stop_round();

        let seed = round_seed(arena.settings.seed, self.rounds);
        self.rounds += 1;
        let running = Arc::new(AtomicBool::new(true));
        let (tx, rx) = cursor_queue(arena.settings.queue_capacity);

        let mut handles = Vec::new();
        let sampler = Sampler::new(Arc::clone(arena), tx);
        let (a, r) = (Arc::clone(arena), Arc::clone(&running));
        if let Some(h) = spawn_named("sampler", move || sampler_loop(a, sampler, r)) {
            handles.push(("sampler", h));
        }
        let updater = CursorUpdater::new(Arc::clone(arena), rx);
        let r = Arc::clone(&running);
        if let Some(h) = spawn_named("cursor", move || consumer_loop(updater, r)) {
            handles.push(("cursor", h));
        }
        let director = Director::new(Arc::clone(arena), seed, Arc::clone(&restart));
        let (a, s) = (Arc::clone(arena), Arc::clone(&restart));
        if let Some(h) = spawn_named("director", move || director_loop(a, director, s)) {
            handles.push(("director", h));
        }

        self.round = Some(RoundThreads {
            arena: Arc::clone(arena),
            restart,
            running,
            handles,
        });
    }

    fn stop_round(&mut self) {
        let Some(round) = self.round.take() else {
            return;
        };
        round.restart.raise();
        round.arena.session.force_game_over();
        round.running.store(false, Ordering::Release);
        for (name, handle) in round.handles {
            join_logged(handle, name);
        }
        log::debug!("Round threads joined");
    }

    fn pause(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

impl Drop for ThreadRunner {
    fn drop(&mut self) {
        self.stop_round();
    }
}

impl std::fmt::Debug for ThreadRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadRunner")
            .field("running", &self.is_running())
            .field("rounds", &self.rounds)
            .finish()
    }
}

struct SteppedRound {
    arena: Arc<Arena>,
    restart: Arc<Signal>,
    sampler: Sampler,
    updater: CursorUpdater,
    director: Director,
    actors: Vec<TargetActor>,
}

/// Runs a round's actors in lock-step on the calling thread
#[derive(Default)]
pub struct StepRunner {
    round: Option<SteppedRound>,
    clock: Option<Arc<ManualClock>>,
    rounds: u32,
}

impl StepRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance this clock across pauses instead of ignoring them
    pub fn with_clock(mut self, clock: Arc<ManualClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Targets of the current round that have not terminated
    pub fn actors(&self) -> &[TargetActor] {
        match &self.round {
            Some(round) => &round.actors,
            None => &[],
        }
    }

    /// One scheduling pass: sample, drain the cursor queue, step every
    /// target once, then let the director decide
    pub fn tick(&mut self) -> Option<DirectorStep> {
        let round = self.round.as_mut()?;
        round.sampler.sample();
        while let Pull::Applied(_) = round.updater.try_pull() {}
        round.updater.refresh_hud();

        for actor in &mut round.actors {
            actor.step();
        }
        round
            .actors
            .retain(|a| !matches!(a.state(), TargetState::Terminated(_)));
        Some(round.director.poll(&mut round.actors))
    }
}

impl RoundRunner for StepRunner {
    fn start_round(&mut self, arena: &Arc<Arena>, restart: Arc<Signal>) {
        self.stop_round();
        let seed = round_seed(arena.settings.seed, self.rounds);
        self.rounds += 1;
        let (tx, rx) = cursor_queue(arena.settings.queue_capacity);
        self.round = Some(SteppedRound {
            arena: Arc::clone(arena),
            restart: Arc::clone(&restart),
            sampler: Sampler::new(Arc::clone(arena), tx),
            updater: CursorUpdater::new(Arc::clone(arena), rx),
            director: Director::new(Arc::clone(arena), seed, restart),
            actors: Vec::new(),
        });
    }

    fn stop_round(&mut self) {
        let Some(mut round) = self.round.take() else {
            return;
        };
        round.restart.raise();
        round.arena.session.force_game_over();
        // With life at zero every actor terminates on its next step
        while !round.actors.is_empty() {
            for actor in &mut round.actors {
                actor.step();
            }
            round
                .actors
                .retain(|a| !matches!(a.state(), TargetState::Terminated(_)));
        }
        while !round.director.is_terminated() {
            round.director.poll(&mut round.actors);
        }
    }

    fn pause(&mut self, duration: Duration) {
        if let Some(clock) = &self.clock {
            clock.advance(duration);
        }
        self.tick();
    }
}

impl std::fmt::Debug for StepRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepRunner")
            .field("actors", &self.actors().len())
            .field("rounds", &self.rounds)
            .finish_non_exhaustive()
    }
}
