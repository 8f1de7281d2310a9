// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

//! Live tracking engine.
//!
//! A session follows one route. While it is polling, three periodic tasks
//! run on the Tokio runtime:
//!
//! - the fetch cycle (default 30 s) queries the provider and publishes a new
//!   flight list, falling back to synthesized traffic;
//! - the audio cue (default 2 s) while sound is enabled;
//! - flight cycling (default 5 s) while more than one flight is listed.
//!
//! All engine state sits behind one `std::sync::Mutex` that is never held
//! across an `.await`. Every task carries the session generation it was
//! spawned for and re-checks it under that lock before touching state, so
//! nothing from a torn-down session is ever published.
//!
//! Subscribers are called after the state lock is released, under a
//! separate delivery lock. Session changes take the delivery lock first, so
//! once `stop` returns no callback for the old session is still running.

pub mod capabilities;
pub mod provider;
pub mod scheduler;
pub mod snapshot;

pub use capabilities::{AudioCue, Clock, SilentCue, SystemClock};
pub use provider::{FlightStateProvider, OfflineProvider, OpenSkyClient, ProviderError, StateVector};
pub use snapshot::{FeedState, FlightStatus, LiveFlightSnapshot, SnapshotUpdate};

use crate::airports::{Airport, AirportDirectory};
use crate::geo::BoundingBox;
use crate::route::{parse_route_text, RouteCodes, RouteError, RoutePlanner};
use rand::rngs::StdRng;
use rand::SeedableRng;
use scheduler::SessionTimers;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};

#[derive(Debug, Clone, PartialEq)]
pub struct TrackingConfig {
    pub poll_interval: Duration,
    pub audio_interval: Duration,
    pub cycle_interval: Duration,
    /// Degrees added around the departure/arrival box for provider queries.
    pub bbox_margin_deg: f64,
    pub max_live_flights: usize,
    pub synthesized_flights: usize,
    /// Progress range (percent) for synthesized flights.
    pub synthetic_progress: Range<f64>,
    /// Fixed seed for reproducible synthesized traffic.
    pub rng_seed: Option<u64>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            audio_interval: Duration::from_secs(2),
            cycle_interval: Duration::from_secs(5),
            bbox_margin_deg: 2.0,
            max_live_flights: 6,
            synthesized_flights: 3,
            synthetic_progress: 10.0..80.0,
            rng_seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingSession {
    pub route: RouteCodes,
    pub active: bool,
    pub sound_enabled: bool,
    pub current_flight_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackingState {
    Idle,
    Polling,
}

#[derive(Error, Debug)]
pub enum TrackingError {
    #[error("The tracking engine must be built inside a Tokio runtime")]
    NoRuntime,
    #[error("Invalid tracking configuration: {0}")]
    InvalidConfig(String),
}

impl TrackingConfig {
    /// Rejects settings the timers cannot run with.
    pub fn validate(&self) -> Result<(), TrackingError> {
        for (name, period) in [
            ("poll_interval", self.poll_interval),
            ("audio_interval", self.audio_interval),
            ("cycle_interval", self.cycle_interval),
        ] {
            if period.is_zero() {
                return Err(TrackingError::InvalidConfig(format!("{} must be non-zero", name)));
            }
        }
        Ok(())
    }
}

type Subscriber = Arc<dyn Fn(&SnapshotUpdate) + Send + Sync>;

thread_local! {
    /// Set while this thread is inside a subscriber callback.
    static DELIVERING: Cell<bool> = const { Cell::new(false) };
}

struct DeliveryScope;

impl DeliveryScope {
    fn enter() -> Self {
        DELIVERING.with(|d| d.set(true));
        DeliveryScope
    }
}

impl Drop for DeliveryScope {
    fn drop(&mut self) {
        DELIVERING.with(|d| d.set(false));
    }
}

struct EngineState {
    session: Option<TrackingSession>,
    /// Bumped on every teardown. Tasks from older generations exit.
    generation: u64,
    timers: SessionTimers,
    flights: Vec<LiveFlightSnapshot>,
    feed: Option<FeedState>,
    last_published: u64,
    sound_enabled: bool,
    subscribers: Vec<Subscriber>,
}

impl EngineState {
    fn is_polling(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.active)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation && self.is_polling()
    }
}

struct EngineInner<P> {
    provider: P,
    directory: Arc<AirportDirectory>,
    config: TrackingConfig,
    clock: Arc<dyn Clock>,
    audio: Arc<dyn AudioCue>,
    rng: Mutex<StdRng>,
    sequence: AtomicU64,
    /// Held while subscribers run. Always taken before `state`.
    delivery: Mutex<()>,
    state: Mutex<EngineState>,
    runtime: Handle,
}

pub struct EngineBuilder<P> {
    provider: P,
    directory: Option<Arc<AirportDirectory>>,
    config: TrackingConfig,
    clock: Arc<dyn Clock>,
    audio: Arc<dyn AudioCue>,
    runtime: Option<Handle>,
}

impl<P: FlightStateProvider + 'static> EngineBuilder<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            directory: None,
            config: TrackingConfig::default(),
            clock: Arc::new(SystemClock),
            audio: Arc::new(SilentCue),
            runtime: None,
        }
    }

    pub fn directory(mut self, directory: Arc<AirportDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn config(mut self, config: TrackingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn audio(mut self, audio: Arc<dyn AudioCue>) -> Self {
        self.audio = audio;
        self
    }

    /// Runtime that owns the timer tasks. Defaults to the current one.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> Result<TrackingEngine<P>, TrackingError> {
        self.config.validate()?;
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| TrackingError::NoRuntime)?,
        };
        let rng = match self.config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let directory = self
            .directory
            .unwrap_or_else(|| Arc::new(AirportDirectory::builtin().clone()));

        Ok(TrackingEngine {
            inner: Arc::new(EngineInner {
                provider: self.provider,
                directory,
                config: self.config,
                clock: self.clock,
                audio: self.audio,
                rng: Mutex::new(rng),
                sequence: AtomicU64::new(0),
                delivery: Mutex::new(()),
                state: Mutex::new(EngineState {
                    session: None,
                    generation: 0,
                    timers: SessionTimers::default(),
                    flights: Vec::new(),
                    feed: None,
                    last_published: 0,
                    sound_enabled: false,
                    subscribers: Vec::new(),
                }),
                runtime,
            }),
        })
    }
}

/// Handle to the engine. Clones share one engine; dropping the last clone
/// cancels every timer.
pub struct TrackingEngine<P> {
    inner: Arc<EngineInner<P>>,
}

impl<P> Clone for TrackingEngine<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: FlightStateProvider + 'static> TrackingEngine<P> {
    pub fn builder(provider: P) -> EngineBuilder<P> {
        EngineBuilder::new(provider)
    }

    /// Starts polling `route`. A no-op when already polling the same route;
    /// a different route replaces the running session.
    pub fn start(&self, route: RouteCodes) {
        let _delivery = self.inner.lock_delivery();
        let mut state = self.inner.lock_state();
        self.inner.start_locked(&mut state, route);
    }

    /// Cancels every timer. The session keeps its route but goes inactive.
    pub fn stop(&self) {
        let _delivery = self.inner.lock_delivery();
        let mut state = self.inner.lock_state();
        if !state.is_polling() {
            return;
        }
        self.inner.teardown(&mut state);
        if let Some(session) = state.session.as_mut() {
            session.active = false;
            log::info!("Stopped tracking {}", session.route);
        }
    }

    pub fn set_sound_enabled(&self, enabled: bool) {
        let _delivery = self.inner.lock_delivery();
        let mut state = self.inner.lock_state();
        state.sound_enabled = enabled;
        if let Some(session) = state.session.as_mut() {
            session.sound_enabled = enabled;
        }
        if !state.is_polling() {
            return;
        }
        if enabled && !state.timers.has_audio() {
            let generation = state.generation;
            self.inner.spawn_audio(&mut state, generation);
        } else if !enabled {
            state.timers.cancel_audio();
        }
    }

    /// Applies a free-text route such as `"KJFK-KORD-KLAX"`.
    ///
    /// Text with fewer than two codes stops tracking and clears the session.
    /// Otherwise the codes are validated against the directory; a polling
    /// session switches to them even when validation fails, so the invalid
    /// route shows up as [`FeedState::InvalidRoute`].
    pub fn set_manual_route(&self, text: &str) -> Result<RouteCodes, RouteError> {
        let _delivery = self.inner.lock_delivery();
        let mut state = self.inner.lock_state();
        let Some(codes) = parse_route_text(text) else {
            if state.session.is_some() {
                self.inner.teardown(&mut state);
                state.session = None;
                log::info!("Manual route cleared");
            }
            return Err(RouteError::InsufficientAirports);
        };

        let validation = RoutePlanner::new(&self.inner.directory).plan(&codes);
        if let Err(e) = &validation {
            log::warn!("Manual route {} is invalid: {}", codes, e);
        }
        if state.is_polling() {
            self.inner.start_locked(&mut state, codes.clone());
        }
        validation.map(|_| codes)
    }

    /// Registers a callback for every published tick.
    ///
    /// Callbacks run on a runtime worker without the state lock held, so
    /// they may query or control the engine. They should return quickly.
    pub fn on_snapshot_update<F>(&self, callback: F)
    where
        F: Fn(&SnapshotUpdate) + Send + Sync + 'static,
    {
        self.inner.lock_state().subscribers.push(Arc::new(callback));
    }

    /// The flight currently highlighted by cycling.
    pub fn current_flight(&self) -> Option<LiveFlightSnapshot> {
        let state = self.inner.lock_state();
        let index = state.session.as_ref()?.current_flight_index;
        state.flights.get(index).cloned()
    }

    pub fn flights(&self) -> Vec<LiveFlightSnapshot> {
        self.inner.lock_state().flights.clone()
    }

    pub fn feed(&self) -> Option<FeedState> {
        self.inner.lock_state().feed
    }

    pub fn state(&self) -> TrackingState {
        if self.inner.lock_state().is_polling() {
            TrackingState::Polling
        } else {
            TrackingState::Idle
        }
    }

    pub fn session(&self) -> Option<TrackingSession> {
        self.inner.lock_state().session.clone()
    }

    /// Number of periodic tasks the session currently owns.
    pub fn active_timer_count(&self) -> usize {
        self.inner.lock_state().timers.active_count()
    }
}

impl<P: FlightStateProvider + 'static> EngineInner<P> {
    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// `None` when called from inside a callback, which already holds it.
    fn lock_delivery(&self) -> Option<MutexGuard<'_, ()>> {
        if DELIVERING.with(Cell::get) {
            return None;
        }
        Some(self.delivery.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock_state().is_current(generation)
    }

    /// Cancels all timers and forgets the current flight list.
    fn teardown(&self, state: &mut EngineState) {
        state.generation += 1;
        state.timers.cancel_all();
        state.flights.clear();
        state.feed = None;
        if let Some(session) = state.session.as_mut() {
            session.current_flight_index = 0;
        }
    }

    fn start_locked(self: &Arc<Self>, state: &mut EngineState, route: RouteCodes) {
        let route = route.normalized();
        if let Some(session) = &state.session {
            if session.active && session.route == route {
                log::debug!("Already tracking {}", route);
                return;
            }
        }

        self.teardown(state);
        log::info!("Tracking {}", route);
        state.session = Some(TrackingSession {
            route,
            active: true,
            sound_enabled: state.sound_enabled,
            current_flight_index: 0,
        });

        let generation = state.generation;
        let poll = self.runtime.spawn(poll_loop(Arc::downgrade(self), generation));
        state.timers.set_poll(poll.abort_handle());
        if state.sound_enabled {
            self.spawn_audio(state, generation);
        }
    }

    fn spawn_audio(self: &Arc<Self>, state: &mut EngineState, generation: u64) {
        let task = self
            .runtime
            .spawn(audio_loop(Arc::downgrade(self), generation, self.config.audio_interval));
        state.timers.set_audio(task.abort_handle());
    }

    fn spawn_cycle(self: &Arc<Self>, state: &mut EngineState, generation: u64) {
        let task = self
            .runtime
            .spawn(cycle_loop(Arc::downgrade(self), generation, self.config.cycle_interval));
        state.timers.set_cycle(task.abort_handle());
    }

    fn session_route(&self, generation: u64) -> Option<RouteCodes> {
        let state = self.lock_state();
        if !state.is_current(generation) {
            return None;
        }
        state.session.as_ref().map(|s| s.route.clone())
    }

    fn endpoints(&self, route: &RouteCodes) -> Option<(Airport, Airport)> {
        let departure = self.directory.lookup(&route.departure)?.clone();
        let arrival = self.directory.lookup(&route.arrival)?.clone();
        Some((departure, arrival))
    }

    fn synthesize(&self, departure: &Airport, arrival: &Airport) -> Vec<LiveFlightSnapshot> {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        snapshot::synthesize(
            &mut *rng,
            departure,
            arrival,
            self.config.synthesized_flights,
            &self.config.synthetic_progress,
            self.clock.now(),
        )
    }

    /// Replaces the flight list if the tick still belongs to the running
    /// session and is newer than anything already published.
    fn publish(
        self: &Arc<Self>,
        generation: u64,
        sequence: u64,
        route: RouteCodes,
        feed: FeedState,
        flights: Vec<LiveFlightSnapshot>,
    ) {
        let _delivery = self.lock_delivery();
        let mut state = self.lock_state();
        if !state.is_current(generation) {
            log::debug!("Dropping tick #{} from a cancelled session", sequence);
            return;
        }
        if sequence <= state.last_published {
            log::debug!(
                "Dropping stale tick #{} (already at #{})",
                sequence,
                state.last_published
            );
            return;
        }

        state.last_published = sequence;
        let previous_len = state.flights.len();
        state.flights = flights;
        state.feed = Some(feed);

        let len = state.flights.len();
        if len != previous_len {
            if let Some(session) = state.session.as_mut() {
                session.current_flight_index = 0;
            }
            if len > 1 {
                self.spawn_cycle(&mut state, generation);
            } else {
                state.timers.cancel_cycle();
            }
        }

        log::debug!("Tick #{}: {} flights ({:?})", sequence, len, feed);
        let update = SnapshotUpdate {
            sequence,
            route,
            feed,
            flights: state.flights.clone(),
        };
        let subscribers = state.subscribers.clone();
        drop(state);

        let _scope = DeliveryScope::enter();
        for subscriber in &subscribers {
            subscriber(&update);
        }
    }

    fn advance_flight(&self, generation: u64) -> bool {
        let mut state = self.lock_state();
        if !state.is_current(generation) {
            return false;
        }
        let len = state.flights.len();
        if let Some(session) = state.session.as_mut() {
            if len > 1 {
                session.current_flight_index = (session.current_flight_index + 1) % len;
            } else {
                session.current_flight_index = 0;
            }
        }
        true
    }

    fn play_cue(&self, generation: u64) -> bool {
        let state = self.lock_state();
        if !state.is_current(generation) || !state.sound_enabled {
            return false;
        }
        self.audio.play();
        true
    }
}

/// One fetch-and-publish cycle.
async fn run_cycle<P: FlightStateProvider + 'static>(inner: Arc<EngineInner<P>>, generation: u64) {
    let sequence = inner.sequence.fetch_add(1, Ordering::SeqCst) + 1;
    let Some(route) = inner.session_route(generation) else {
        return;
    };

    let Some((departure, arrival)) = inner.endpoints(&route) else {
        log::warn!("Route {} does not resolve; publishing an empty list", route);
        inner.publish(generation, sequence, route, FeedState::InvalidRoute, Vec::new());
        return;
    };

    let fetched = match BoundingBox::around(&[departure.coordinate(), arrival.coordinate()]) {
        Some(bbox) => {
            inner
                .provider
                .fetch_states(bbox.expand(inner.config.bbox_margin_deg))
                .await
        }
        None => Ok(Vec::new()),
    };

    let now = inner.clock.now();
    let live: Vec<LiveFlightSnapshot> = match fetched {
        Ok(states) => states
            .iter()
            .filter_map(|sv| LiveFlightSnapshot::from_state_vector(sv, &departure, &arrival, now))
            .take(inner.config.max_live_flights)
            .collect(),
        Err(e) => {
            log::warn!("Flight-state provider failed for {}: {}", route, e);
            Vec::new()
        }
    };

    if live.is_empty() {
        let flights = inner.synthesize(&departure, &arrival);
        log::info!("Synthesized {} flights for {}", flights.len(), route);
        inner.publish(generation, sequence, route, FeedState::Synthesized, flights);
    } else {
        inner.publish(generation, sequence, route, FeedState::Live, live);
    }
}

/// Fires immediately, then every poll interval. Each cycle runs as its own
/// task so a slow provider never delays the next tick.
async fn poll_loop<P: FlightStateProvider + 'static>(engine: Weak<EngineInner<P>>, generation: u64) {
    let period = match engine.upgrade() {
        Some(inner) => inner.config.poll_interval,
        None => return,
    };
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut cycles = JoinSet::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(inner) = engine.upgrade() else { break };
                if !inner.is_current(generation) {
                    break;
                }
                cycles.spawn(run_cycle(inner, generation));
            }
            Some(result) = cycles.join_next(), if !cycles.is_empty() => {
                if let Err(e) = result {
                    if e.is_panic() {
                        log::error!("Tracking cycle panicked: {}", e);
                    }
                }
            }
        }
    }
}

async fn cycle_loop<P: FlightStateProvider + 'static>(
    engine: Weak<EngineInner<P>>,
    generation: u64,
    period: Duration,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    loop {
        ticker.tick().await;
        let Some(inner) = engine.upgrade() else { break };
        if !inner.advance_flight(generation) {
            break;
        }
    }
}

async fn audio_loop<P: FlightStateProvider + 'static>(
    engine: Weak<EngineInner<P>>,
    generation: u64,
    period: Duration,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    loop {
        ticker.tick().await;
        let Some(inner) = engine.upgrade() else { break };
        if !inner.play_cue(generation) {
            break;
        }
    }
}
