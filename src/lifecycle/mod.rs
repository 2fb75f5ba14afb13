//! Spawn lifecycle orchestration
//!
//! [`SpawnLifecycleController`] owns the current spawn set and everything
//! derived from it: proximity membership, open capture opportunities, the
//! idle clock and the record of retired spawns. It is a synchronous state
//! machine; every input is a method call that runs to completion and returns
//! the events it produced, so callers serialise inputs simply by holding
//! `&mut` access.
//!
//! # Spawn set states
//!
//! ```text
//! Empty --(anchor + batch)--> Populated --(capture ack)--> spawn Captured
//!                                 |
//!                                 +--(refresh / idle)--> all spawns Expired, new set
//! ```

pub mod ack;
pub mod idle;

pub use ack::{AckMailbox, CaptureAck};
pub use idle::IdleWatch;

use crate::config::GameConfig;
use crate::error::{GameError, Result};
use crate::geo::Coordinate;
use crate::location::PositionSample;
use crate::metrics::SessionMetricsHandle;
use crate::proximity::{ProximityTracker, TransitionEvent};
use crate::source::CreatureDescriptor;
use crate::spawn::{SpawnGenerator, SpawnId, SpawnInstance};
use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// Why the spawn set was replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegenerationReason {
    /// First anchor and creature batch became available
    Initial,
    /// The user asked for new spawns
    Manual,
    /// The user stayed put for the idle duration
    Idle,
}

/// Whether any spawns are currently on the map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnSetState {
    Empty,
    Populated,
}

/// Where a spawn is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnStatus {
    /// On the map and catchable
    Active,
    /// Retired by a confirmed capture
    Captured,
    /// Discarded by a regeneration
    Expired,
}

/// Result of applying a capture acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckDisposition {
    /// The spawn was removed from the map
    Applied,
    /// The spawn had already been retired by an earlier acknowledgement
    Duplicate,
    /// The spawn is not on the map, usually because it was regenerated away
    Stale,
}

/// A prompt letting the user start a capture for one spawn
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureOpportunity {
    pub spawn: SpawnInstance,
    /// Spawn set generation the opportunity belongs to
    pub generation: u64,
    pub opened_at: Instant,
}

/// Output of the controller for the map screen to render
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    SpawnsRegenerated {
        reason: RegenerationReason,
        generation: u64,
        spawns: Vec<SpawnInstance>,
    },
    OpportunityOpened(CaptureOpportunity),
    OpportunityClosed {
        spawn_id: SpawnId,
    },
}

/// Regenerations for which a retired spawn id is still remembered
///
/// Older ids are forgotten; an acknowledgement for one reports `Stale`.
pub const RETIRED_HISTORY_GENERATIONS: u64 = 2;

/// Owns the spawn set and drives it through its lifecycle
#[derive(Debug)]
pub struct SpawnLifecycleController {
    generator: SpawnGenerator,
    tracker: ProximityTracker,
    idle: IdleWatch,
    spawns: Vec<SpawnInstance>,
    creatures: Vec<CreatureDescriptor>,
    has_batch: bool,
    anchor: Option<Coordinate>,
    initial_done: bool,
    generation: u64,
    opportunities: HashMap<SpawnId, CaptureOpportunity>,
    /// Retired spawns with the generation they belonged to
    retired: HashMap<SpawnId, (SpawnStatus, u64)>,
    active_capture: Option<SpawnId>,
    metrics: SessionMetricsHandle,
}

impl SpawnLifecycleController {
    /// Create a controller with an entropy-seeded spawn generator
    pub fn new(config: &GameConfig) -> Self {
        Self::with_generator(config, SpawnGenerator::new(config.spawn_radius_meters))
    }

    /// Create a controller around a specific generator
    pub fn with_generator(config: &GameConfig, generator: SpawnGenerator) -> Self {
        Self {
            generator,
            tracker: ProximityTracker::new(config.capture_radius_meters),
            idle: IdleWatch::new(
                config.settle_threshold_meters,
                config.idle_regeneration_after(),
            ),
            spawns: Vec::new(),
            creatures: Vec::new(),
            has_batch: false,
            anchor: None,
            initial_done: false,
            generation: 0,
            opportunities: HashMap::new(),
            retired: HashMap::new(),
            active_capture: None,
            metrics: SessionMetricsHandle::new(),
        }
    }

    /// Report into a shared metrics handle
    pub fn with_metrics(mut self, metrics: SessionMetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn state(&self) -> SpawnSetState {
        if self.spawns.is_empty() {
            SpawnSetState::Empty
        } else {
            SpawnSetState::Populated
        }
    }

    pub fn spawns(&self) -> &[SpawnInstance] {
        &self.spawns
    }

    pub fn spawn(&self, spawn_id: &SpawnId) -> Option<&SpawnInstance> {
        self.spawns.iter().find(|s| &s.spawn_id == spawn_id)
    }

    pub fn status(&self, spawn_id: &SpawnId) -> Option<SpawnStatus> {
        if self.spawn(spawn_id).is_some() {
            return Some(SpawnStatus::Active);
        }
        self.retired.get(spawn_id).map(|(status, _)| *status)
    }

    pub fn anchor(&self) -> Option<Coordinate> {
        self.anchor
    }

    /// Number of spawn sets generated so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Spawn ids the user is currently inside
    pub fn membership(&self) -> &HashSet<SpawnId> {
        self.tracker.membership()
    }

    pub fn opportunity(&self, spawn_id: &SpawnId) -> Option<&CaptureOpportunity> {
        self.opportunities.get(spawn_id)
    }

    pub fn open_opportunities(&self) -> impl Iterator<Item = &CaptureOpportunity> {
        self.opportunities.values()
    }

    /// Spawn whose capture screen is currently open
    pub fn active_capture(&self) -> Option<SpawnId> {
        self.active_capture
    }

    /// Last creature batch used for generation
    pub fn creatures(&self) -> &[CreatureDescriptor] {
        &self.creatures
    }

    pub fn is_tracking(&self) -> bool {
        self.tracker.is_active()
    }

    pub fn metrics(&self) -> &SessionMetricsHandle {
        &self.metrics
    }

    /// A usable anchor is known; spawns the first set once a batch is also known
    pub fn on_anchor_ready(&mut self, anchor: Coordinate, now: Instant) -> Vec<ControllerEvent> {
        self.anchor = Some(anchor);
        self.idle.observe(anchor, now);
        self.try_initial_spawn(now)
    }

    /// A creature batch arrived; spawns the first set once an anchor is also known
    pub fn on_creatures_ready(
        &mut self,
        creatures: Vec<CreatureDescriptor>,
        now: Instant,
    ) -> Vec<ControllerEvent> {
        self.creatures = creatures;
        self.has_batch = true;
        self.try_initial_spawn(now)
    }

    fn try_initial_spawn(&mut self, now: Instant) -> Vec<ControllerEvent> {
        if self.initial_done || !self.has_batch {
            return Vec::new();
        }
        let Some(anchor) = self.anchor else {
            return Vec::new();
        };

        self.initial_done = true;
        let creatures = std::mem::take(&mut self.creatures);
        vec![self.regenerate(RegenerationReason::Initial, anchor, creatures, now)]
    }

    /// Process one location sample
    ///
    /// Moves the anchor, feeds the idle clock and, unless a capture screen is
    /// open, evaluates proximity and turns transitions into opportunities.
    pub fn on_position(&mut self, sample: PositionSample) -> Vec<ControllerEvent> {
        if !self.tracker.is_active() {
            return Vec::new();
        }

        let PositionSample {
            coordinate,
            timestamp,
        } = sample;

        let mut events = if self.anchor.is_none() {
            self.on_anchor_ready(coordinate, timestamp)
        } else {
            self.anchor = Some(coordinate);
            self.idle.observe(coordinate, timestamp);
            Vec::new()
        };

        if self.active_capture.is_some() {
            return events;
        }

        for transition in self.tracker.evaluate(coordinate, &self.spawns) {
            match transition {
                TransitionEvent::Enter(spawn) => {
                    self.metrics.record_enter();
                    events.push(self.on_enter(spawn, timestamp));
                }
                TransitionEvent::Exit(spawn) => {
                    self.metrics.record_exit();
                    if self.opportunities.remove(&spawn.spawn_id).is_some() {
                        events.push(ControllerEvent::OpportunityClosed {
                            spawn_id: spawn.spawn_id,
                        });
                    }
                }
            }
        }

        events
    }

    /// Open a capture opportunity for a spawn the user just entered
    ///
    /// Re-entering after an exit opens a new one.
    pub fn on_enter(&mut self, spawn: SpawnInstance, now: Instant) -> ControllerEvent {
        log::info!(
            "A wild {} appeared ({})",
            spawn.display_name,
            spawn.spawn_id
        );
        let opportunity = CaptureOpportunity {
            spawn,
            generation: self.generation,
            opened_at: now,
        };
        self.opportunities
            .insert(opportunity.spawn.spawn_id, opportunity.clone());
        self.metrics.record_opportunity();
        ControllerEvent::OpportunityOpened(opportunity)
    }

    /// Dismiss a prompt; the spawn stays catchable
    pub fn decline_opportunity(&mut self, spawn_id: &SpawnId) -> bool {
        self.opportunities.remove(spawn_id).is_some()
    }

    /// Accept an open opportunity and hand the spawn to a capture session
    ///
    /// Proximity evaluation pauses until the capture is confirmed or aborted.
    pub fn begin_capture(&mut self, spawn_id: SpawnId) -> Result<SpawnInstance> {
        if let Some(active) = self.active_capture {
            return Err(GameError::CaptureInProgress(active));
        }
        let spawn = self
            .opportunities
            .get(&spawn_id)
            .map(|o| o.spawn.clone())
            .ok_or(GameError::NoOpportunity(spawn_id))?;

        self.active_capture = Some(spawn_id);
        Ok(spawn)
    }

    /// The capture screen closed without a confirmed capture
    pub fn on_capture_aborted(&mut self, spawn_id: &SpawnId) -> bool {
        if self.active_capture.as_ref() == Some(spawn_id) {
            self.active_capture = None;
            true
        } else {
            false
        }
    }

    /// Retire a captured spawn
    ///
    /// Idempotent: a repeated acknowledgement reports `Duplicate`, and one for
    /// a spawn that is no longer on the map reports `Stale`; neither changes
    /// any state.
    pub fn on_capture_confirmed(&mut self, spawn_id: SpawnId, creature_id: &str) -> AckDisposition {
        if self.active_capture == Some(spawn_id) {
            self.active_capture = None;
        }

        match self.retired.get(&spawn_id).map(|(status, _)| status) {
            Some(SpawnStatus::Captured) => {
                log::debug!("Ignoring repeated capture acknowledgement for {spawn_id}");
                self.metrics.record_duplicate_ack();
                return AckDisposition::Duplicate;
            }
            Some(_) => {
                log::warn!("Capture of {spawn_id} confirmed after its spawn set was replaced");
                self.metrics.record_stale_ack();
                return AckDisposition::Stale;
            }
            None => {}
        }

        let Some(index) = self.spawns.iter().position(|s| s.spawn_id == spawn_id) else {
            log::warn!("Capture acknowledgement for unknown spawn {spawn_id}");
            self.metrics.record_stale_ack();
            return AckDisposition::Stale;
        };

        let spawn = self.spawns.remove(index);
        if spawn.creature_id != creature_id {
            log::warn!(
                "Capture acknowledgement for {spawn_id} names creature {creature_id}, spawn shows {}",
                spawn.creature_id
            );
        }
        self.tracker.forget(&spawn_id);
        self.opportunities.remove(&spawn_id);
        self.retired
            .insert(spawn_id, (SpawnStatus::Captured, self.generation));
        self.metrics.record_capture();
        log::info!("Caught {} ({spawn_id})", spawn.display_name);

        AckDisposition::Applied
    }

    /// Apply an acknowledgement token
    pub fn apply_ack(&mut self, ack: &CaptureAck) -> AckDisposition {
        self.on_capture_confirmed(ack.captured_spawn_id, &ack.captured_creature_id)
    }

    /// Apply every token waiting in `mailbox`
    pub fn drain_mailbox(&mut self, mailbox: &AckMailbox) -> Vec<(CaptureAck, AckDisposition)> {
        mailbox
            .drain()
            .into_iter()
            .map(|ack| {
                let disposition = self.apply_ack(&ack);
                (ack, disposition)
            })
            .collect()
    }

    /// Replace the spawn set around the current anchor on user request
    pub fn on_refresh_requested(
        &mut self,
        creatures: Vec<CreatureDescriptor>,
        now: Instant,
    ) -> Result<ControllerEvent> {
        let anchor = self.anchor.ok_or(GameError::NoAnchor)?;
        self.initial_done = true;
        self.has_batch = true;
        Ok(self.regenerate(RegenerationReason::Manual, anchor, creatures, now))
    }

    /// The user has been stationary long enough for an automatic respawn
    pub fn idle_due(&self, now: Instant) -> bool {
        self.initial_done
            && self.anchor.is_some()
            && self.tracker.is_active()
            && self.idle.is_due(now)
    }

    /// Replace the spawn set because the user went idle
    ///
    /// Returns `None` when no anchor is known.
    pub fn on_idle_timeout(
        &mut self,
        creatures: Vec<CreatureDescriptor>,
        now: Instant,
    ) -> Option<ControllerEvent> {
        let anchor = self.anchor?;
        Some(self.regenerate(RegenerationReason::Idle, anchor, creatures, now))
    }

    /// Periodic idle check reusing the last creature batch
    pub fn on_idle_tick(&mut self, now: Instant) -> Option<ControllerEvent> {
        if !self.idle_due(now) {
            return None;
        }
        let creatures = self.creatures.clone();
        self.on_idle_timeout(creatures, now)
    }

    /// Stop tracking: clear membership and prompts, ignore further samples
    pub fn shutdown(&mut self) {
        self.tracker.shutdown();
        self.opportunities.clear();
        self.active_capture = None;
        self.idle.clear();
        log::debug!("Spawn tracking stopped at generation {}", self.generation);
    }

    /// Resume tracking after [`shutdown`](Self::shutdown)
    pub fn resume(&mut self) {
        self.tracker.resume();
    }

    // The whole replacement happens under one `&mut self`, so no caller can
    // observe the new spawns with the old membership or prompts.
    fn regenerate(
        &mut self,
        reason: RegenerationReason,
        anchor: Coordinate,
        creatures: Vec<CreatureDescriptor>,
        now: Instant,
    ) -> ControllerEvent {
        let fresh = self.generator.generate(anchor, &creatures);
        let previous = std::mem::replace(&mut self.spawns, fresh);
        for old in previous {
            self.retired
                .insert(old.spawn_id, (SpawnStatus::Expired, self.generation));
        }

        let discarded = self.opportunities.len();
        self.tracker.reset();
        self.opportunities.clear();
        self.creatures = creatures;
        self.generation += 1;
        let current = self.generation;
        self.retired
            .retain(|_, (_, generation)| current - *generation <= RETIRED_HISTORY_GENERATIONS);
        self.idle.reset(anchor, now);
        self.metrics.record_regeneration(reason, self.spawns.len());

        log::info!(
            "Spawned {} creatures around {anchor} ({reason:?}, generation {}, {discarded} open prompts discarded)",
            self.spawns.len(),
            self.generation
        );
        if let Some(active) = self.active_capture {
            log::warn!("Spawn set replaced while capture of {active} is open");
        }

        ControllerEvent::SpawnsRegenerated {
            reason,
            generation: self.generation,
            spawns: self.spawns.clone(),
        }
    }
}
