//! Map session driver
//!
//! A [`MapSession`] owns one [`SpawnLifecycleController`] inside a single
//! background task. Commands from the UI, location updates and the idle
//! timer all funnel into one `select!` loop, and each input is processed to
//! completion before the next is taken, so proximity evaluation and
//! regeneration never interleave.
//!
//! # Example
//!
//! ```no_run
//! use spawnfence::session::{MapSession, MapSessionDeps};
//! use spawnfence::{GameConfig, TokioSpawner};
//! # async fn run(deps: MapSessionDeps) -> spawnfence::Result<()> {
//! let mut session = MapSession::launch(&TokioSpawner::new(), GameConfig::default(), deps)?;
//! while let Some(notice) = session.next_notice().await {
//!     println!("{notice:?}");
//! }
//! # Ok(())
//! # }
//! ```

use crate::config::GameConfig;
use crate::error::{GameError, Result};
use crate::geo::Coordinate;
use crate::lifecycle::{AckDisposition, AckMailbox, CaptureAck, ControllerEvent, SpawnLifecycleController};
use crate::location::{
    AnchorResolution, AnchorResolver, LocationCache, LocationError, LocationProvider,
    LocationSubscription, PositionSample,
};
use crate::metrics::SessionMetricsHandle;
use crate::runtime::TaskSpawner;
use crate::source::{CachedCreatureSource, CreatureDescriptor, CreatureSource};
use crate::spawn::{SpawnGenerator, SpawnId, SpawnInstance};
use futures::StreamExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;

const COMMAND_QUEUE_DEPTH: usize = 32;

/// Requests from the UI to the session loop
#[derive(Debug)]
pub enum MapCommand {
    Refresh,
    BeginCapture {
        spawn_id: SpawnId,
        reply: oneshot::Sender<Result<SpawnInstance>>,
    },
    DeclineOpportunity(SpawnId),
    CaptureAcknowledged {
        ack: CaptureAck,
        reply: oneshot::Sender<AckDisposition>,
    },
    CaptureAborted(SpawnId),
    Snapshot(oneshot::Sender<MapSnapshot>),
    Shutdown(oneshot::Sender<()>),
}

/// Something the map screen should show
#[derive(Debug, Clone, PartialEq)]
pub enum MapNotice {
    Controller(ControllerEvent),
    SpawnCaptured {
        spawn_id: SpawnId,
        creature_id: String,
    },
    /// Location access was refused; nothing will spawn
    PermissionRequired,
    /// Location services are off; offer to open settings
    LocationServicesDisabled,
    /// No position could be determined yet
    NoAnchor,
    LocationFailed(LocationError),
    RefreshRejected(String),
}

/// Point-in-time view of the session state
#[derive(Debug, Clone, PartialEq)]
pub struct MapSnapshot {
    pub anchor: Option<Coordinate>,
    pub spawns: Vec<SpawnInstance>,
    pub generation: u64,
    /// Sorted ids of spawns the user is inside
    pub membership: Vec<SpawnId>,
    /// Sorted ids of spawns with an open prompt
    pub open_opportunities: Vec<SpawnId>,
    pub active_capture: Option<SpawnId>,
    pub tracking: bool,
}

/// External collaborators of a map session
#[derive(Clone)]
pub struct MapSessionDeps {
    pub source: Arc<dyn CreatureSource>,
    pub location: Arc<dyn LocationProvider>,
    pub location_cache: Option<Arc<LocationCache>>,
    pub metrics: SessionMetricsHandle,
    /// Fixed seed for spawn placement and batch offsets
    pub seed: Option<u64>,
}

impl MapSessionDeps {
    pub fn new(source: Arc<dyn CreatureSource>, location: Arc<dyn LocationProvider>) -> Self {
        Self {
            source,
            location,
            location_cache: None,
            metrics: SessionMetricsHandle::new(),
            seed: None,
        }
    }

    pub fn with_location_cache(mut self, cache: Arc<LocationCache>) -> Self {
        self.location_cache = Some(cache);
        self
    }

    pub fn with_metrics(mut self, metrics: SessionMetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl std::fmt::Debug for MapSessionDeps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapSessionDeps")
            .field("location_cache", &self.location_cache)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

/// Cloneable sender side of a running map session
#[derive(Debug, Clone)]
pub struct MapSessionHandle {
    commands: mpsc::Sender<MapCommand>,
}

impl MapSessionHandle {
    async fn send(&self, command: MapCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| GameError::SessionClosed)
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> MapCommand) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.send(command(reply)).await?;
        response.await.map_err(|_| GameError::SessionClosed)
    }

    /// Ask for a new spawn set around the current anchor
    pub async fn refresh(&self) -> Result<()> {
        self.send(MapCommand::Refresh).await
    }

    /// Accept the open prompt for `spawn_id`
    pub async fn begin_capture(&self, spawn_id: SpawnId) -> Result<SpawnInstance> {
        self.request(|reply| MapCommand::BeginCapture { spawn_id, reply })
            .await?
    }

    pub async fn decline(&self, spawn_id: SpawnId) -> Result<()> {
        self.send(MapCommand::DeclineOpportunity(spawn_id)).await
    }

    /// Deliver a capture acknowledgement
    pub async fn acknowledge(&self, ack: CaptureAck) -> Result<AckDisposition> {
        self.request(|reply| MapCommand::CaptureAcknowledged { ack, reply })
            .await
    }

    /// Deliver every acknowledgement waiting in `mailbox`
    ///
    /// A token the session could not receive is put back in the mailbox.
    pub async fn apply_mailbox(&self, mailbox: &AckMailbox) -> Result<Vec<AckDisposition>> {
        let mut dispositions = Vec::new();
        while let Some(ack) = mailbox.take() {
            match self.acknowledge(ack.clone()).await {
                Ok(disposition) => dispositions.push(disposition),
                Err(e) => {
                    mailbox.requeue(ack);
                    return Err(e);
                }
            }
        }
        Ok(dispositions)
    }

    pub async fn abort_capture(&self, spawn_id: SpawnId) -> Result<()> {
        self.send(MapCommand::CaptureAborted(spawn_id)).await
    }

    pub async fn snapshot(&self) -> Result<MapSnapshot> {
        self.request(MapCommand::Snapshot).await
    }

    /// Stop the session and wait until the location subscription is gone
    pub async fn shutdown(&self) -> Result<()> {
        self.request(MapCommand::Shutdown).await
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

/// A running map session: its handle plus the notice stream
#[derive(Debug)]
pub struct MapSession {
    handle: MapSessionHandle,
    notices: mpsc::UnboundedReceiver<MapNotice>,
}

impl MapSession {
    /// Validate `config` and start the session loop on `spawner`
    pub fn launch<S: TaskSpawner>(
        spawner: &S,
        config: GameConfig,
        deps: MapSessionDeps,
    ) -> Result<Self> {
        config.validate()?;

        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();

        let session_loop = SessionLoop::new(config, deps, command_rx, notice_tx);
        spawner.spawn("map-session", session_loop.run());
        log::debug!("Map session launched on {}", spawner.runtime_name());

        Ok(Self {
            handle: MapSessionHandle {
                commands: command_tx,
            },
            notices: notice_rx,
        })
    }

    pub fn handle(&self) -> MapSessionHandle {
        self.handle.clone()
    }

    /// Next notice, or `None` once the session has stopped
    pub async fn next_notice(&mut self) -> Option<MapNotice> {
        self.notices.recv().await
    }

    /// Notices already queued, without waiting
    pub fn drain_notices(&mut self) -> Vec<MapNotice> {
        let mut drained = Vec::new();
        while let Ok(notice) = self.notices.try_recv() {
            drained.push(notice);
        }
        drained
    }

    pub fn into_parts(self) -> (MapSessionHandle, mpsc::UnboundedReceiver<MapNotice>) {
        (self.handle, self.notices)
    }
}

// Tokio's clock, so paused test time drives idle detection.
fn clock_now() -> Instant {
    tokio::time::Instant::now().into_std()
}

async fn next_update(
    subscription: &mut Option<LocationSubscription>,
) -> Option<std::result::Result<PositionSample, LocationError>> {
    match subscription {
        Some(sub) => sub.updates.next().await,
        None => futures::future::pending().await,
    }
}

struct SessionLoop {
    config: GameConfig,
    controller: SpawnLifecycleController,
    source: CachedCreatureSource<Arc<dyn CreatureSource>>,
    location: Arc<dyn LocationProvider>,
    cache: Arc<LocationCache>,
    rng: StdRng,
    commands: mpsc::Receiver<MapCommand>,
    notices: mpsc::UnboundedSender<MapNotice>,
    subscription: Option<LocationSubscription>,
}

impl SessionLoop {
    fn new(
        config: GameConfig,
        deps: MapSessionDeps,
        commands: mpsc::Receiver<MapCommand>,
        notices: mpsc::UnboundedSender<MapNotice>,
    ) -> Self {
        let (generator, rng) = match deps.seed {
            Some(seed) => (
                SpawnGenerator::with_seed(config.spawn_radius_meters, seed),
                StdRng::seed_from_u64(seed.wrapping_add(1)),
            ),
            None => (
                SpawnGenerator::new(config.spawn_radius_meters),
                StdRng::from_entropy(),
            ),
        };
        let source = CachedCreatureSource::from_config(deps.source, &config, deps.metrics.clone());
        let controller =
            SpawnLifecycleController::with_generator(&config, generator).with_metrics(deps.metrics);
        let cache = deps
            .location_cache
            .unwrap_or_else(|| Arc::new(LocationCache::new(config.location_cache_ttl())));

        Self {
            config,
            controller,
            source,
            location: deps.location,
            cache,
            rng,
            commands,
            notices,
            subscription: None,
        }
    }

    async fn run(mut self) {
        self.start().await;

        let period = self.config.idle_check_interval();
        let mut idle_check = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        idle_check.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // Positions already delivered are evaluated before any command
            // that arrived alongside them.
            tokio::select! {
                biased;

                update = next_update(&mut self.subscription) => self.handle_update(update),
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        self.stop();
                        break;
                    };
                    if self.handle_command(command).await.is_break() {
                        break;
                    }
                }
                _ = idle_check.tick() => self.handle_idle_check().await,
            }
        }
    }

    async fn start(&mut self) {
        let resolver = AnchorResolver::new(
            self.location.clone(),
            self.config.location,
            self.cache.clone(),
        );
        let resolution = resolver.resolve(clock_now()).await;

        match &resolution {
            AnchorResolution::PermissionRequired => {
                self.notify(MapNotice::PermissionRequired);
                return;
            }
            AnchorResolution::ServicesDisabled { .. } => {
                self.notify(MapNotice::LocationServicesDisabled)
            }
            AnchorResolution::Unavailable(_) => self.notify(MapNotice::NoAnchor),
            AnchorResolution::Fresh(_) | AnchorResolution::Cached(_) => {}
        }

        if let Some(anchor) = resolution.anchor() {
            let events = self.controller.on_anchor_ready(anchor.coordinate, clock_now());
            self.emit(events);
        }

        let batch = self.fetch_wave().await;
        let events = self.controller.on_creatures_ready(batch, clock_now());
        self.emit(events);

        match self.location.subscribe(&self.config.location) {
            Ok(subscription) => self.subscription = Some(subscription),
            Err(e) => {
                log::warn!("Could not subscribe to location updates: {e}");
                self.notify(MapNotice::LocationFailed(e));
            }
        }
    }

    fn stop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            self.location.unsubscribe(subscription.handle);
        }
        self.controller.shutdown();
        log::info!("Map session stopped");
    }

    async fn fetch_wave(&mut self) -> Vec<CreatureDescriptor> {
        let offset = if self.config.max_batch_offset == 0 {
            0
        } else {
            self.rng.gen_range(0..self.config.max_batch_offset)
        };

        match self.source.fetch_batch(self.config.batch_size, offset).await {
            Ok(batch) => batch,
            Err(e) => {
                log::warn!("Creature batch fetch failed, spawning nothing: {e}");
                Vec::new()
            }
        }
    }

    async fn handle_command(&mut self, command: MapCommand) -> ControlFlow<()> {
        match command {
            MapCommand::Refresh => {
                if self.controller.anchor().is_none() {
                    self.notify(MapNotice::RefreshRejected(GameError::NoAnchor.to_string()));
                    return ControlFlow::Continue(());
                }
                let batch = self.fetch_wave().await;
                match self.controller.on_refresh_requested(batch, clock_now()) {
                    Ok(event) => self.emit(vec![event]),
                    Err(e) => self.notify(MapNotice::RefreshRejected(e.to_string())),
                }
            }
            MapCommand::BeginCapture { spawn_id, reply } => {
                let _ = reply.send(self.controller.begin_capture(spawn_id));
            }
            MapCommand::DeclineOpportunity(spawn_id) => {
                if self.controller.decline_opportunity(&spawn_id) {
                    self.notify(MapNotice::Controller(ControllerEvent::OpportunityClosed {
                        spawn_id,
                    }));
                }
            }
            MapCommand::CaptureAcknowledged { ack, reply } => {
                let disposition = self.controller.apply_ack(&ack);
                if disposition == AckDisposition::Applied {
                    self.notify(MapNotice::SpawnCaptured {
                        spawn_id: ack.captured_spawn_id,
                        creature_id: ack.captured_creature_id,
                    });
                }
                let _ = reply.send(disposition);
            }
            MapCommand::CaptureAborted(spawn_id) => {
                self.controller.on_capture_aborted(&spawn_id);
            }
            MapCommand::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            MapCommand::Shutdown(reply) => {
                self.stop();
                let _ = reply.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn handle_update(&mut self, update: Option<std::result::Result<PositionSample, LocationError>>) {
        match update {
            Some(Ok(sample)) => {
                self.cache.record(sample);
                let events = self.controller.on_position(sample);
                self.emit(events);
            }
            Some(Err(e)) => {
                log::warn!("Location update failed: {e}");
                self.notify(MapNotice::LocationFailed(e));
            }
            None => {
                log::warn!("Location update stream ended");
                self.subscription = None;
            }
        }
    }

    async fn handle_idle_check(&mut self) {
        let now = clock_now();
        if !self.controller.idle_due(now) {
            return;
        }
        let batch = self.fetch_wave().await;
        if let Some(event) = self.controller.on_idle_timeout(batch, now) {
            self.emit(vec![event]);
        }
    }

    fn snapshot(&self) -> MapSnapshot {
        let mut membership: Vec<_> = self.controller.membership().iter().copied().collect();
        membership.sort();
        let mut open_opportunities: Vec<_> = self
            .controller
            .open_opportunities()
            .map(|o| o.spawn.spawn_id)
            .collect();
        open_opportunities.sort();

        MapSnapshot {
            anchor: self.controller.anchor(),
            spawns: self.controller.spawns().to_vec(),
            generation: self.controller.generation(),
            membership,
            open_opportunities,
            active_capture: self.controller.active_capture(),
            tracking: self.controller.is_tracking(),
        }
    }

    fn emit(&self, events: Vec<ControllerEvent>) {
        for event in events {
            self.notify(MapNotice::Controller(event));
        }
    }

    fn notify(&self, notice: MapNotice) {
        // The UI may have stopped listening; the session keeps running.
        let _ = self.notices.send(notice);
    }
}
