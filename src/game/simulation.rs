//! Authoritative simulation loop

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::config::SimulationConfig;
use crate::util::time::Timer;
use crate::ws::connection::ConnectionHandle;

use super::snapshot::{SnapshotBuilder, SnapshotStats};
use super::vector::Vector;
use super::world::World;
use super::{GameError, KeyboardState};

/// Commands queued before the loop stops accepting them
const COMMAND_CAPACITY: usize = 1024;

/// Lifecycle of the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Stopped,
    Running,
}

/// Inbound events from the transport layer
#[derive(Debug)]
enum Command {
    Join {
        connection_id: String,
        connection: ConnectionHandle,
        reply: oneshot::Sender<Result<(), GameError>>,
    },
    Input {
        connection_id: String,
        keyboard_state: KeyboardState,
    },
    Force {
        connection_id: String,
        force: Vector,
    },
    Leave {
        connection_id: String,
    },
    Shutdown,
}

/// Handle to a running simulation
#[derive(Clone)]
pub struct SimulationHandle {
    command_tx: mpsc::Sender<Command>,
    player_count: Arc<AtomicUsize>,
    state_rx: watch::Receiver<LoopState>,
}

impl SimulationHandle {
    /// Register a connection. Resolves once the loop has added the player.
    pub async fn join(
        &self,
        connection_id: impl Into<String>,
        connection: ConnectionHandle,
    ) -> Result<(), GameError> {
        let (reply, reply_rx) = oneshot::channel();
        self.send(Command::Join {
            connection_id: connection_id.into(),
            connection,
            reply,
        })
        .await?;
        reply_rx.await.map_err(|_| GameError::SimulationStopped)?
    }

    pub async fn input(
        &self,
        connection_id: impl Into<String>,
        keyboard_state: KeyboardState,
    ) -> Result<(), GameError> {
        self.send(Command::Input {
            connection_id: connection_id.into(),
            keyboard_state,
        })
        .await
    }

    /// Queue a force applied at the start of the player's next tick
    pub async fn apply_force(
        &self,
        connection_id: impl Into<String>,
        force: Vector,
    ) -> Result<(), GameError> {
        self.send(Command::Force {
            connection_id: connection_id.into(),
            force,
        })
        .await
    }

    pub async fn leave(&self, connection_id: impl Into<String>) {
        let connection_id = connection_id.into();
        if self
            .send(Command::Leave {
                connection_id: connection_id.clone(),
            })
            .await
            .is_err()
        {
            debug!(connection_id = %connection_id, "Leave after simulation stopped");
        }
    }

    /// Ask the loop to stop. Does not wait for it to finish.
    pub async fn shutdown(&self) {
        let _ = self.command_tx.send(Command::Shutdown).await;
    }

    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> LoopState {
        *self.state_rx.borrow()
    }

    async fn send(&self, command: Command) -> Result<(), GameError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| GameError::SimulationStopped)
    }
}

/// The authoritative simulation. Owns the world; everything else talks to
/// it through a `SimulationHandle`.
pub struct Simulation {
    world: World,
    command_rx: mpsc::Receiver<Command>,
    snapshot_builder: SnapshotBuilder,
    stats: SnapshotStats,
    tick: u64,
    tick_duration: Duration,
    player_count: Arc<AtomicUsize>,
    state_tx: watch::Sender<LoopState>,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> (Self, SimulationHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (state_tx, state_rx) = watch::channel(LoopState::Stopped);
        let player_count = Arc::new(AtomicUsize::new(0));

        let handle = SimulationHandle {
            command_tx,
            player_count: player_count.clone(),
            state_rx,
        };

        let simulation = Self {
            snapshot_builder: SnapshotBuilder::new(
                config.snapshot_interval(),
                config.visibility_range,
            ),
            tick_duration: config.tick_duration(),
            world: World::new(config),
            command_rx,
            stats: SnapshotStats::default(),
            tick: 0,
            player_count,
            state_tx,
        };

        (simulation, handle)
    }

    /// Run the tick loop until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        self.state_tx.send_replace(LoopState::Running);
        info!(
            tick_micros = self.tick_duration.as_micros() as u64,
            "Simulation started"
        );

        let mut tick_interval = interval(self.tick_duration);
        // Late ticks run late; never back-to-back catch-up
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {
                    let now = tokio::time::Instant::now().into_std();
                    self.tick(now);
                }
                command = self.command_rx.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
            }
        }

        // Timer goes first, the registry after
        drop(tick_interval);
        self.state_tx.send_replace(LoopState::Stopped);
        info!(
            tick = self.tick,
            players = self.world.len(),
            snapshots_sent = self.stats.total_snapshots,
            snapshots_dropped = self.stats.dropped,
            "Simulation stopped"
        );
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Join {
                connection_id,
                connection,
                reply,
            } => {
                let result = self.world.join(connection_id, connection).map(|_| ());
                if let Err(e) = &result {
                    warn!(error = %e, "Join rejected");
                }
                self.sync_player_count();
                let _ = reply.send(result);
            }
            Command::Input {
                connection_id,
                keyboard_state,
            } => {
                self.world.apply_input(&connection_id, &keyboard_state);
            }
            Command::Force {
                connection_id,
                force,
            } => {
                self.world.queue_force(&connection_id, force);
            }
            Command::Leave { connection_id } => {
                self.world.leave(&connection_id);
                self.sync_player_count();
            }
            Command::Shutdown => {}
        }
    }

    /// Run a single simulation tick
    fn tick(&mut self, now: Instant) {
        let timer = Timer::new();
        self.tick += 1;

        let failed = self.world.advance_players(now);

        if tracing::enabled!(tracing::Level::TRACE) {
            for (a, b) in self.world.collisions() {
                trace!(tick = self.tick, a = %a, b = %b, "Players colliding");
            }
        }

        if self.snapshot_builder.should_send() {
            self.broadcast(&failed);
        }

        let elapsed = timer.elapsed();
        if elapsed > self.tick_duration {
            warn!(
                tick = self.tick,
                elapsed_micros = elapsed.as_micros() as u64,
                budget_micros = self.tick_duration.as_micros() as u64,
                "Slow tick"
            );
        }
    }

    /// Send every connection its snapshot. Failed sends are dropped.
    fn broadcast(&mut self, excluded: &HashSet<String>) {
        let mut sent = 0;
        let mut dropped = 0;

        for (connection, msg) in self.snapshot_builder.build(self.tick, &self.world, excluded) {
            match connection.send(msg) {
                Ok(()) => sent += 1,
                Err(TrySendError::Full(_)) => {
                    dropped += 1;
                    warn!(tick = self.tick, "Client lagging, snapshot dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    dropped += 1;
                    debug!(tick = self.tick, "Connection closed before snapshot send");
                }
            }
        }

        self.stats.record(sent, dropped);
    }

    fn sync_player_count(&self) {
        self.player_count.store(self.world.len(), Ordering::Relaxed);
    }
}
