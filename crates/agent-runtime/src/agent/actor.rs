//! The agent task: mailbox loop, periodic sync timer and message handlers.

use belief_telemetry::{
    log_belief_event, BELIEFS_SENT, CONFLICTS_RESOLVED, SYNC_ROUNDS, UPDATES_RECEIVED,
};
use bm_01_belief_model::{BeliefAtom, BeliefSet, ConflictResolver};
use bm_02_propagation::{
    admit_update, verify_convergence, AdmissionDecision, DeliveryOutcome, PeerRef,
    PropagationApi, PropagationMode, PropagationService, DEFAULT_CONVERGENCE_THRESHOLD,
};
use shared_bus::{BeliefEvent, EventPublisher, InMemoryEventBus};
use shared_types::AgentId;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::{
    AgentHandle, AgentMessage, AgentMetrics, AgentState, PropagateRequest, SyncOutcome,
    SyncReport,
};
use crate::container::AgentConfig;
use crate::error::RuntimeError;

const SUBSYSTEM: &str = "runtime";

/// Spawns an agent with an empty belief set.
pub fn spawn_agent(
    id: AgentId,
    config: AgentConfig,
    bus: Option<Arc<InMemoryEventBus>>,
) -> AgentHandle {
    let beliefs = BeliefSet::new(id.clone());
    spawn_agent_with(id, config, beliefs, bus)
}

/// Spawns an agent seeded with `beliefs` (relabeled to `id`).
pub fn spawn_agent_with(
    id: AgentId,
    config: AgentConfig,
    beliefs: BeliefSet,
    bus: Option<Arc<InMemoryEventBus>>,
) -> AgentHandle {
    let (sender, inbox) = mpsc::unbounded_channel();
    let actor = AgentActor::new(id.clone(), config, beliefs, inbox, sender.downgrade(), bus);
    tokio::spawn(actor.run());
    AgentHandle::new(id, sender)
}

enum Wake {
    Message(Option<AgentMessage>),
    Tick,
}

/// Owns one agent's belief set. Constructed by [`spawn_agent`].
pub struct AgentActor {
    id: AgentId,
    state: AgentState,
    beliefs: BeliefSet,
    config: AgentConfig,
    resolver: ConflictResolver,
    propagation: PropagationService,
    neighbors: Vec<AgentHandle>,
    metrics: AgentMetrics,
    inbox: mpsc::UnboundedReceiver<AgentMessage>,
    /// Weak so that dropping every handle stops the actor.
    myself: mpsc::WeakUnboundedSender<AgentMessage>,
    bus: Option<Arc<InMemoryEventBus>>,
    sync_in_flight: bool,
}

impl AgentActor {
    fn new(
        id: AgentId,
        config: AgentConfig,
        beliefs: BeliefSet,
        inbox: mpsc::UnboundedReceiver<AgentMessage>,
        myself: mpsc::WeakUnboundedSender<AgentMessage>,
        bus: Option<Arc<InMemoryEventBus>>,
    ) -> Self {
        Self {
            beliefs: beliefs.relabeled(id.clone()),
            resolver: ConflictResolver::new(config.conflict_strategy),
            propagation: PropagationService::new(config.propagation()),
            id,
            state: AgentState::Initialized,
            config,
            neighbors: Vec::new(),
            metrics: AgentMetrics::default(),
            inbox,
            myself,
            bus,
            sync_in_flight: false,
        }
    }

    /// Processes messages until every handle is dropped.
    pub async fn run(mut self) {
        self.state = AgentState::Active;
        info!(agent = %self.id, beliefs = self.beliefs.len(), "Agent active");

        let mut ticker = sync_ticker(self.config.sync_interval);
        loop {
            let wake = tokio::select! {
                message = self.inbox.recv() => Wake::Message(message),
                _ = next_tick(&mut ticker) => Wake::Tick,
            };

            match wake {
                Wake::Message(Some(message)) => {
                    let interval = self.config.sync_interval;
                    self.handle(message).await;
                    if self.config.sync_interval != interval {
                        ticker = sync_ticker(self.config.sync_interval);
                    }
                }
                Wake::Message(None) => break,
                Wake::Tick => {
                    if !self.sync_in_flight && !self.neighbors.is_empty() {
                        self.start_sync_round(None);
                    }
                }
            }
        }

        info!(agent = %self.id, "Agent stopped");
    }

    async fn handle(&mut self, message: AgentMessage) {
        debug!(agent = %self.id, message = ?message, "Handling message");

        match message {
            AgentMessage::AuthorBelief {
                content,
                confidence,
                options,
                reply,
            } => {
                let atom = BeliefAtom::create(content, self.id.clone(), confidence, options);
                self.store(atom.clone()).await;
                if self.config.auto_propagate && !self.neighbors.is_empty() {
                    let targets = self.neighbor_peers();
                    let (mode, timeout) =
                        (self.config.propagation_mode, self.config.propagation_timeout);
                    self.spawn_propagation(atom.clone(), targets, mode, timeout, None);
                }
                let _ = reply.send(atom);
            }
            AgentMessage::IngestBelief { atom, reply } => {
                self.store(atom).await;
                let _ = reply.send(());
            }
            AgentMessage::GetBeliefSet { reply } => {
                let _ = reply.send(self.beliefs.clone());
            }
            AgentMessage::GetBelief { id, reply } => {
                let _ = reply.send(self.beliefs.get(&id).cloned());
            }
            AgentMessage::QueryBeliefs { predicate, reply } => {
                let _ = reply.send(self.beliefs.filter(|atom| predicate(atom)));
            }
            AgentMessage::ReplaceBeliefSet { set, reply } => {
                self.beliefs.replace_beliefs(&set);
                debug!(agent = %self.id, beliefs = self.beliefs.len(), "Belief set replaced");
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
            }
            AgentMessage::ReconcileBeliefSet {
                base,
                synced,
                reply,
            } => {
                let (next, kept) = self.beliefs.rebase(&base, &synced, &self.resolver);
                self.beliefs = next;
                if kept.changed() {
                    self.metrics.conflicts_resolved += kept.conflicts_resolved as u64;
                    CONFLICTS_RESOLVED.inc_by(kept.conflicts_resolved as f64);
                    debug!(
                        agent = %self.id,
                        inserted = kept.inserted,
                        conflicts_resolved = kept.conflicts_resolved,
                        replaced = kept.replaced,
                        "Kept beliefs written since snapshot"
                    );
                }
                if let Some(reply) = reply {
                    let _ = reply.send(kept);
                }
            }
            AgentMessage::SetNeighbors { neighbors, reply } => {
                self.neighbors = neighbors
                    .into_iter()
                    .filter(|neighbor| neighbor.id() != &self.id)
                    .collect();
                let _ = reply.send(());
            }
            AgentMessage::UpdateConfig { update, reply } => {
                let result = update
                    .apply(&self.config)
                    .map(|next| {
                        self.apply_config(next);
                        self.config.clone()
                    })
                    .map_err(RuntimeError::from);
                let _ = reply.send(result);
            }
            AgentMessage::GetConfig { reply } => {
                let _ = reply.send(self.config.clone());
            }
            AgentMessage::Propagate {
                belief_id,
                request,
                reply,
            } => match self.beliefs.get(&belief_id).cloned() {
                Some(atom) => {
                    let PropagateRequest {
                        targets,
                        mode,
                        timeout,
                    } = request;
                    let targets = if targets.is_empty() {
                        self.neighbor_peers()
                    } else {
                        targets
                    };
                    let mode = mode.unwrap_or(self.config.propagation_mode);
                    let timeout = timeout.unwrap_or(self.config.propagation_timeout);
                    self.spawn_propagation(atom, targets, mode, timeout, Some(reply));
                }
                None => {
                    let _ = reply.send(Err(RuntimeError::UnknownBelief {
                        agent: self.id.clone(),
                        belief_id,
                    }));
                }
            },
            AgentMessage::SyncNow { reply } => self.start_sync_round(reply),
            AgentMessage::SyncWith { neighbor, reply } => self.start_sync(neighbor, reply),
            AgentMessage::AdoptNeighborSet {
                neighbor,
                fetched,
                reply,
            } => {
                let result = self.adopt(&neighbor, fetched).await;
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
            AgentMessage::SyncRoundFinished => self.sync_in_flight = false,
            AgentMessage::BeliefUpdate { atom, from, ack } => {
                let decision = self.admit(atom, from).await;
                if let Some(ack) = ack {
                    let _ = ack.send(decision);
                }
            }
            AgentMessage::GetMetrics { reply } => {
                let _ = reply.send(self.metrics.clone());
            }
            AgentMessage::GetState { reply } => {
                let _ = reply.send(self.state);
            }
        }
    }

    async fn store(&mut self, atom: BeliefAtom) {
        log_belief_event!(
            debug,
            SUBSYSTEM,
            "Belief stored",
            self.id,
            atom.id,
            confidence = atom.confidence
        );
        let event = BeliefEvent::BeliefAuthored {
            agent: self.id.clone(),
            belief_id: atom.id.clone(),
            confidence: atom.confidence,
        };
        self.beliefs.upsert(atom);
        self.publish(event).await;
    }

    async fn admit(&mut self, atom: BeliefAtom, from: AgentId) -> AdmissionDecision {
        let (updated, decision) = admit_update(
            &atom,
            &self.beliefs,
            self.config.acceptance_threshold,
            &self.resolver,
        );
        self.beliefs = updated;

        self.metrics.updates_received += 1;
        if decision.is_accepted() {
            self.metrics.updates_accepted += 1;
            UPDATES_RECEIVED.with_label_values(&["accepted"]).inc();
        } else {
            self.metrics.updates_rejected += 1;
            UPDATES_RECEIVED.with_label_values(&["rejected"]).inc();
        }
        if decision.conflict_resolved() {
            self.metrics.conflicts_resolved += 1;
            CONFLICTS_RESOLVED.inc();
        }

        log_belief_event!(
            debug,
            SUBSYSTEM,
            "Inbound update decided",
            self.id,
            atom.id,
            from = %from,
            accepted = decision.is_accepted()
        );
        self.publish(BeliefEvent::UpdateAdmitted {
            agent: self.id.clone(),
            from,
            belief_id: atom.id,
            accepted: decision.is_accepted(),
        })
        .await;
        decision
    }

    fn apply_config(&mut self, next: AgentConfig) {
        if next.conflict_strategy != self.config.conflict_strategy {
            self.resolver = ConflictResolver::new(next.conflict_strategy);
        }
        self.propagation = PropagationService::new(next.propagation());
        info!(
            agent = %self.id,
            threshold = next.acceptance_threshold,
            strategy = %next.conflict_strategy,
            "Configuration updated"
        );
        self.config = next;
    }

    fn neighbor_peers(&self) -> Vec<PeerRef> {
        self.neighbors.iter().map(AgentHandle::as_peer).collect()
    }

    fn handle_to_self(&self) -> Option<AgentHandle> {
        self.myself
            .upgrade()
            .map(|sender| AgentHandle::new(self.id.clone(), sender))
    }

    // =========================================================================
    // PROPAGATION
    // =========================================================================

    fn spawn_propagation(
        &mut self,
        atom: BeliefAtom,
        targets: Vec<PeerRef>,
        mode: PropagationMode,
        timeout: Duration,
        reply: Option<oneshot::Sender<Result<Vec<DeliveryOutcome>, RuntimeError>>>,
    ) {
        self.metrics.beliefs_sent += targets.len() as u64;
        BELIEFS_SENT.inc_by(targets.len() as f64);

        let service = self.propagation.clone();
        let from = self.id.clone();
        tokio::spawn(async move {
            let outcomes = service
                .propagate(&atom, &from, &targets, mode, timeout)
                .await;
            if let Some(reply) = reply {
                let _ = reply.send(Ok(outcomes));
            }
        });
    }

    // =========================================================================
    // NEIGHBOR SYNC
    // =========================================================================

    fn start_sync_round(&mut self, reply: Option<oneshot::Sender<Vec<SyncOutcome>>>) {
        let Some(me) = self.handle_to_self() else {
            return;
        };
        self.sync_in_flight = true;
        let neighbors = self.neighbors.clone();
        debug!(agent = %self.id, neighbors = neighbors.len(), "Sync round started");

        tokio::spawn(async move {
            let mut outcomes = Vec::with_capacity(neighbors.len());
            for neighbor in &neighbors {
                let result = me.sync_with(neighbor).await;
                outcomes.push(SyncOutcome {
                    neighbor: neighbor.id().clone(),
                    result,
                });
            }
            let _ = me.send(AgentMessage::SyncRoundFinished);
            if let Some(reply) = reply {
                let _ = reply.send(outcomes);
            }
        });
    }

    fn start_sync(
        &self,
        neighbor: AgentHandle,
        reply: Option<oneshot::Sender<Result<SyncReport, RuntimeError>>>,
    ) {
        let Some(me) = self.handle_to_self() else {
            return;
        };
        let timeout = self.config.sync_timeout;

        tokio::spawn(async move {
            let fetched = neighbor.within(timeout, neighbor.belief_set()).await;
            let _ = me.send(AgentMessage::AdoptNeighborSet {
                neighbor,
                fetched,
                reply,
            });
        });
    }

    async fn adopt(
        &mut self,
        neighbor: &AgentHandle,
        fetched: Result<BeliefSet, RuntimeError>,
    ) -> Result<SyncReport, RuntimeError> {
        let remote = match fetched {
            Ok(remote) => remote,
            Err(error) => {
                self.metrics.syncs_failed += 1;
                SYNC_ROUNDS.with_label_values(&["failed"]).inc();
                warn!(
                    agent = %self.id,
                    neighbor = %neighbor.id(),
                    error = %error,
                    "Neighbor sync failed"
                );
                return Err(error);
            }
        };

        let coverage_before =
            verify_convergence([&self.beliefs, &remote], DEFAULT_CONVERGENCE_THRESHOLD).coverage;
        let (merged, stats) = self.beliefs.merge_with_stats(&remote, &self.resolver);
        self.beliefs = merged;

        if let Err(error) = neighbor.send(AgentMessage::ReconcileBeliefSet {
            base: remote,
            synced: self.beliefs.clone(),
            reply: None,
        }) {
            warn!(
                agent = %self.id,
                neighbor = %neighbor.id(),
                error = %error,
                "Neighbor gone before adopting merge"
            );
        }

        let report = SyncReport {
            neighbor: neighbor.id().clone(),
            inserted: stats.inserted,
            conflicts_resolved: stats.conflicts_resolved,
            replaced: stats.replaced,
            coverage_before,
        };
        self.metrics.syncs_completed += 1;
        self.metrics.conflicts_resolved += stats.conflicts_resolved as u64;
        self.metrics.last_convergence_score = Some(coverage_before);
        SYNC_ROUNDS.with_label_values(&["success"]).inc();
        CONFLICTS_RESOLVED.inc_by(stats.conflicts_resolved as f64);

        info!(
            agent = %self.id,
            neighbor = %neighbor.id(),
            inserted = report.inserted,
            conflicts_resolved = report.conflicts_resolved,
            coverage_before,
            "Neighbor sync completed"
        );
        self.publish(BeliefEvent::SyncCompleted {
            agent: self.id.clone(),
            neighbor: neighbor.id().clone(),
            changed: report.changed(),
        })
        .await;
        Ok(report)
    }

    /// Owns what it needs so no borrow of the actor is held across `.await`.
    fn publish(&self, event: BeliefEvent) -> impl Future<Output = ()> + Send + 'static {
        let bus = self.bus.clone();
        async move {
            if let Some(bus) = bus {
                bus.publish(event).await;
            }
        }
    }
}

fn sync_ticker(period: Option<Duration>) -> Option<Interval> {
    period.map(|period| {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker
    })
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
