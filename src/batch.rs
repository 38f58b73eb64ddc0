//! Batch Orchestration
//!
//! Drives a regeneration request to completion: per entity it resolves the
//! effective language, asks the staleness evaluator for a decision,
//! reserves budget, dispatches eligible entities to the generation
//! collaborator across a bounded worker pool, and commits results through
//! the cache writer. Failures are isolated per entity; the report always
//! lists outcomes in original request order.

use crate::config::EngineConfig;
use crate::cost::{CostGuard, UNIT_COST};
use crate::entity::{Entity, EntityStore};
use crate::error::EngineError;
use crate::language::resolve_language;
use crate::provider::DescriptionGenerator;
use crate::staleness::{self, RegenerationDecision, Scenario, SkipReason};
use crate::types::{EntityId, LanguageTag};
use crate::writer::CacheWriter;
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// One batch invocation. Discarded after the report is produced; no
/// request-scoped state survives between batches.
#[derive(Debug, Clone)]
pub struct RegenerationRequest {
    /// Entities to evaluate, in the order outcomes will be reported.
    pub entities: Vec<Entity>,
    pub scenario: Scenario,
    pub respect_cost_limits: bool,
    /// Optional per-entity budget weights, aligned by index. Every entity
    /// costs [`UNIT_COST`] when absent.
    pub cost_weights: Option<Vec<u32>>,
}

impl RegenerationRequest {
    pub fn new(entities: Vec<Entity>, scenario: Scenario, respect_cost_limits: bool) -> Self {
        Self {
            entities,
            scenario,
            respect_cost_limits,
            cost_weights: None,
        }
    }

    fn validate(&self) -> Result<(), EngineError> {
        if self.entities.is_empty() {
            return Err(EngineError::InvalidRequest(
                "entity list is empty".to_string(),
            ));
        }
        if let Some(weights) = &self.cost_weights {
            if weights.len() != self.entities.len() {
                return Err(EngineError::InvalidRequest(format!(
                    "cost_weights has {} entries for {} entities",
                    weights.len(),
                    self.entities.len()
                )));
            }
        }
        Ok(())
    }
}

/// Per-entity outcome in a batch report.
#[derive(Debug, Clone, Serialize)]
pub struct ItemOutcome {
    pub entity_id: EntityId,
    pub decision: RegenerationDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ItemOutcome {
    fn reused(entity_id: EntityId) -> Self {
        Self {
            entity_id,
            decision: RegenerationDecision::Reuse,
            new_content: None,
            error: None,
        }
    }

    fn regenerated(entity_id: EntityId, content: String) -> Self {
        Self {
            entity_id,
            decision: RegenerationDecision::Regenerate,
            new_content: Some(content),
            error: None,
        }
    }

    fn skipped(entity_id: EntityId, reason: SkipReason, error: Option<String>) -> Self {
        Self {
            entity_id,
            decision: RegenerationDecision::Skipped(reason),
            new_content: None,
            error,
        }
    }
}

/// Aggregated result of one batch, outcomes in original request order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<ItemOutcome>,
    pub regenerated: usize,
    pub reused: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Budget units consumed, tracked even when limits are not enforced.
    pub cost_consumed: u32,
}

impl BatchReport {
    fn from_outcomes(outcomes: Vec<ItemOutcome>, cost_consumed: u32) -> Self {
        let mut report = Self {
            outcomes: Vec::new(),
            regenerated: 0,
            reused: 0,
            skipped: 0,
            failed: 0,
            cost_consumed,
        };
        for outcome in &outcomes {
            match outcome.decision {
                RegenerationDecision::Regenerate => report.regenerated += 1,
                RegenerationDecision::Reuse => report.reused += 1,
                RegenerationDecision::Skipped(reason) if reason.is_failure() => report.failed += 1,
                RegenerationDecision::Skipped(_) => report.skipped += 1,
            }
        }
        report.outcomes = outcomes;
        report
    }
}

/// Cancellation handle for an in-flight batch.
///
/// Cancelling lets already-dispatched generations finish, but their
/// results are discarded before commit; undispatched entities are reported
/// as skipped.
#[derive(Debug, Clone, Default)]
pub struct BatchHandle {
    cancelled: Arc<AtomicBool>,
}

impl BatchHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// The regeneration engine: batch orchestrator over a store and a
/// generation collaborator. Configuration is fixed at construction.
pub struct RegenerationEngine {
    config: EngineConfig,
    store: Arc<dyn EntityStore>,
    generator: Arc<dyn DescriptionGenerator>,
    writer: CacheWriter,
}

impl RegenerationEngine {
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn EntityStore>,
        generator: Arc<dyn DescriptionGenerator>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let writer = CacheWriter::new(Arc::clone(&store));
        Ok(Self {
            config,
            store,
            generator,
            writer,
        })
    }

    /// Fetch current entity records for a list of ids, preserving order.
    ///
    /// A storage failure here aborts before any processing; unlike
    /// per-entity generation failures there is no partial report to give.
    pub async fn load_entities(&self, ids: &[EntityId]) -> Result<Vec<Entity>, EngineError> {
        let mut entities = Vec::with_capacity(ids.len());
        for id in ids {
            entities.push(self.store.get(id).await?);
        }
        Ok(entities)
    }

    /// Run a batch to completion.
    pub async fn run(&self, request: RegenerationRequest) -> Result<BatchReport, EngineError> {
        self.run_with_handle(request, &BatchHandle::new()).await
    }

    /// Run a batch with an external cancellation handle.
    pub async fn run_with_handle(
        &self,
        request: RegenerationRequest,
        handle: &BatchHandle,
    ) -> Result<BatchReport, EngineError> {
        request.validate()?;

        let RegenerationRequest {
            entities,
            scenario,
            respect_cost_limits,
            cost_weights,
        } = request;

        let total = entities.len();
        info!(
            total,
            scenario = ?scenario,
            respect_cost_limits,
            "Starting regeneration batch"
        );

        let guard = CostGuard::new(self.config.cost_budget, respect_cost_limits);
        let window = self.config.staleness_window();
        let now = Utc::now();

        let ids: Vec<EntityId> = entities.iter().map(|e| e.id.clone()).collect();
        let mut slots: Vec<Option<ItemOutcome>> = Vec::with_capacity(total);
        slots.resize_with(total, || None);

        // Admission pass, in request order: decisions and budget
        // reservations are made before any dispatch so cost limiting stays
        // deterministic regardless of worker interleaving.
        let mut jobs: Vec<(usize, Entity, LanguageTag)> = Vec::new();
        for (index, entity) in entities.into_iter().enumerate() {
            // A batch cancelled before admission reserves nothing.
            if handle.is_cancelled() {
                slots[index] = Some(ItemOutcome::skipped(entity.id, SkipReason::Cancelled, None));
                continue;
            }
            let effective = resolve_language(&entity);
            let decision = staleness::decide(&entity, scenario, &effective, window, now);
            match decision {
                RegenerationDecision::Reuse => {
                    debug!(entity_id = %entity.id, "Reusing cached description");
                    slots[index] = Some(ItemOutcome::reused(entity.id));
                }
                RegenerationDecision::Regenerate => {
                    let weight = cost_weights
                        .as_ref()
                        .map(|weights| weights[index])
                        .unwrap_or(UNIT_COST);
                    if guard.reserve(weight).is_granted() {
                        jobs.push((index, entity, effective));
                    } else {
                        debug!(entity_id = %entity.id, weight, "Cost budget exhausted");
                        slots[index] =
                            Some(ItemOutcome::skipped(entity.id, SkipReason::CostLimit, None));
                    }
                }
                RegenerationDecision::Skipped(reason) => {
                    slots[index] = Some(ItemOutcome::skipped(entity.id, reason, None));
                }
            }
        }

        // Dispatch pass: eligible entities run concurrently on a bounded
        // pool. Only the cost guard (already settled) and the infra strike
        // counter are shared between workers.
        let semaphore = Arc::new(Semaphore::new(self.config.worker_pool_size));
        let infra_strikes = Arc::new(Mutex::new(0usize));
        let short_circuit = Arc::new(AtomicBool::new(false));

        let mut futures = FuturesUnordered::new();
        for (index, entity, language) in jobs {
            let semaphore = Arc::clone(&semaphore);
            let infra_strikes = Arc::clone(&infra_strikes);
            let short_circuit = Arc::clone(&short_circuit);
            futures.push(async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (
                            index,
                            ItemOutcome::skipped(entity.id, SkipReason::Cancelled, None),
                        )
                    }
                };
                let outcome = self
                    .process_item(entity, language, handle, &infra_strikes, &short_circuit)
                    .await;
                (index, outcome)
            });
        }

        while let Some((index, outcome)) = futures.next().await {
            slots[index] = Some(outcome);
        }

        let outcomes: Vec<ItemOutcome> = slots
            .into_iter()
            .zip(ids)
            .map(|(slot, id)| {
                slot.unwrap_or_else(|| ItemOutcome::skipped(id, SkipReason::Cancelled, None))
            })
            .collect();

        let report = BatchReport::from_outcomes(outcomes, guard.consumed());
        info!(
            regenerated = report.regenerated,
            reused = report.reused,
            skipped = report.skipped,
            failed = report.failed,
            cost_consumed = report.cost_consumed,
            "Regeneration batch finished"
        );
        Ok(report)
    }

    async fn process_item(
        &self,
        entity: Entity,
        language: LanguageTag,
        handle: &BatchHandle,
        infra_strikes: &Mutex<usize>,
        short_circuit: &AtomicBool,
    ) -> ItemOutcome {
        if short_circuit.load(Ordering::SeqCst) {
            return ItemOutcome::skipped(
                entity.id,
                SkipReason::Infrastructure,
                Some("storage collaborator unavailable".to_string()),
            );
        }
        if handle.is_cancelled() {
            return ItemOutcome::skipped(entity.id, SkipReason::Cancelled, None);
        }

        let timeout = self.config.generation_timeout();
        let generated = match tokio::time::timeout(
            timeout,
            self.generator.generate(&entity.name, &language),
        )
        .await
        {
            Ok(Ok(description)) => description,
            Ok(Err(err)) => {
                warn!(entity_id = %entity.id, error = %err, "Generation failed");
                return ItemOutcome::skipped(
                    entity.id,
                    SkipReason::GenerationFailed,
                    Some(err.to_string()),
                );
            }
            Err(_) => {
                let err = EngineError::Timeout(self.config.generation_timeout_secs);
                warn!(entity_id = %entity.id, error = %err, "Generation timed out");
                return ItemOutcome::skipped(
                    entity.id,
                    SkipReason::GenerationFailed,
                    Some(err.to_string()),
                );
            }
        };

        // Cancelled mid-flight: the generation completed but its result is
        // discarded rather than reported as a durable success.
        if handle.is_cancelled() {
            return ItemOutcome::skipped(entity.id, SkipReason::Cancelled, None);
        }

        match self.writer.commit(&entity.id, &generated, Utc::now()).await {
            Ok(()) => {
                *infra_strikes.lock() = 0;
                ItemOutcome::regenerated(entity.id, generated.text)
            }
            Err(err) => {
                if err.is_infrastructure() {
                    let mut strikes = infra_strikes.lock();
                    *strikes += 1;
                    if *strikes >= self.config.infra_failure_threshold {
                        error!(
                            strikes = *strikes,
                            "Storage unavailable; short-circuiting remaining batch items"
                        );
                        short_circuit.store(true, Ordering::SeqCst);
                    }
                } else {
                    *infra_strikes.lock() = 0;
                }
                warn!(entity_id = %entity.id, error = %err, "Persist failed after generation");
                ItemOutcome::skipped(entity.id, SkipReason::PersistFailed, Some(err.to_string()))
            }
        }
    }
}
