//! # Global Alignment
//!
//! Derives a population-wide belief set from local sets and pulls local
//! sets toward it.
//!
//! ## Enforcement Levels
//!
//! | Level | Effect on the local set |
//! |-------|-------------------------|
//! | `Strong` | replaced by the global beliefs |
//! | `Additive` | gains missing global atoms; more confident global atoms overwrite; nothing is removed |
//! | `Advisory` | `merge(local, global)` under highest confidence |
//! | `Selective` | required ids forced in from global, prohibited ids removed |

use bm_01_belief_model::{
    aggregate, AggregationMethod, BeliefAtom, BeliefSet, ConflictResolver, ResolutionStrategy,
};
use serde::{Deserialize, Serialize};
use shared_types::{AgentId, BeliefId};
use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::events::ConsistencyError;

/// Owner label of a constructed global set.
pub const GLOBAL_AGENT: &str = "global";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalStateOptions {
    pub conflict_strategy: ResolutionStrategy,
    /// Minimum confidence for an atom to enter the global set.
    pub confidence_threshold: f64,
}

impl Default for GlobalStateOptions {
    fn default() -> Self {
        Self {
            conflict_strategy: ResolutionStrategy::HighestConfidence,
            confidence_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EnforcementLevel {
    Strong,
    Additive,
    #[default]
    Advisory,
    Selective {
        required: BTreeSet<BeliefId>,
        prohibited: BTreeSet<BeliefId>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentOptions {
    pub global: GlobalStateOptions,
    pub enforcement: EnforcementLevel,
    /// Wall-clock budget for executing an alignment plan.
    pub time_budget: Duration,
}

impl Default for AlignmentOptions {
    fn default() -> Self {
        Self {
            global: GlobalStateOptions::default(),
            enforcement: EnforcementLevel::default(),
            time_budget: Duration::from_secs(10),
        }
    }
}

/// Builds the global set from local sets.
///
/// Per belief id: a single instance enters iff confident enough; identical
/// instances are aggregated by weighted average; differing instances are
/// left-folded through the resolver. Instances are visited in the order
/// `sets` yields them.
pub fn construct_global_state<'a, I>(
    sets: I,
    resolver: &ConflictResolver,
    confidence_threshold: f64,
) -> Result<BeliefSet, ConsistencyError>
where
    I: IntoIterator<Item = &'a BeliefSet>,
{
    let mut grouped: BTreeMap<&BeliefId, Vec<&BeliefAtom>> = BTreeMap::new();
    for set in sets {
        for atom in set.atoms() {
            grouped.entry(&atom.id).or_default().push(atom);
        }
    }

    let mut global = BeliefSet::new(AgentId::from(GLOBAL_AGENT));
    for (id, instances) in grouped {
        let candidate = match instances.as_slice() {
            [] => continue,
            [single] => (*single).clone(),
            [first, rest @ ..] if rest.iter().all(|a| a.content == first.content) => {
                let owned: Vec<BeliefAtom> = instances.iter().map(|a| (*a).clone()).collect();
                aggregate(&owned, AggregationMethod::WeightedAverage)?
            }
            [first, rest @ ..] => rest
                .iter()
                .fold((*first).clone(), |acc, next| resolver.resolve(&acc, next)),
        };

        if candidate.confidence >= confidence_threshold {
            global.upsert(candidate);
        } else {
            debug!(belief_id = %id, confidence = candidate.confidence, "Excluded from global state");
        }
    }
    Ok(global)
}

/// Reconciles `local` with `global`; the result keeps `local`'s owner.
pub fn align_with_global(
    local: &BeliefSet,
    global: &BeliefSet,
    level: &EnforcementLevel,
) -> BeliefSet {
    match level {
        EnforcementLevel::Strong => {
            let mut aligned = local.clone();
            aligned.replace_beliefs(global);
            aligned
        }
        EnforcementLevel::Additive => {
            let mut aligned = local.clone();
            for atom in global.atoms() {
                let overwrite = aligned
                    .get(&atom.id)
                    .map_or(true, |held| atom.confidence > held.confidence);
                if overwrite {
                    aligned.upsert(atom.clone());
                }
            }
            aligned
        }
        EnforcementLevel::Advisory => {
            local.merge(global, &ConflictResolver::new(ResolutionStrategy::HighestConfidence))
        }
        EnforcementLevel::Selective {
            required,
            prohibited,
        } => {
            let mut aligned = local.clone();
            for id in required {
                if let Some(atom) = global.get(id) {
                    aligned.upsert(atom.clone());
                }
            }
            for id in prohibited {
                aligned.remove(id);
            }
            aligned
        }
    }
}

/// Fraction of global ids whose content matches the local copy.
pub fn alignment_score(local: &BeliefSet, global: &BeliefSet) -> f64 {
    if global.is_empty() {
        return 1.0;
    }
    let matching = global
        .atoms()
        .filter(|atom| {
            local
                .get(&atom.id)
                .is_some_and(|held| held.content == atom.content)
        })
        .count();
    matching as f64 / global.len() as f64
}

/// Agents ordered most-misaligned first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentPlan {
    pub order: Vec<(AgentId, f64)>,
}

pub fn create_alignment_plan(
    sets: &BTreeMap<AgentId, BeliefSet>,
    global: &BeliefSet,
) -> AlignmentPlan {
    let mut order: Vec<(AgentId, f64)> = sets
        .iter()
        .map(|(agent, set)| (agent.clone(), alignment_score(set, global)))
        .collect();
    order.sort_by(|(a_id, a), (b_id, b)| a.total_cmp(b).then_with(|| a_id.cmp(b_id)));
    AlignmentPlan { order }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentSummary {
    pub aligned: Vec<AgentId>,
    /// Agents not reached before the budget ran out.
    pub skipped: Vec<AgentId>,
    pub scores_before: BTreeMap<AgentId, f64>,
    pub scores_after: BTreeMap<AgentId, f64>,
    pub budget_exhausted: bool,
    pub belief_sets: BTreeMap<AgentId, BeliefSet>,
}

/// Aligns agents in plan order until the time budget is spent.
///
/// The budget is checked between agents only.
pub fn execute_alignment_plan(
    plan: &AlignmentPlan,
    mut sets: BTreeMap<AgentId, BeliefSet>,
    global: &BeliefSet,
    level: &EnforcementLevel,
    time_budget: Duration,
) -> AlignmentSummary {
    let started = Instant::now();
    let mut aligned = Vec::new();
    let mut skipped = Vec::new();
    let mut scores_after = BTreeMap::new();
    let mut budget_exhausted = false;

    for (agent, _) in &plan.order {
        if budget_exhausted || started.elapsed() >= time_budget {
            budget_exhausted = true;
            skipped.push(agent.clone());
            continue;
        }
        let Some(local) = sets.get(agent) else {
            skipped.push(agent.clone());
            continue;
        };
        let updated = align_with_global(local, global, level);
        scores_after.insert(agent.clone(), alignment_score(&updated, global));
        sets.insert(agent.clone(), updated);
        aligned.push(agent.clone());
    }

    if budget_exhausted {
        warn!(
            aligned = aligned.len(),
            skipped = skipped.len(),
            budget_ms = time_budget.as_millis() as u64,
            "Alignment budget exhausted"
        );
    }

    AlignmentSummary {
        aligned,
        skipped,
        scores_before: plan.order.iter().cloned().collect(),
        scores_after,
        budget_exhausted,
        belief_sets: sets,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bm_01_belief_model::{uncertainty, AtomOptions};
    use shared_types::BeliefContent;

    fn fact(agent: &str, id: &str, value: &str, confidence: f64) -> BeliefAtom {
        BeliefAtom::create(
            BeliefContent::tuple([BeliefContent::symbol(id), BeliefContent::symbol(value)]),
            AgentId::from(agent),
            confidence,
            AtomOptions::default().with_id(id).at(1),
        )
    }

    fn set(agent: &str, atoms: Vec<BeliefAtom>) -> BeliefSet {
        BeliefSet::from_atoms(AgentId::from(agent), atoms)
    }

    fn content(set: &BeliefSet, id: &str) -> Option<BeliefContent> {
        set.get(&id.into()).map(|a| a.content.clone())
    }

    #[test]
    fn test_global_state_single_instances_filtered_by_threshold() {
        let sets = vec![
            set("a", vec![fact("a", "sky", "blue", 0.8)]),
            set("b", vec![fact("b", "sea", "green", 0.2)]),
        ];
        let global = construct_global_state(&sets, &ConflictResolver::default(), 0.5).unwrap();
        assert_eq!(global.len(), 1);
        assert!(global.contains(&"sky".into()));
        assert_eq!(global.agent_id().as_str(), GLOBAL_AGENT);
    }

    #[test]
    fn test_global_state_aggregates_identical_instances() {
        let sets = vec![
            set("a", vec![fact("a", "sky", "blue", 0.9)]),
            set("b", vec![fact("b", "sky", "blue", 0.3)]),
        ];
        let global = construct_global_state(&sets, &ConflictResolver::default(), 0.7).unwrap();
        // (0.81 + 0.09) / 1.2
        let held = global.get(&"sky".into()).unwrap();
        assert!((held.confidence - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_global_state_aggregates_model_values() {
        let a = uncertainty::attach(
            fact("a", "sky", "blue", 0.0),
            uncertainty::UncertaintyModel::Probabilistic,
            [("probability".to_string(), 0.8)].into_iter().collect(),
        );
        let b = uncertainty::attach(
            fact("b", "sky", "blue", 0.0),
            uncertainty::UncertaintyModel::Probabilistic,
            [("probability".to_string(), 0.2)].into_iter().collect(),
        );
        let sets = vec![set("a", vec![a]), set("b", vec![b])];
        let global = construct_global_state(&sets, &ConflictResolver::default(), 0.6).unwrap();
        let held = global.get(&"sky".into()).unwrap();
        assert!((held.confidence - 0.68).abs() < 1e-12);
    }

    #[test]
    fn test_global_state_resolves_differing_instances() {
        let sets = vec![
            set("a", vec![fact("a", "sky", "blue", 0.6)]),
            set("b", vec![fact("b", "sky", "grey", 0.9)]),
            set("c", vec![fact("c", "sky", "red", 0.7)]),
        ];
        let resolver = ConflictResolver::new(ResolutionStrategy::HighestConfidence);
        let global = construct_global_state(&sets, &resolver, 0.5).unwrap();
        assert_eq!(
            content(&global, "sky"),
            Some(fact("b", "sky", "grey", 0.9).content)
        );

        let strict = construct_global_state(&sets, &resolver, 0.95).unwrap();
        assert!(strict.is_empty());
    }

    #[test]
    fn test_enforcement_levels() {
        let local = set(
            "me",
            vec![fact("me", "sky", "red", 0.9), fact("me", "mine", "x", 0.4)],
        );
        let global = set(
            GLOBAL_AGENT,
            vec![fact("g", "sky", "blue", 0.5), fact("g", "sea", "green", 0.8)],
        );

        let strong = align_with_global(&local, &global, &EnforcementLevel::Strong);
        assert_eq!(strong.agent_id().as_str(), "me");
        assert_eq!(strong.ids(), global.ids());

        let additive = align_with_global(&local, &global, &EnforcementLevel::Additive);
        assert_eq!(additive.len(), 3);
        // Local sky is more confident and survives.
        assert_eq!(content(&additive, "sky"), content(&local, "sky"));

        let advisory = align_with_global(&local, &global, &EnforcementLevel::Advisory);
        assert_eq!(content(&advisory, "sky"), content(&local, "sky"));
        assert!(advisory.contains(&"sea".into()));

        let selective = align_with_global(
            &local,
            &global,
            &EnforcementLevel::Selective {
                required: [BeliefId::from("sky")].into_iter().collect(),
                prohibited: [BeliefId::from("mine")].into_iter().collect(),
            },
        );
        assert_eq!(content(&selective, "sky"), content(&global, "sky"));
        assert!(!selective.contains(&"mine".into()));
        assert!(!selective.contains(&"sea".into()));
    }

    #[test]
    fn test_alignment_score() {
        let global = set(
            GLOBAL_AGENT,
            vec![fact("g", "sky", "blue", 0.5), fact("g", "sea", "green", 0.8)],
        );
        let half = set("me", vec![fact("me", "sky", "blue", 0.1)]);
        assert_eq!(alignment_score(&half, &global), 0.5);

        let wrong = set("me", vec![fact("me", "sky", "red", 0.1)]);
        assert_eq!(alignment_score(&wrong, &global), 0.0);

        let empty_global = BeliefSet::new(AgentId::from(GLOBAL_AGENT));
        assert_eq!(alignment_score(&wrong, &empty_global), 1.0);
    }

    #[test]
    fn test_alignment_plan_orders_most_misaligned_first() {
        let global = set(
            GLOBAL_AGENT,
            vec![fact("g", "sky", "blue", 0.5), fact("g", "sea", "green", 0.8)],
        );
        let mut sets = BTreeMap::new();
        sets.insert(
            AgentId::from("aligned"),
            set(
                "aligned",
                vec![fact("x", "sky", "blue", 0.5), fact("x", "sea", "green", 0.8)],
            ),
        );
        sets.insert(AgentId::from("lost"), set("lost", vec![]));
        sets.insert(
            AgentId::from("half"),
            set("half", vec![fact("x", "sky", "blue", 0.5)]),
        );

        let plan = create_alignment_plan(&sets, &global);
        let order: Vec<&str> = plan.order.iter().map(|(a, _)| a.as_str()).collect();
        assert_eq!(order, vec!["lost", "half", "aligned"]);

        let summary = execute_alignment_plan(
            &plan,
            sets.clone(),
            &global,
            &EnforcementLevel::Strong,
            Duration::from_secs(60),
        );
        assert!(!summary.budget_exhausted);
        assert_eq!(summary.aligned.len(), 3);
        assert!(summary.scores_after.values().all(|s| *s == 1.0));

        let starved = execute_alignment_plan(
            &plan,
            sets,
            &global,
            &EnforcementLevel::Strong,
            Duration::ZERO,
        );
        assert!(starved.budget_exhausted);
        assert!(starved.aligned.is_empty());
        assert_eq!(starved.skipped.len(), 3);
        assert_eq!(starved.scores_before[&AgentId::from("lost")], 0.0);
    }
}
