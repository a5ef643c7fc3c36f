//! # Belief-Mesh Benchmarks
//!
//! | Crate | Operation | Shape |
//! |-------|-----------|-------|
//! | bm-01 | `BeliefSet::merge` | overlapping sets, half the ids conflicting |
//! | bm-01 | `find_conflicts` | pairwise over one set |
//! | bm-02 | `verify_convergence` | presence coverage over a population |
//! | bm-03 | `synchronize_beliefs` | all-pairs merge |
//! | bm-03 | `construct_global_state` | union plus resolution |

// Allow excessive nesting in benchmark code
#![allow(clippy::excessive_nesting)]

use bm_01_belief_model::{AtomOptions, BeliefAtom, BeliefSet, ConflictResolver, ResolutionStrategy};
use bm_02_propagation::verify_convergence;
use bm_03_consistency::{construct_global_state, create_plan, synchronize_beliefs, PlanOptions};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};
use shared_types::{AgentId, BeliefContent};
use std::collections::BTreeMap;
use std::time::Duration;

/// Set of `size` beliefs; `variant` changes the value of every other id.
fn population_set(agent: &str, size: usize, variant: i64, rng: &mut StdRng) -> BeliefSet {
    let atoms = (0..size).map(|i| {
        let value = if i % 2 == 0 { i as i64 } else { i as i64 + variant };
        BeliefAtom::create(
            BeliefContent::tuple([BeliefContent::symbol("reading"), BeliefContent::int(value)]),
            AgentId::from(agent),
            rng.gen_range(0.5..1.0),
            AtomOptions::default().with_id(format!("b{i}")).at(1_000 + i as u64),
        )
    });
    BeliefSet::from_atoms(AgentId::from(agent), atoms)
}

fn population(agents: usize, beliefs: usize) -> BTreeMap<AgentId, BeliefSet> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..agents)
        .map(|i| {
            let name = format!("agent-{i}");
            // Each agent knows a shifted window so coverage stays below 1.
            let set = population_set(&name, beliefs + i, i as i64, &mut rng);
            (AgentId::from(name), set)
        })
        .collect()
}

// ============================================================================
// BM-01: Belief Model
// ============================================================================

fn bench_belief_set_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("bm-01-belief-model");
    group.measurement_time(Duration::from_secs(5));

    let resolver = ConflictResolver::new(ResolutionStrategy::HighestConfidence);
    let mut rng = StdRng::seed_from_u64(7);

    for size in [10, 100, 1_000] {
        let local = population_set("a", size, 0, &mut rng);
        let remote = population_set("b", size, 1, &mut rng);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(
            BenchmarkId::new("merge", size),
            &(local, remote),
            |b, (local, remote)| b.iter(|| black_box(local.merge(remote, &resolver))),
        );
    }

    for size in [10, 100, 300] {
        let set = population_set("a", size, 0, &mut rng);
        group.bench_with_input(BenchmarkId::new("find_conflicts", size), &set, |b, set| {
            b.iter(|| black_box(set.find_conflicts()))
        });
    }

    group.finish();
}

// ============================================================================
// BM-02: Propagation
// ============================================================================

fn bench_convergence(c: &mut Criterion) {
    let mut group = c.benchmark_group("bm-02-propagation");

    for agents in [5, 20, 50] {
        let sets = population(agents, 200);
        group.throughput(Throughput::Elements(agents as u64));
        group.bench_with_input(
            BenchmarkId::new("verify_convergence", agents),
            &sets,
            |b, sets| b.iter(|| black_box(verify_convergence(sets.values(), 0.95))),
        );
    }

    group.finish();
}

// ============================================================================
// BM-03: Consistency
// ============================================================================

fn bench_consistency(c: &mut Criterion) {
    let mut group = c.benchmark_group("bm-03-consistency");
    group.measurement_time(Duration::from_secs(10));

    let resolver = ConflictResolver::new(ResolutionStrategy::HighestConfidence);

    for agents in [4, 8, 16] {
        let sets = population(agents, 100);
        let ids: Vec<AgentId> = sets.keys().cloned().collect();

        group.bench_with_input(
            BenchmarkId::new("synchronize_beliefs", agents),
            &(sets.clone(), ids),
            |b, (sets, ids)| {
                b.iter(|| {
                    let mut working = sets.clone();
                    black_box(synchronize_beliefs(&mut working, ids, &resolver).is_ok())
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("construct_global_state", agents),
            &sets,
            |b, sets| {
                b.iter(|| black_box(construct_global_state(sets.values(), &resolver, 0.5).is_ok()))
            },
        );
    }

    let ids: Vec<AgentId> = (0..1_000).map(|i| AgentId::from(format!("agent-{i}"))).collect();
    group.bench_function("create_plan_1000_agents", |b| {
        b.iter(|| black_box(create_plan(&ids, PlanOptions::default())))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_belief_set_operations,
    bench_convergence,
    bench_consistency,
);

criterion_main!(benches);
