//! # Uncertainty Representation
//!
//! Attaches an uncertainty model to a belief atom and combines or compares
//! atoms under those models.
//!
//! ## Storage
//!
//! The model name lives in the atom metadata under `uncertainty_model`, its
//! named values in a record under `uncertainty`:
//!
//! | Model | Values | Confidence derived from |
//! |-------|--------|-------------------------|
//! | probabilistic | `probability` | `probability` |
//! | fuzzy | `membership` | `membership` |
//! | dempster_shafer | `belief`, `plausibility` | `belief` |
//! | possibilistic | `possibility`, `necessity` | `necessity` |
//!
//! A missing derivation value yields confidence `0.5`.
//!
//! The Dempster-Shafer aggregation here is a plain product of belief and
//! plausibility values. It is not conflict-normalised.

use shared_types::{AgentId, BeliefContent};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::{AtomOptions, BeliefAtom, UncertaintyError};

/// Metadata key holding the model name.
pub const UNCERTAINTY_MODEL_KEY: &str = "uncertainty_model";

/// Metadata key holding the model's named values.
pub const UNCERTAINTY_VALUES_KEY: &str = "uncertainty";

/// Confidence used when the model value it derives from is absent.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Supported uncertainty models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UncertaintyModel {
    Probabilistic,
    Fuzzy,
    DempsterShafer,
    Possibilistic,
}

impl UncertaintyModel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Probabilistic => "probabilistic",
            Self::Fuzzy => "fuzzy",
            Self::DempsterShafer => "dempster_shafer",
            Self::Possibilistic => "possibilistic",
        }
    }

    /// Value the model's confidence is derived from.
    pub fn confidence_key(self) -> &'static str {
        match self {
            Self::Probabilistic => "probability",
            Self::Fuzzy => "membership",
            Self::DempsterShafer => "belief",
            Self::Possibilistic => "necessity",
        }
    }

    pub fn derive_confidence(self, values: &BTreeMap<String, f64>) -> f64 {
        values
            .get(self.confidence_key())
            .copied()
            .unwrap_or(DEFAULT_CONFIDENCE)
    }
}

impl FromStr for UncertaintyModel {
    type Err = UncertaintyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "probabilistic" => Ok(Self::Probabilistic),
            "fuzzy" => Ok(Self::Fuzzy),
            "dempster_shafer" => Ok(Self::DempsterShafer),
            "possibilistic" => Ok(Self::Possibilistic),
            other => Err(UncertaintyError::UnknownModel(other.to_string())),
        }
    }
}

impl fmt::Display for UncertaintyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How several atoms are combined into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregationMethod {
    #[default]
    WeightedAverage,
    Average,
    DempsterShafer,
    MaxConfidence,
}

impl FromStr for AggregationMethod {
    type Err = UncertaintyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weighted_average" => Ok(Self::WeightedAverage),
            "average" => Ok(Self::Average),
            "dempster_shafer" => Ok(Self::DempsterShafer),
            "max_confidence" => Ok(Self::MaxConfidence),
            other => Err(UncertaintyError::UnknownMethod(other.to_string())),
        }
    }
}

/// Creates an atom carrying an uncertainty model; confidence is derived.
pub fn represent(
    content: BeliefContent,
    source: AgentId,
    model: UncertaintyModel,
    values: BTreeMap<String, f64>,
    opts: AtomOptions,
) -> BeliefAtom {
    let atom = BeliefAtom::create(content, source, model.derive_confidence(&values), opts);
    attach(atom, model, values)
}

pub fn probabilistic(content: BeliefContent, source: AgentId, probability: f64) -> BeliefAtom {
    represent(
        content,
        source,
        UncertaintyModel::Probabilistic,
        values([("probability", probability)]),
        AtomOptions::default(),
    )
}

pub fn fuzzy(content: BeliefContent, source: AgentId, membership: f64) -> BeliefAtom {
    represent(
        content,
        source,
        UncertaintyModel::Fuzzy,
        values([("membership", membership)]),
        AtomOptions::default(),
    )
}

pub fn dempster_shafer(
    content: BeliefContent,
    source: AgentId,
    belief: f64,
    plausibility: f64,
) -> BeliefAtom {
    represent(
        content,
        source,
        UncertaintyModel::DempsterShafer,
        values([("belief", belief), ("plausibility", plausibility)]),
        AtomOptions::default(),
    )
}

pub fn possibilistic(
    content: BeliefContent,
    source: AgentId,
    possibility: f64,
    necessity: f64,
) -> BeliefAtom {
    represent(
        content,
        source,
        UncertaintyModel::Possibilistic,
        values([("possibility", possibility), ("necessity", necessity)]),
        AtomOptions::default(),
    )
}

/// Attaches a model to an existing atom without touching its timestamp.
pub fn attach(
    mut atom: BeliefAtom,
    model: UncertaintyModel,
    values: BTreeMap<String, f64>,
) -> BeliefAtom {
    atom.confidence = model.derive_confidence(&values);
    atom.metadata.insert(
        UNCERTAINTY_MODEL_KEY.to_string(),
        BeliefContent::symbol(model.as_str()),
    );
    atom.metadata.insert(
        UNCERTAINTY_VALUES_KEY.to_string(),
        BeliefContent::record(values.into_iter().map(|(k, v)| (k, BeliefContent::float(v)))),
    );
    atom
}

/// The uncertainty model recorded on an atom, if any.
pub fn model_of(atom: &BeliefAtom) -> Option<UncertaintyModel> {
    atom.metadata
        .get(UNCERTAINTY_MODEL_KEY)
        .and_then(BeliefContent::as_symbol)
        .and_then(|name| name.parse().ok())
}

/// The named uncertainty values recorded on an atom.
pub fn values_of(atom: &BeliefAtom) -> BTreeMap<String, f64> {
    atom.metadata
        .get(UNCERTAINTY_VALUES_KEY)
        .and_then(BeliefContent::as_record)
        .map(|fields| {
            fields
                .iter()
                .filter_map(|(k, v)| v.as_f64().map(|f| (k.clone(), f)))
                .collect()
        })
        .unwrap_or_default()
}

/// Combines atoms into one.
///
/// The result is built on the first atom (id, content, source) and carries
/// the newest input timestamp. Fails on empty input.
pub fn aggregate(
    atoms: &[BeliefAtom],
    method: AggregationMethod,
) -> Result<BeliefAtom, UncertaintyError> {
    let first = atoms.first().ok_or(UncertaintyError::EmptyInput)?;

    let newest = atoms.iter().map(|a| a.timestamp).max().unwrap_or(first.timestamp);
    let mut result = first.clone();
    result.timestamp = newest;

    match method {
        AggregationMethod::MaxConfidence => {
            let best = atoms.iter().skip(1).fold(first, |best, atom| {
                if atom.confidence > best.confidence {
                    atom
                } else {
                    best
                }
            });
            Ok(best.clone())
        }
        AggregationMethod::DempsterShafer => {
            let belief: f64 = atoms
                .iter()
                .map(|a| values_of(a).get("belief").copied().unwrap_or(a.confidence))
                .product();
            let plausibility: f64 = atoms
                .iter()
                .map(|a| values_of(a).get("plausibility").copied().unwrap_or(1.0))
                .product();
            Ok(attach(
                result,
                UncertaintyModel::DempsterShafer,
                values([("belief", belief), ("plausibility", plausibility)]),
            ))
        }
        AggregationMethod::WeightedAverage => {
            let total_weight: f64 = atoms.iter().map(|a| a.confidence).sum();
            if total_weight <= 0.0 {
                return aggregate(atoms, AggregationMethod::Average);
            }
            let combined = combine_values(atoms, true);
            let confidence =
                atoms.iter().map(|a| a.confidence * a.confidence).sum::<f64>() / total_weight;
            Ok(finish(result, combined, confidence))
        }
        AggregationMethod::Average => {
            let combined = combine_values(atoms, false);
            let confidence = atoms.iter().map(|a| a.confidence).sum::<f64>() / atoms.len() as f64;
            Ok(finish(result, combined, confidence))
        }
    }
}

/// Whether two atoms agree under their uncertainty models.
///
/// Without a model on either side this is plain content equality.
pub fn agree(a: &BeliefAtom, b: &BeliefAtom, threshold: f64) -> bool {
    let (Some(model_a), Some(model_b)) = (model_of(a), model_of(b)) else {
        return a.content == b.content;
    };
    if a.content != b.content {
        return false;
    }

    let tolerance = 1.0 - threshold;
    let (values_a, values_b) = (values_of(a), values_of(b));
    let value = |vals: &BTreeMap<String, f64>, key: &str| {
        vals.get(key).copied().unwrap_or(DEFAULT_CONFIDENCE)
    };

    match (model_a, model_b) {
        (UncertaintyModel::Probabilistic, UncertaintyModel::Probabilistic) => {
            (value(&values_a, "probability") - value(&values_b, "probability")).abs() < tolerance
        }
        (UncertaintyModel::Fuzzy, UncertaintyModel::Fuzzy) => {
            (value(&values_a, "membership") - value(&values_b, "membership")).abs() < tolerance
        }
        (UncertaintyModel::DempsterShafer, UncertaintyModel::DempsterShafer) => {
            let interval_a = (value(&values_a, "belief"), value(&values_a, "plausibility"));
            let interval_b = (value(&values_b, "belief"), value(&values_b, "plausibility"));
            interval_overlap(interval_a, interval_b) >= threshold
        }
        _ => (a.confidence - b.confidence).abs() < tolerance,
    }
}

/// Overlap of two `[belief, plausibility]` intervals relative to their span.
fn interval_overlap((lo_a, hi_a): (f64, f64), (lo_b, hi_b): (f64, f64)) -> f64 {
    let overlap = (hi_a.min(hi_b) - lo_a.max(lo_b)).max(0.0);
    let span = hi_a.max(hi_b) - lo_a.min(lo_b);
    if span <= 0.0 {
        // Two identical points.
        return 1.0;
    }
    overlap / span
}

fn combine_values(atoms: &[BeliefAtom], weighted: bool) -> BTreeMap<String, f64> {
    let mut sums: BTreeMap<String, (f64, f64, f64, usize)> = BTreeMap::new();
    for atom in atoms {
        for (key, v) in values_of(atom) {
            let entry = sums.entry(key).or_insert((0.0, 0.0, 0.0, 0));
            entry.0 += atom.confidence * v;
            entry.1 += atom.confidence;
            entry.2 += v;
            entry.3 += 1;
        }
    }

    sums.into_iter()
        .map(|(key, (weighted_sum, weight, plain_sum, count))| {
            let mean = if weighted && weight > 0.0 {
                weighted_sum / weight
            } else {
                plain_sum / count as f64
            };
            (key, mean)
        })
        .collect()
}

fn finish(result: BeliefAtom, combined: BTreeMap<String, f64>, confidence: f64) -> BeliefAtom {
    match model_of(&result) {
        Some(model) if combined.contains_key(model.confidence_key()) => {
            attach(result, model, combined)
        }
        _ => BeliefAtom {
            confidence,
            ..result
        },
    }
}

fn values<const N: usize>(pairs: [(&str, f64); N]) -> BTreeMap<String, f64> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}
