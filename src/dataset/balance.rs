//! Safe/unsafe oversampling within strata
//!
//! Records are grouped by the configured stratification fields. In each
//! group the minority side (safe or unsafe) is topped up with draws with
//! replacement until both sides are the same size. Every stratum owns an RNG
//! seeded from its key, so the drawn subset is identical across runs and
//! independent of the other strata.

use crate::graph::{GraphRecord, Language, RecordMeta};
use indexmap::IndexMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};
use xxhash_rust::xxh3::xxh3_64;

/// Record attribute used to form strata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StratumField {
    Cwe,
    Language,
}

/// Values of the stratification fields for one record; unselected fields
/// stay `None`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StratumKey {
    pub cwe: Option<u32>,
    pub language: Option<Language>,
}

impl StratumKey {
    pub fn of(meta: &RecordMeta, fields: &[StratumField]) -> Self {
        let mut key = StratumKey {
            cwe: None,
            language: None,
        };
        for field in fields {
            match field {
                StratumField::Cwe => key.cwe = meta.cwe,
                StratumField::Language => key.language = meta.language,
            }
        }
        key
    }

    /// Stable RNG seed for this stratum
    pub fn seed(&self) -> u64 {
        xxh3_64(self.to_string().as_bytes())
    }
}

impl fmt::Display for StratumKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cwe = self.cwe.map_or("-".to_string(), |c| c.to_string());
        let language = self.language.map_or("-", |l| l.as_str());
        write!(f, "cwe={cwe} language={language}")
    }
}

/// Outcome of balancing one stratum
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StratumStats {
    pub stratum: String,
    pub safe: usize,
    #[serde(rename = "unsafe")]
    pub unsafe_: usize,
    pub drawn: usize,
}

#[derive(Debug, Clone)]
pub struct ClassBalancer {
    fields: Vec<StratumField>,
}

impl ClassBalancer {
    pub fn new(fields: Vec<StratumField>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[StratumField] {
        &self.fields
    }

    pub fn oversample<L: Clone>(&self, records: Vec<GraphRecord<L>>) -> Vec<GraphRecord<L>> {
        self.oversample_with_stats(records).0
    }

    /// Balance every stratum. Output order is strata in first-appearance
    /// order, each laid out as larger group, smaller group, drawn copies.
    pub fn oversample_with_stats<L: Clone>(
        &self,
        records: Vec<GraphRecord<L>>,
    ) -> (Vec<GraphRecord<L>>, Vec<StratumStats>) {
        let mut strata: IndexMap<StratumKey, (Vec<GraphRecord<L>>, Vec<GraphRecord<L>>)> =
            IndexMap::new();
        for record in records {
            let groups = strata
                .entry(StratumKey::of(&record.meta, &self.fields))
                .or_default();
            if record.is_safe() {
                groups.0.push(record);
            } else {
                groups.1.push(record);
            }
        }

        let mut out = Vec::new();
        let mut stats = Vec::with_capacity(strata.len());

        for (key, (safe, unsafe_)) in strata {
            let (num_safe, num_unsafe) = (safe.len(), unsafe_.len());
            let (larger, smaller) = if safe.len() < unsafe_.len() {
                (unsafe_, safe)
            } else {
                (safe, unsafe_)
            };
            let needed = larger.len() - smaller.len();

            let drawn = if needed == 0 {
                Vec::new()
            } else if smaller.is_empty() {
                warn!(
                    "Stratum {} has no {} samples to oversample from",
                    key,
                    if num_safe == 0 { "safe" } else { "unsafe" }
                );
                Vec::new()
            } else {
                let mut rng = ChaCha8Rng::seed_from_u64(key.seed());
                (0..needed)
                    .map(|_| smaller[rng.random_range(0..smaller.len())].clone())
                    .collect()
            };

            debug!(
                "Stratum {}: {} safe, {} unsafe, {} drawn",
                key,
                num_safe,
                num_unsafe,
                drawn.len()
            );
            stats.push(StratumStats {
                stratum: key.to_string(),
                safe: num_safe,
                unsafe_: num_unsafe,
                drawn: drawn.len(),
            });

            out.extend(larger);
            out.extend(smaller);
            out.extend(drawn);
        }

        (out, stats)
    }
}

impl Default for ClassBalancer {
    fn default() -> Self {
        Self::new(vec![StratumField::Cwe, StratumField::Language])
    }
}
