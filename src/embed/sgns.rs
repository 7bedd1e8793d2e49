//! Skip-gram with negative sampling
//!
//! Shared trainer for both backends. A word's input representation is the
//! mean of one or more rows of the input matrix: a single row for the
//! closed-vocabulary model, the word row plus its n-gram bucket rows for
//! the subword model. Output rows are per vocabulary word.
//!
//! Seeded from `TrainParams::seed`, so the same corpus and parameters
//! always produce the same matrix.

use super::TrainParams;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const INITIAL_LEARNING_RATE: f32 = 0.025;

/// Learning rate never decays below this fraction of the initial rate
const MIN_LEARNING_RATE_FRACTION: f32 = 1e-4;

/// Unigram distortion for negative sampling
const NEGATIVE_POWER: f64 = 0.75;

const MAX_EXP: f32 = 6.0;

/// Draws negative samples proportionally to count^0.75
struct NegativeSampler {
    cumulative: Vec<f64>,
}

impl NegativeSampler {
    fn new(counts: &[u64]) -> Self {
        let mut total = 0.0;
        let cumulative = counts
            .iter()
            .map(|&c| {
                total += (c as f64).powf(NEGATIVE_POWER);
                total
            })
            .collect();
        Self { cumulative }
    }

    fn sample(&self, rng: &mut ChaCha8Rng) -> u32 {
        let total = self.cumulative.last().copied().unwrap_or(0.0);
        let x = rng.random::<f64>() * total;
        let idx = self.cumulative.partition_point(|&c| c <= x);
        idx.min(self.cumulative.len().saturating_sub(1)) as u32
    }
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    let x = x.clamp(-MAX_EXP, MAX_EXP);
    1.0 / (1.0 + (-x).exp())
}

#[inline]
fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Train the input matrix (`num_input_rows * vector_size`, row-major).
///
/// * `sentences` - vocabulary ids, one sequence per graph
/// * `word_rows` - input rows composing each vocabulary word
/// * `counts` - corpus frequency of each vocabulary word
pub(crate) fn train(
    sentences: &[Vec<u32>],
    word_rows: &[Vec<u32>],
    num_input_rows: usize,
    counts: &[u64],
    params: &TrainParams,
) -> Vec<f32> {
    let dim = params.vector_size;
    let window = params.window.max(1);
    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);

    let mut input: Vec<f32> = (0..num_input_rows * dim)
        .map(|_| (rng.random::<f32>() - 0.5) / dim as f32)
        .collect();
    let mut output = vec![0.0f32; counts.len() * dim];

    if counts.is_empty() {
        return input;
    }

    let sampler = NegativeSampler::new(counts);
    let total_steps = sentences.iter().map(Vec::len).sum::<usize>() * params.epochs;
    let mut step = 0usize;

    let mut hidden = vec![0.0f32; dim];
    let mut grad = vec![0.0f32; dim];

    for _ in 0..params.epochs {
        for sentence in sentences {
            for (pos, &center) in sentence.iter().enumerate() {
                let progress = step as f32 / total_steps.max(1) as f32;
                let lr = (INITIAL_LEARNING_RATE * (1.0 - progress))
                    .max(INITIAL_LEARNING_RATE * MIN_LEARNING_RATE_FRACTION);
                step += 1;

                let rows = &word_rows[center as usize];
                if rows.is_empty() {
                    continue;
                }
                let scale = 1.0 / rows.len() as f32;

                // Dynamic window, as in word2vec
                let reach = rng.random_range(1..=window);
                let start = pos.saturating_sub(reach);
                let end = (pos + reach + 1).min(sentence.len());

                for ctx_pos in start..end {
                    if ctx_pos == pos {
                        continue;
                    }
                    let target = sentence[ctx_pos];

                    hidden.fill(0.0);
                    for &row in rows {
                        let r = &input[row as usize * dim..(row as usize + 1) * dim];
                        for (h, v) in hidden.iter_mut().zip(r) {
                            *h += v * scale;
                        }
                    }
                    grad.fill(0.0);

                    for k in 0..=params.negative {
                        let (word, label) = if k == 0 {
                            (target, 1.0)
                        } else {
                            let word = sampler.sample(&mut rng);
                            if word == target {
                                continue;
                            }
                            (word, 0.0)
                        };

                        let out = &mut output[word as usize * dim..(word as usize + 1) * dim];
                        let g = (label - sigmoid(dot(&hidden, out))) * lr;
                        for ((gd, od), hd) in grad.iter_mut().zip(out.iter_mut()).zip(&hidden) {
                            *gd += g * *od;
                            *od += g * hd;
                        }
                    }

                    for &row in rows {
                        let r = &mut input[row as usize * dim..(row as usize + 1) * dim];
                        for (v, gd) in r.iter_mut().zip(&grad) {
                            *v += gd * scale;
                        }
                    }
                }
            }
        }
    }

    input
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> TrainParams {
        TrainParams {
            vector_size: 8,
            window: 2,
            min_count: 1,
            epochs: 3,
            negative: 2,
            seed: 7,
            buckets: 16,
        }
    }

    #[test]
    fn test_training_is_seeded() {
        let sentences = vec![vec![0, 1, 2, 1, 0], vec![2, 2, 1]];
        let rows: Vec<Vec<u32>> = (0..3).map(|i| vec![i]).collect();
        let counts = [2, 3, 3];

        let a = train(&sentences, &rows, 3, &counts, &params());
        let b = train(&sentences, &rows, 3, &counts, &params());
        assert_eq!(a, b);
        assert_eq!(a.len(), 3 * 8);
        assert!(a.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_different_seed_differs() {
        let sentences = vec![vec![0, 1, 0, 1]];
        let rows: Vec<Vec<u32>> = (0..2).map(|i| vec![i]).collect();
        let mut other = params();
        other.seed = 8;

        let a = train(&sentences, &rows, 2, &[2, 2], &params());
        let b = train(&sentences, &rows, 2, &[2, 2], &other);
        assert_ne!(a, b);
    }

    #[test]
    fn test_sampler_stays_in_range() {
        let sampler = NegativeSampler::new(&[1, 10, 100]);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for _ in 0..1000 {
            assert!(sampler.sample(&mut rng) < 3);
        }
    }
}
