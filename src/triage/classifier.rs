//! Trainable statistical classifier: TF-IDF vectorizer + softmax regression.
//!
//! The vectorizer and the linear model are fitted together and live together
//! in [`ClassifierState`] — a state is never partially trained. Prediction is
//! a pure function of the state and the input text; fitting is deterministic
//! given the sample order (zero-initialized weights, fixed epoch count,
//! full-batch gradients).

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ClassifierError;
use crate::triage::types::PriorityTier;

/// Gradient-descent epochs per fit.
const EPOCHS: usize = 300;

/// Gradient-descent step size.
const LEARNING_RATE: f32 = 0.5;

/// Shortest token the vectorizer keeps.
const MIN_TOKEN_LEN: usize = 2;

// ── Vectorizer ──────────────────────────────────────────────────────

/// TF-IDF vectorizer with a vocabulary learned at fit time.
///
/// Tokens unseen at fit time are ignored at transform time. Rows are
/// L2-normalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f32>,
}

impl TfidfVectorizer {
    /// Learn vocabulary (first-seen order) and smoothed IDF from the corpus.
    fn fit(texts: &[String]) -> Self {
        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        let mut df: Vec<usize> = Vec::new();

        for text in texts {
            let mut seen_in_doc: HashSet<usize> = HashSet::new();
            for token in tokenize(text) {
                let next = vocabulary.len();
                let idx = *vocabulary.entry(token).or_insert(next);
                if idx == df.len() {
                    df.push(0);
                }
                if seen_in_doc.insert(idx) {
                    df[idx] += 1;
                }
            }
        }

        let n = texts.len() as f32;
        let idf = df
            .iter()
            .map(|&d| ((1.0 + n) / (1.0 + d as f32)).ln() + 1.0)
            .collect();

        Self { vocabulary, idf }
    }

    /// Map a text into the learned TF-IDF space.
    pub fn transform(&self, text: &str) -> Vec<f32> {
        let mut row = vec![0.0f32; self.vocabulary.len()];
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return row;
        }

        let total = tokens.len() as f32;
        let mut tf: HashMap<usize, f32> = HashMap::new();
        for token in &tokens {
            if let Some(&idx) = self.vocabulary.get(token.as_str()) {
                *tf.entry(idx).or_default() += 1.0;
            }
        }
        for (idx, count) in tf {
            row[idx] = (count / total) * self.idf[idx];
        }

        let norm: f32 = row.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut row {
                *v /= norm;
            }
        }
        row
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }
}

/// Lowercase alphanumeric tokens of at least `MIN_TOKEN_LEN` chars.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|s| s.len() >= MIN_TOKEN_LEN)
        .map(|s| s.to_lowercase())
        .collect()
}

// ── Linear model ────────────────────────────────────────────────────

/// Multinomial logistic regression over the TF-IDF space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftmaxModel {
    /// Class labels in fit order; row `i` of `weights` scores `classes[i]`.
    classes: Vec<PriorityTier>,
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
}

impl SoftmaxModel {
    /// Fit by full-batch gradient descent from zero weights.
    fn fit(rows: &[Vec<f32>], labels: &[PriorityTier], dims: usize) -> Self {
        let mut classes: Vec<PriorityTier> = Vec::new();
        for label in labels {
            if !classes.contains(label) {
                classes.push(*label);
            }
        }
        let k = classes.len();
        let targets: Vec<usize> = labels
            .iter()
            .map(|l| classes.iter().position(|c| c == l).unwrap())
            .collect();

        let mut weights = vec![vec![0.0f32; dims]; k];
        let mut bias = vec![0.0f32; k];
        let n = rows.len() as f32;

        for _ in 0..EPOCHS {
            let mut grad_w = vec![vec![0.0f32; dims]; k];
            let mut grad_b = vec![0.0f32; k];

            for (row, &target) in rows.iter().zip(&targets) {
                let probs = softmax(&scores(&weights, &bias, row));
                for c in 0..k {
                    let err = probs[c] - if c == target { 1.0 } else { 0.0 };
                    grad_b[c] += err;
                    for (g, x) in grad_w[c].iter_mut().zip(row) {
                        *g += err * x;
                    }
                }
            }

            for c in 0..k {
                bias[c] -= LEARNING_RATE * grad_b[c] / n;
                for (w, g) in weights[c].iter_mut().zip(&grad_w[c]) {
                    *w -= LEARNING_RATE * g / n;
                }
            }
        }

        Self {
            classes,
            weights,
            bias,
        }
    }

    /// Argmax class for a vectorized input. Ties break toward the
    /// earliest-fitted class.
    fn predict(&self, row: &[f32]) -> PriorityTier {
        let class_scores = scores(&self.weights, &self.bias, row);
        let mut best = 0;
        for (i, score) in class_scores.iter().enumerate().skip(1) {
            if *score > class_scores[best] {
                best = i;
            }
        }
        self.classes[best]
    }
}

fn scores(weights: &[Vec<f32>], bias: &[f32], row: &[f32]) -> Vec<f32> {
    weights
        .iter()
        .zip(bias)
        .map(|(w, b)| w.iter().zip(row).map(|(wi, xi)| wi * xi).sum::<f32>() + b)
        .collect()
}

fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

// ── Fitted state ────────────────────────────────────────────────────

/// Fitted vectorizer + classifier pair. Both halves are always present and
/// consistent; replaced wholesale on retrain, never merged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierState {
    vectorizer: TfidfVectorizer,
    model: SoftmaxModel,
}

/// Fit a fresh state from parallel texts and labels.
///
/// Requires at least one sample and at least one text that yields a token.
/// The caller is responsible for dropping invalid labels beforehand.
pub fn fit(texts: &[String], labels: &[PriorityTier]) -> Result<ClassifierState, ClassifierError> {
    if texts.is_empty() || texts.len() != labels.len() {
        return Err(ClassifierError::Training(format!(
            "need parallel non-empty texts and labels, got {} texts and {} labels",
            texts.len(),
            labels.len()
        )));
    }

    let vectorizer = TfidfVectorizer::fit(texts);
    if vectorizer.vocabulary_len() == 0 {
        return Err(ClassifierError::Training(
            "no usable tokens in any sample".into(),
        ));
    }

    let rows: Vec<Vec<f32>> = texts.iter().map(|t| vectorizer.transform(t)).collect();
    let model = SoftmaxModel::fit(&rows, labels, vectorizer.vocabulary_len());

    Ok(ClassifierState { vectorizer, model })
}

/// Predict the tier for a text against a fitted state.
///
/// Deterministic given identical state and input; a text with no
/// in-vocabulary token falls back to the bias-only argmax.
pub fn predict(text: &str, state: &ClassifierState) -> PriorityTier {
    state.model.predict(&state.vectorizer.transform(text))
}
