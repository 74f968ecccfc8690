use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::features::{FEATURE_COUNT, FEATURE_NAMES};
use crate::model::{ModelTrainer, PositionModel};

const MIN_GAIN: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 300,
            max_depth: None,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn predict(&self, x: &[f64; FEATURE_COUNT]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    trees: Vec<Tree>,
    importances: [f64; FEATURE_COUNT],
}

impl RandomForest {
    pub fn fit(x: &[[f64; FEATURE_COUNT]], y: &[f64], params: ForestParams) -> Result<Self> {
        if x.is_empty() || x.len() != y.len() {
            return Err(PipelineError::EmptyTrainingSet);
        }
        let n_trees = params.n_trees.max(1);
        let min_leaf = params.min_samples_leaf.max(1);

        let grown = (0..n_trees)
            .into_par_iter()
            .map(|t| {
                // Per-tree seed keeps the fit independent of rayon scheduling.
                let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(t as u64));
                let sample = (0..x.len())
                    .map(|_| rng.gen_range(0..x.len()))
                    .collect::<Vec<_>>();
                grow_tree(x, y, sample, params.max_depth, min_leaf)
            })
            .collect::<Vec<_>>();

        let mut importances = [0.0; FEATURE_COUNT];
        let mut trees = Vec::with_capacity(grown.len());
        for (tree, gains) in grown {
            for (total, gain) in importances.iter_mut().zip(gains) {
                *total += gain;
            }
            trees.push(tree);
        }
        let sum = importances.iter().sum::<f64>();
        if sum > 0.0 {
            for v in &mut importances {
                *v /= sum;
            }
        }

        info!(trees = trees.len(), rows = x.len(), "fitted random forest");
        Ok(Self {
            params,
            trees,
            importances,
        })
    }

    pub fn params(&self) -> ForestParams {
        self.params
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Normalized impurity decrease; all zero when no tree split.
    pub fn feature_importances(&self) -> Vec<(&'static str, f64)> {
        FEATURE_NAMES
            .iter()
            .copied()
            .zip(self.importances)
            .collect()
    }
}

impl PositionModel for RandomForest {
    fn predict_raw(&self, features: &[f64; FEATURE_COUNT]) -> f64 {
        if self.trees.is_empty() {
            return f64::NAN;
        }
        self.trees.iter().map(|t| t.predict(features)).sum::<f64>() / self.trees.len() as f64
    }
}

impl ModelTrainer for ForestParams {
    type Model = RandomForest;

    fn fit(&self, x: &[[f64; FEATURE_COUNT]], y: &[f64]) -> Result<RandomForest> {
        RandomForest::fit(x, y, *self)
    }
}

struct Pending {
    node: usize,
    indices: Vec<usize>,
    depth: usize,
}

struct SplitChoice {
    feature: usize,
    threshold: f64,
    gain: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

fn grow_tree(
    x: &[[f64; FEATURE_COUNT]],
    y: &[f64],
    sample: Vec<usize>,
    max_depth: Option<usize>,
    min_leaf: usize,
) -> (Tree, [f64; FEATURE_COUNT]) {
    let mut nodes = vec![Node::Leaf { value: 0.0 }];
    let mut gains = [0.0; FEATURE_COUNT];
    let mut stack = vec![Pending {
        node: 0,
        indices: sample,
        depth: 0,
    }];

    while let Some(pending) = stack.pop() {
        let can_split = max_depth.is_none_or(|d| pending.depth < d)
            && pending.indices.len() >= 2 * min_leaf;
        let split = if can_split {
            best_split(x, y, &pending.indices, min_leaf)
        } else {
            None
        };

        match split {
            Some(split) => {
                let left = nodes.len();
                let right = left + 1;
                nodes.push(Node::Leaf { value: 0.0 });
                nodes.push(Node::Leaf { value: 0.0 });
                nodes[pending.node] = Node::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left,
                    right,
                };
                gains[split.feature] += split.gain;
                stack.push(Pending {
                    node: right,
                    indices: split.right,
                    depth: pending.depth + 1,
                });
                stack.push(Pending {
                    node: left,
                    indices: split.left,
                    depth: pending.depth + 1,
                });
            }
            None => {
                nodes[pending.node] = Node::Leaf {
                    value: mean_of(y, &pending.indices),
                };
            }
        }
    }

    (Tree { nodes }, gains)
}

fn best_split(
    x: &[[f64; FEATURE_COUNT]],
    y: &[f64],
    indices: &[usize],
    min_leaf: usize,
) -> Option<SplitChoice> {
    let n = indices.len();
    let total_sum = indices.iter().map(|&i| y[i]).sum::<f64>();
    let total_sq = indices.iter().map(|&i| y[i] * y[i]).sum::<f64>();
    let parent_sse = total_sq - total_sum * total_sum / n as f64;
    if parent_sse <= MIN_GAIN {
        return None;
    }

    // (feature, split position in sorted order, sse, sorted indices)
    let mut best: Option<(usize, usize, f64, Vec<usize>)> = None;
    for feature in 0..FEATURE_COUNT {
        let mut sorted = indices.to_vec();
        sorted.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        let mut best_here: Option<(usize, f64)> = None;
        for pos in 1..n {
            let yi = y[sorted[pos - 1]];
            left_sum += yi;
            left_sq += yi * yi;
            if pos < min_leaf || n - pos < min_leaf {
                continue;
            }
            if x[sorted[pos - 1]][feature] >= x[sorted[pos]][feature] {
                continue;
            }
            let nl = pos as f64;
            let nr = (n - pos) as f64;
            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / nl) + (right_sq - right_sum * right_sum / nr);
            if best_here.is_none_or(|(_, s)| sse < s) {
                best_here = Some((pos, sse));
            }
        }

        if let Some((pos, sse)) = best_here
            && best.as_ref().is_none_or(|(_, _, s, _)| sse < *s)
        {
            best = Some((feature, pos, sse, sorted));
        }
    }

    let (feature, pos, sse, mut sorted) = best?;
    let gain = parent_sse - sse;
    if gain <= MIN_GAIN {
        return None;
    }
    let lo = x[sorted[pos - 1]][feature];
    let hi = x[sorted[pos]][feature];
    let mid = lo + (hi - lo) / 2.0;
    let threshold = if mid < hi { mid } else { lo };
    let right = sorted.split_off(pos);
    Some(SplitChoice {
        feature,
        threshold,
        gain,
        left: sorted,
        right,
    })
}

fn mean_of(y: &[f64], indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64
}

#[cfg(test)]
mod tests {
    use super::{ForestParams, RandomForest};
    use crate::model::PositionModel;

    fn params(n_trees: usize) -> ForestParams {
        ForestParams {
            n_trees,
            ..Default::default()
        }
    }

    #[test]
    fn constant_target_predicts_constant() {
        let x = vec![[2010.0, 3.0, 4.0, 8.0], [2011.0, 5.0, 6.0, 9.0]];
        let y = vec![7.0, 7.0];
        let forest = RandomForest::fit(&x, &y, params(10)).expect("fit");
        assert!((forest.predict_raw(&[2012.0, 1.0, 1.0, 1.0]) - 7.0).abs() < 1e-9);
        assert!(forest.feature_importances().iter().all(|(_, v)| *v == 0.0));
    }

    #[test]
    fn separable_data_is_learned() {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..40 {
            let driver_perf = if i % 2 == 0 { 2.0 } else { 15.0 };
            x.push([2000.0 + (i % 5) as f64, driver_perf, 8.0, 10.0]);
            y.push(if i % 2 == 0 { 1.0 } else { 16.0 });
        }
        let forest = RandomForest::fit(&x, &y, params(25)).expect("fit");
        assert!(forest.predict_raw(&[2002.0, 2.0, 8.0, 10.0]) < 4.0);
        assert!(forest.predict_raw(&[2002.0, 15.0, 8.0, 10.0]) > 13.0);

        let importances = forest.feature_importances();
        let driver = importances
            .iter()
            .find(|(name, _)| *name == "driver_perf")
            .map(|(_, v)| *v)
            .expect("driver_perf present");
        assert!(driver > 0.9);
    }

    #[test]
    fn same_seed_same_forest() {
        let x = (0..30)
            .map(|i| [2000.0 + i as f64, (i % 7) as f64, (i % 3) as f64, (i % 5) as f64])
            .collect::<Vec<_>>();
        let y = (0..30).map(|i| ((i * 7) % 20 + 1) as f64).collect::<Vec<_>>();
        let a = RandomForest::fit(&x, &y, params(12)).expect("fit a");
        let b = RandomForest::fit(&x, &y, params(12)).expect("fit b");
        let point = [2010.0, 3.0, 1.0, 2.0];
        assert_eq!(a.predict_raw(&point), b.predict_raw(&point));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(RandomForest::fit(&[], &[], params(3)).is_err());
    }
}
