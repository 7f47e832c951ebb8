//! Regression trees fitted on gradient statistics
//!
//! Each tree is grown depth-first on per-row gradients and hessians of the
//! boosting loss. Splits maximise the second-order gain
//! `G_L²/(H_L+λ) + G_R²/(H_R+λ) - G²/(H+λ)` and leaves hold `-G/(H+λ)`.

use serde::{Deserialize, Serialize};

/// Growth limits and regularisation for one tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: usize,
    /// L2 penalty on leaf values
    pub lambda: f64,
    /// Minimum hessian sum on each side of a split
    pub min_child_weight: f64,
}

impl Default for TreeParams {
    fn default() -> Self {
        TreeParams {
            max_depth: 3,
            lambda: 1.0,
            min_child_weight: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Rows with `feature < threshold` go left
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf { value: f64 },
}

/// Arena-allocated binary tree; node 0 is the root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Shared inputs while growing one tree
struct Grower<'a> {
    rows: &'a [Vec<f64>],
    grad: &'a [f64],
    hess: &'a [f64],
    params: TreeParams,
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Grow a tree over `indices` of `rows`
    pub fn fit(
        rows: &[Vec<f64>],
        grad: &[f64],
        hess: &[f64],
        indices: &[usize],
        params: TreeParams,
    ) -> Self {
        let mut grower = Grower {
            rows,
            grad,
            hess,
            params,
            nodes: Vec::new(),
        };
        grower.grow(indices.to_vec(), 0);
        RegressionTree { nodes: grower.nodes }
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
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
                    // NaN compares false and follows the right branch
                    idx = if row[*feature] < *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Multiply every leaf value by `factor`
    pub fn scale(&mut self, factor: f64) {
        for node in &mut self.nodes {
            if let Node::Leaf { value } = node {
                *value *= factor;
            }
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }
}

impl<'a> Grower<'a> {
    /// Append the subtree for `indices` and return its node index
    fn grow(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let (g, h) = self.sums(&indices);
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: leaf_value(g, h, self.params.lambda),
        });

        if depth >= self.params.max_depth || indices.len() < 2 {
            return id;
        }
        let Some(split) = self.best_split(&indices, g, h) else {
            return id;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.rows[i][split.feature] < split.threshold);

        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }

    fn sums(&self, indices: &[usize]) -> (f64, f64) {
        indices
            .iter()
            .fold((0.0, 0.0), |(g, h), &i| (g + self.grad[i], h + self.hess[i]))
    }

    /// Highest-gain split; ties keep the lowest feature, then the lowest threshold
    fn best_split(&self, indices: &[usize], g: f64, h: f64) -> Option<BestSplit> {
        let lambda = self.params.lambda;
        let min_child = self.params.min_child_weight;
        let parent = score(g, h, lambda);
        let n_features = self.rows.first().map_or(0, |r| r.len());

        let mut best: Option<BestSplit> = None;
        let mut order = indices.to_vec();

        for feature in 0..n_features {
            order.sort_by(|&a, &b| self.rows[a][feature].total_cmp(&self.rows[b][feature]));

            let (mut gl, mut hl) = (0.0, 0.0);
            for pos in 0..order.len() - 1 {
                let i = order[pos];
                gl += self.grad[i];
                hl += self.hess[i];

                let value = self.rows[i][feature];
                let next = self.rows[order[pos + 1]][feature];
                if next <= value {
                    continue;
                }
                let (gr, hr) = (g - gl, h - hl);
                if hl < min_child || hr < min_child {
                    continue;
                }

                let gain = score(gl, hl, lambda) + score(gr, hr, lambda) - parent;
                if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(BestSplit {
                        feature,
                        threshold: value + (next - value) / 2.0,
                        gain,
                    });
                }
            }
        }
        best
    }
}

fn score(g: f64, h: f64, lambda: f64) -> f64 {
    g * g / (h + lambda)
}

fn leaf_value(g: f64, h: f64, lambda: f64) -> f64 {
    -g / (h + lambda)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(max_depth: usize) -> TreeParams {
        TreeParams {
            max_depth,
            lambda: 1.0,
            min_child_weight: 0.0,
        }
    }

    #[test]
    fn test_single_split_separates_gradients() {
        let rows: Vec<Vec<f64>> = (0..8).map(|i| vec![i as f64]).collect();
        let grad: Vec<f64> = (0..8).map(|i| if i < 4 { 1.0 } else { -1.0 }).collect();
        let hess = vec![1.0; 8];
        let indices: Vec<usize> = (0..8).collect();

        let tree = RegressionTree::fit(&rows, &grad, &hess, &indices, params(1));
        assert_eq!(tree.depth(), 1);
        match &tree.nodes()[0] {
            Node::Split { feature, threshold, .. } => {
                assert_eq!(*feature, 0);
                assert_eq!(*threshold, 3.5);
            }
            other => panic!("expected split, got {:?}", other),
        }
        // Leaf = -G/(H+λ) = -4/5 on the left
        assert!((tree.predict(&[0.0]) + 0.8).abs() < 1e-12);
        assert!((tree.predict(&[7.0]) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_depth_zero_is_single_leaf() {
        let rows = vec![vec![1.0], vec![2.0]];
        let tree = RegressionTree::fit(&rows, &[1.0, -1.0], &[1.0, 1.0], &[0, 1], params(0));
        assert_eq!(tree.n_leaves(), 1);
        assert_eq!(tree.predict(&[1.0]), 0.0);
    }

    #[test]
    fn test_constant_feature_never_splits() {
        let rows = vec![vec![5.0]; 6];
        let grad = vec![1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
        let tree = RegressionTree::fit(&rows, &grad, &[1.0; 6], &[0, 1, 2, 3, 4, 5], params(3));
        assert_eq!(tree.n_leaves(), 1);
    }

    #[test]
    fn test_min_child_weight_blocks_small_children() {
        let rows: Vec<Vec<f64>> = (0..4).map(|i| vec![i as f64]).collect();
        let grad = vec![5.0, -1.0, -1.0, -1.0];
        let p = TreeParams {
            max_depth: 2,
            lambda: 1.0,
            min_child_weight: 2.0,
        };
        let tree = RegressionTree::fit(&rows, &grad, &[1.0; 4], &[0, 1, 2, 3], p);
        // Only the 2/2 split satisfies the hessian minimum
        match &tree.nodes()[0] {
            Node::Split { threshold, .. } => assert_eq!(*threshold, 1.5),
            other => panic!("expected split, got {:?}", other),
        }
    }

    #[test]
    fn test_scale_multiplies_leaves() {
        let rows = vec![vec![0.0], vec![1.0]];
        let mut tree = RegressionTree::fit(&rows, &[2.0, 2.0], &[1.0, 1.0], &[0, 1], params(0));
        let before = tree.predict(&[0.0]);
        tree.scale(0.1);
        assert!((tree.predict(&[0.0]) - before * 0.1).abs() < 1e-12);
    }
}
