//! Seeded, label-stratified splits

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Row indices of a train/test split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Row indices per label value, ascending by label
fn by_class(labels: &[u8]) -> Vec<Vec<usize>> {
    let mut classes: Vec<u8> = labels.to_vec();
    classes.sort_unstable();
    classes.dedup();
    classes
        .iter()
        .map(|&c| (0..labels.len()).filter(|&i| labels[i] == c).collect())
        .collect()
}

/// Stratified train/test split.
///
/// The test set holds `ceil(test_fraction * n)` rows shared between
/// classes in proportion to their counts (largest remainder). Every class
/// keeps at least one row in the training set. Both index lists are
/// returned in ascending order.
pub fn train_test_split(labels: &[u8], test_fraction: f64, seed: u64) -> Split {
    let n = labels.len();
    let groups = by_class(labels);
    let n_test = ((test_fraction * n as f64).ceil() as usize).min(n);

    // Per-class quotas: floor of the proportional share, then hand the
    // leftover rows to the largest fractional parts.
    let exact: Vec<f64> = groups
        .iter()
        .map(|g| n_test as f64 * g.len() as f64 / n.max(1) as f64)
        .collect();
    let mut quotas: Vec<usize> = exact.iter().map(|q| q.floor() as usize).collect();
    let mut leftover = n_test.saturating_sub(quotas.iter().sum());
    let mut order: Vec<usize> = (0..groups.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = exact[a] - exact[a].floor();
        let fb = exact[b] - exact[b].floor();
        fb.total_cmp(&fa).then(a.cmp(&b))
    });
    for &c in order.iter().cycle().take(order.len() * 2) {
        if leftover == 0 {
            break;
        }
        if quotas[c] < groups[c].len() {
            quotas[c] += 1;
            leftover -= 1;
        }
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut split = Split {
        train: Vec::with_capacity(n - n_test),
        test: Vec::with_capacity(n_test),
    };
    for (group, quota) in groups.iter().zip(quotas) {
        let mut shuffled = group.clone();
        shuffled.shuffle(&mut rng);
        let take = quota.min(group.len().saturating_sub(1));
        split.test.extend_from_slice(&shuffled[..take]);
        split.train.extend_from_slice(&shuffled[take..]);
    }
    split.train.sort_unstable();
    split.test.sort_unstable();
    split
}

/// Stratified k-fold assignment.
///
/// Each class's rows are shuffled, the classes are concatenated and row p
/// of that order goes to fold `p % k`, so every fold gets a near-equal
/// share of each class. Folds never exceed the row count.
#[derive(Debug, Clone)]
pub struct StratifiedKFold {
    folds: Vec<Vec<usize>>,
    n: usize,
}

impl StratifiedKFold {
    pub fn new(labels: &[u8], k: usize, seed: u64) -> Self {
        let n = labels.len();
        let k = k.min(n).max(1);
        let mut rng = StdRng::seed_from_u64(seed);

        let mut ordered = Vec::with_capacity(n);
        for mut group in by_class(labels) {
            group.shuffle(&mut rng);
            ordered.extend(group);
        }

        let mut folds = vec![Vec::new(); k];
        for (p, idx) in ordered.into_iter().enumerate() {
            folds[p % k].push(idx);
        }
        for fold in &mut folds {
            fold.sort_unstable();
        }
        StratifiedKFold { folds, n }
    }

    pub fn k(&self) -> usize {
        self.folds.len()
    }

    /// (train, validation) index lists for every fold
    pub fn splits(&self) -> Vec<Split> {
        self.folds
            .iter()
            .filter(|fold| !fold.is_empty())
            .map(|fold| Split {
                train: (0..self.n).filter(|i| !fold.contains(i)).collect(),
                test: fold.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(neg: usize, pos: usize) -> Vec<u8> {
        let mut l = vec![0; neg];
        l.extend(vec![1; pos]);
        l
    }

    #[test]
    fn test_split_sizes_and_stratification() {
        let y = labels(60, 40);
        let split = train_test_split(&y, 0.2, 42);
        assert_eq!(split.test.len(), 20);
        assert_eq!(split.train.len(), 80);

        let test_pos = split.test.iter().filter(|&&i| y[i] == 1).count();
        assert_eq!(test_pos, 8);
    }

    #[test]
    fn test_split_is_partition_and_seeded() {
        let y = labels(13, 9);
        let a = train_test_split(&y, 0.2, 42);
        let b = train_test_split(&y, 0.2, 42);
        assert_eq!(a, b);

        let mut all: Vec<usize> = a.train.iter().chain(&a.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..22).collect::<Vec<_>>());
        assert_eq!(a.test.len(), 5);
    }

    #[test]
    fn test_rare_class_stays_in_training() {
        let y = labels(9, 1);
        let split = train_test_split(&y, 0.2, 42);
        assert!(split.train.iter().any(|&i| y[i] == 1));
    }

    #[test]
    fn test_kfold_covers_every_row_once() {
        let y = labels(12, 8);
        let kfold = StratifiedKFold::new(&y, 5, 42);
        let splits = kfold.splits();
        assert_eq!(splits.len(), 5);

        let mut seen: Vec<usize> = splits.iter().flat_map(|s| s.test.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..20).collect::<Vec<_>>());

        for s in &splits {
            assert_eq!(s.test.len(), 4);
            assert_eq!(s.train.len(), 16);
            let pos = s.test.iter().filter(|&&i| y[i] == 1).count();
            assert!(pos == 1 || pos == 2);
        }
    }

    #[test]
    fn test_kfold_with_fewer_rows_than_folds() {
        let y = labels(2, 1);
        let kfold = StratifiedKFold::new(&y, 5, 42);
        assert_eq!(kfold.k(), 3);
        assert_eq!(kfold.splits().len(), 3);
    }
}
