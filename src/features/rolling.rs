//! Rolling-window means over game sequences

use std::collections::VecDeque;

/// Fixed-size window of recent values with a running mean
#[derive(Debug, Clone)]
pub struct RollingWindow {
    size: usize,
    values: VecDeque<f64>,
}

impl RollingWindow {
    pub fn new(size: usize) -> Self {
        RollingWindow {
            size,
            values: VecDeque::with_capacity(size),
        }
    }

    /// Push a value, evicting the oldest once the window is full
    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.size {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.size
    }

    /// Mean of the window, `None` until it holds `size` values.
    /// A NaN inside the window makes the mean NaN.
    pub fn mean(&self) -> Option<f64> {
        if !self.is_full() || self.size == 0 {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.size as f64)
    }
}

/// Mean of the `window` values strictly before each position.
///
/// Entry i holds the mean of `values[i - window..i]`, or `None` when fewer
/// than `window` earlier values exist, so the value at i never contributes
/// to its own entry. The output has one more entry than the input: the last
/// one describes the position after the final value.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut rolling = RollingWindow::new(window);
    let mut out = Vec::with_capacity(values.len() + 1);
    for &value in values {
        out.push(rolling.mean());
        rolling.push(value);
    }
    out.push(rolling.mean());
    out
}
