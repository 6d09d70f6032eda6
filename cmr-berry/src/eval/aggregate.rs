//! 指标的均值与标准差.

use super::metrics::Metrics;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 多个切片指标的均值与总体标准差.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetricSummary {
    /// 参与汇总的记录个数.
    pub count: usize,

    /// 各指标的算术平均.
    pub mean: Metrics,

    /// 各指标的总体标准差 (除以 `n`).
    pub std: Metrics,
}

impl MetricSummary {
    /// 汇总 `records`. 没有记录时返回 `None`.
    pub fn from_records(records: &[Metrics]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }
        let n = records.len() as f64;
        let mean = Metrics::from_fn(|k| records.iter().map(|m| m.get(k)).sum::<f64>() / n);
        let std = Metrics::from_fn(|k| {
            let mu = mean.get(k);
            let var = records
                .iter()
                .map(|m| (m.get(k) - mu).powi(2))
                .sum::<f64>()
                / n;
            var.sqrt()
        });
        Some(Self {
            count: records.len(),
            mean,
            std,
        })
    }
}

impl fmt::Display for MetricSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Means of metrics: \n{}\n", self.mean)?;
        write!(f, "Standard deviations of metrics: \n{}\n", self.std)
    }
}
