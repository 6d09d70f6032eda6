//! 由混淆矩阵派生的分割指标.
//!
//! 约定 `A` 为参考 (真值), `B` 为预测, 并且
//!
//! - TP = A ∧ B
//! - FP = A ∧ ¬B
//! - TN = ¬A ∧ ¬B
//! - FN = ¬A ∧ B
//!
//! 任一指标的分母为 0 时, 该指标取 1.

use crate::{PipelineError, PipelineResult};
use itertools::Itertools;
use ndarray::{ArrayView, Dimension, Zip};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 指标名称.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MetricKind {
    /// `2TP / (2TP + FP + FN)`.
    Dice,

    /// `(TP + TN) / total`.
    Accuracy,

    /// `TP / (TP + FN)`.
    Sensitivity,

    /// `TN / (TN + FP)`.
    Specificity,

    /// `TP / (TP + FP)`.
    Precision,
}

impl MetricKind {
    /// 全部指标, 按报告顺序排列.
    pub const ALL: [Self; 5] = [
        Self::Dice,
        Self::Accuracy,
        Self::Sensitivity,
        Self::Specificity,
        Self::Precision,
    ];

    /// 指标名.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Dice => "Dice",
            Self::Accuracy => "Accuracy",
            Self::Sensitivity => "Sensitivity",
            Self::Specificity => "Specificity",
            Self::Precision => "Precision",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 混淆矩阵计数.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Confusion {
    /// 真阳性.
    pub tp: usize,

    /// 假阳性.
    pub fp: usize,

    /// 真阴性.
    pub tn: usize,

    /// 假阴性.
    pub fn_: usize,
}

impl Confusion {
    /// 统计两个同形状布尔数组的混淆矩阵.
    pub fn count<D: Dimension>(a: ArrayView<bool, D>, b: ArrayView<bool, D>) -> PipelineResult<Self> {
        if a.shape() != b.shape() {
            return Err(PipelineError::shape_mismatch(
                "参考与预测形状不一致",
                a.shape(),
                b.shape(),
            ));
        }
        let mut c = Self::default();
        Zip::from(&a).and(&b).for_each(|&a, &b| match (a, b) {
            (true, true) => c.tp += 1,
            (true, false) => c.fp += 1,
            (false, false) => c.tn += 1,
            (false, true) => c.fn_ += 1,
        });
        Ok(c)
    }

    /// 派生全部指标.
    pub fn metrics(&self) -> Metrics {
        fn ratio(num: usize, den: usize) -> f64 {
            if den == 0 {
                1.0
            } else {
                num as f64 / den as f64
            }
        }
        let Self { tp, fp, tn, fn_ } = *self;
        Metrics {
            dice: ratio(2 * tp, 2 * tp + fp + fn_),
            accuracy: ratio(tp + tn, tp + tn + fp + fn_),
            sensitivity: ratio(tp, tp + fn_),
            specificity: ratio(tn, tn + fp),
            precision: ratio(tp, tp + fp),
        }
    }
}

/// 一次比较得到的全部指标.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Metrics {
    /// Dice 系数.
    pub dice: f64,

    /// 准确率.
    pub accuracy: f64,

    /// 敏感度.
    pub sensitivity: f64,

    /// 特异度.
    pub specificity: f64,

    /// 精确率.
    pub precision: f64,
}

impl Metrics {
    /// 按名称取值.
    pub fn get(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::Dice => self.dice,
            MetricKind::Accuracy => self.accuracy,
            MetricKind::Sensitivity => self.sensitivity,
            MetricKind::Specificity => self.specificity,
            MetricKind::Precision => self.precision,
        }
    }

    /// 由逐项取值构建.
    pub fn from_fn<F: FnMut(MetricKind) -> f64>(mut f: F) -> Self {
        Self {
            dice: f(MetricKind::Dice),
            accuracy: f(MetricKind::Accuracy),
            sensitivity: f(MetricKind::Sensitivity),
            specificity: f(MetricKind::Specificity),
            precision: f(MetricKind::Precision),
        }
    }

    /// 按报告顺序遍历 `(名称, 取值)`.
    pub fn iter(&self) -> impl Iterator<Item = (MetricKind, f64)> + '_ {
        MetricKind::ALL.into_iter().map(|k| (k, self.get(k)))
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items = self
            .iter()
            .map(|(kind, value)| format!("{kind}: {value:.4}"))
            .join(", ");
        write!(f, "{{{items}}}")
    }
}

/// 比较两个布尔数组.
#[inline]
pub fn calc_metrics<D: Dimension>(a: ArrayView<bool, D>, b: ArrayView<bool, D>) -> PipelineResult<Metrics> {
    Ok(Confusion::count(a, b)?.metrics())
}

/// 比较两个类别图, 非零值视作前景.
pub fn label_metrics<D: Dimension>(a: ArrayView<u8, D>, b: ArrayView<u8, D>) -> PipelineResult<Metrics> {
    calc_metrics(a.mapv(|v| v != 0).view(), b.mapv(|v| v != 0).view())
}

/// 对每个前景类 `1..n_class` 分别做 "该类 vs 其它" 的比较.
pub fn per_class_metrics<D: Dimension>(
    a: ArrayView<u8, D>,
    b: ArrayView<u8, D>,
    n_class: usize,
) -> PipelineResult<Vec<Metrics>> {
    (1..n_class)
        .map(|c| {
            let c = c as u8;
            calc_metrics(a.mapv(|v| v == c).view(), b.mapv(|v| v == c).view())
        })
        .collect()
}
