//! 评估结果及其汇总输出.

use crate::eval::{MetricSummary, Metrics};
use crate::naming::SliceKey;
use std::fmt;

/// 单个切片的评估结果.
#[derive(Clone, Debug, PartialEq)]
pub struct SliceScore {
    /// 切片标识.
    pub key: SliceKey,

    /// 前景 (非零) vs 背景的指标.
    pub metrics: Metrics,

    /// 各前景类 `1..n_class` 的 "该类 vs 其它" 指标.
    pub per_class: Vec<Metrics>,
}

/// 一次评估 (或重新打分) 的完整结果.
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationReport {
    /// 类别数 (含背景).
    pub n_class: usize,

    /// 按处理顺序排列的切片结果.
    pub slices: Vec<SliceScore>,

    /// 成功写出 3D 重组结果的受试者.
    pub stacked: Vec<u32>,
}

impl EvaluationReport {
    /// 空结果.
    pub fn new(n_class: usize) -> Self {
        Self {
            n_class,
            slices: Vec::new(),
            stacked: Vec::new(),
        }
    }

    /// 全部切片前景指标的汇总. 没有切片时为 `None`.
    pub fn summary(&self) -> Option<MetricSummary> {
        let records: Vec<Metrics> = self.slices.iter().map(|s| s.metrics).collect();
        MetricSummary::from_records(&records)
    }

    /// 前景类 `class` 的汇总.
    pub fn class_summary(&self, class: usize) -> Option<MetricSummary> {
        let i = class.checked_sub(1)?;
        let records: Vec<Metrics> = self
            .slices
            .iter()
            .filter_map(|s| s.per_class.get(i).copied())
            .collect();
        MetricSummary::from_records(&records)
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=========== Results ===========")?;
        let Some(summary) = self.summary() else {
            return write!(f, "No slices evaluated.");
        };
        writeln!(f, "Slices: {}, stacked subjects: {:?}\n", summary.count, self.stacked)?;
        writeln!(f, "{summary}")?;
        for class in 1..self.n_class {
            if let Some(s) = self.class_summary(class) {
                writeln!(f, "Class {class}:")?;
                writeln!(f, "    mean {}", s.mean)?;
                writeln!(f, "    std  {}", s.std)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(depth: usize, dice: f64) -> SliceScore {
        let m = Metrics::from_fn(|_| dice);
        SliceScore {
            key: SliceKey::new(1, depth),
            metrics: m,
            per_class: vec![m, Metrics::from_fn(|_| 1.0)],
        }
    }

    #[test]
    fn test_summaries() {
        let mut report = EvaluationReport::new(3);
        assert!(report.summary().is_none());
        assert!(report.to_string().contains("No slices evaluated"));

        report.slices = vec![score(0, 0.0), score(1, 1.0)];
        let s = report.summary().unwrap();
        assert_eq!(s.mean.dice, 0.5);
        assert_eq!(report.class_summary(2).unwrap().std.dice, 0.0);
        assert!(report.class_summary(0).is_none());
        assert!(report.class_summary(3).is_none());

        let text = report.to_string();
        assert!(text.starts_with("=========== Results ==========="));
        assert!(text.contains("Means of metrics"));
        assert!(text.contains("Standard deviations of metrics"));
        assert!(text.contains("Class 2:"));
    }
}
