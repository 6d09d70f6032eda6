//! 预测结果的离散化、指标计算、3D 重组与汇总.

mod aggregate;
mod metrics;
pub mod preview;
mod stack;
mod threshold;

pub use aggregate::MetricSummary;
pub use metrics::{calc_metrics, label_metrics, per_class_metrics, Confusion, MetricKind, Metrics};
pub use stack::{collect_slices, read_label_map, stack_subject, write_stacks};
pub use threshold::ClassThresholds;
