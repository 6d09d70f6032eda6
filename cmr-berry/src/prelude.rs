//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx3d};

pub use crate::data::{MriData3d, MriLabel, MriScan, NiftiHeaderAttr};
pub use crate::{PipelineError, PipelineResult};

pub use crate::config::PipelineConfig;
pub use crate::consts::{DEFAULT_N_CLASS, DEFAULT_RESIZE, DEFAULT_SAMPLES};

pub use crate::dataset::{self, home_dataset_dir_with, Partition};
pub use crate::eval::{ClassThresholds, MetricKind, MetricSummary, Metrics};
pub use crate::model::{NetworkSpec, SegmentationModel, TrainOptions};
pub use crate::naming::SliceKey;
pub use crate::pipeline::{self, EvaluationReport};
pub use crate::provider::{Batch, BatchProvider, ProviderOptions, SliceDataProvider};
pub use crate::slicer::{SliceReport, Slicer};
