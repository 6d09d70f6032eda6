//! 各阶段的驱动函数.
//!
//! 每个阶段只读取上一阶段写到磁盘上的文件, 因此可以单独重跑:
//!
//! 1. `prepare`: 切片并划分训练/测试受试者;
//! 2. `train`: 暂存训练切片, 交给外部模型训练;
//! 3. `evaluate`: 暂存测试切片, 推理、离散化、计算指标并重组 3D 结果;
//! 4. `rescore`: 不经过模型, 仅依据已写出的结果重新计算指标.
//!
//! 入口见 [`prepare`], [`train`], [`evaluate`] 与 [`rescore`].

mod report;
mod scoring;

pub use report::{EvaluationReport, SliceScore};

use crate::config::PipelineConfig;
use crate::dataset::{stage_subjects, Partition};
use crate::model::SegmentationModel;
use crate::provider::{BatchProvider, ProviderOptions, SliceDataProvider};
use crate::slicer::{SliceReport, Slicer};
use crate::{PipelineError, PipelineResult};
use log::info;
use std::path::{Path, PathBuf};

pub use scoring::{evaluate, rescore};

/// 切片全部受试者, 然后读取 (或首次创建) 训练/测试划分.
pub fn prepare(cfg: &PipelineConfig) -> PipelineResult<(SliceReport, Partition)> {
    cfg.validate()?;
    let report = Slicer::from_config(cfg).run()?;
    let partition = load_or_create_partition(cfg)?;
    Ok((report, partition))
}

/// 读取 (或首次创建) 训练/测试划分.
pub fn load_or_create_partition(cfg: &PipelineConfig) -> PipelineResult<Partition> {
    Partition::load_or_create(
        cfg.slicing.samples,
        &cfg.split,
        &cfg.paths.train_index,
        &cfg.paths.test_index,
    )
}

/// 暂存训练集切片, 并用洗牌的数据供给器训练模型. 返回最终 checkpoint 的路径.
pub fn train<M: SegmentationModel + ?Sized>(
    model: &mut M,
    cfg: &PipelineConfig,
) -> PipelineResult<PathBuf> {
    cfg.validate()?;
    let partition = Partition::load(&cfg.paths.train_index, &cfg.paths.test_index)?;
    stage_subjects(&partition.train, &cfg.paths.processed_dir, &cfg.paths.train_dir)?;

    let mut provider = open_provider(cfg, &cfg.paths.train_dir, true)?;
    info!(
        "Training on {} slices of {} subjects",
        provider.len(),
        partition.train.len()
    );
    model.train(&mut provider, &cfg.paths.model_dir, &cfg.training)
}

/// 为 `dir` 下的切片创建数据供给器, 并检查通道数与网络配置一致.
pub(crate) fn open_provider(
    cfg: &PipelineConfig,
    dir: &Path,
    shuffle: bool,
) -> PipelineResult<SliceDataProvider> {
    let pattern = format!("{}/*", glob::Pattern::escape(&dir.to_string_lossy()));
    let provider = SliceDataProvider::new(&pattern, ProviderOptions::from_config(cfg, shuffle))?;
    if provider.channels() != cfg.network.channels {
        return Err(PipelineError::Configuration(format!(
            "切片有 {} 个通道, 但网络配置为 {} 个",
            provider.channels(),
            cfg.network.channels
        )));
    }
    Ok(provider)
}
