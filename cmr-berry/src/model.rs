//! 外部分割模型的接口约定.
//!
//! U-Net 本身、优化器以及训练循环都不在本 crate 内实现. 流水线只通过
//! [`SegmentationModel`] 与模型交互: 给定一批 `(N, H, W, 1)` 的图像,
//! 同步返回 `(N, H, W, C)` 的逐像素类别概率.

use crate::provider::BatchProvider;
use crate::PipelineResult;
use ndarray::{Array4, ArrayView4};
use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 训练时使用的损失函数.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Cost {
    /// Dice 系数损失.
    DiceCoefficient,

    /// 逐像素交叉熵.
    CrossEntropy,
}

/// 优化器.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Optimizer {
    /// Adam.
    Adam,

    /// 带动量的随机梯度下降.
    Momentum,
}

/// 网络结构参数. 仅透传给外部模型.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NetworkSpec {
    /// U-Net 的层数 (深度).
    pub layers: u32,

    /// 第一层的特征图个数, 之后每层翻倍.
    pub features_root: u32,

    /// 输入通道数.
    pub channels: usize,

    /// 损失函数.
    pub cost: Cost,
}

impl Default for NetworkSpec {
    fn default() -> Self {
        Self {
            layers: 5,
            features_root: 32,
            channels: 1,
            cost: Cost::DiceCoefficient,
        }
    }
}

/// 训练参数.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TrainOptions {
    /// 每个 epoch 的迭代次数.
    pub iterations: u32,

    /// epoch 个数.
    pub epochs: u32,

    /// dropout 比例.
    pub dropout: f32,

    /// 是否从已有的 checkpoint 继续训练.
    pub restore: bool,

    /// 训练批大小.
    pub batch_size: usize,

    /// 验证批大小.
    pub verification_batch_size: usize,

    /// 优化器.
    pub optimizer: Optimizer,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            iterations: 500,
            epochs: 100,
            dropout: 0.5,
            restore: true,
            batch_size: 16,
            verification_batch_size: 32,
            optimizer: Optimizer::Adam,
        }
    }
}

/// 外部分割模型.
pub trait SegmentationModel {
    /// 从 checkpoint 恢复权重.
    fn restore(&mut self, checkpoint: &Path) -> PipelineResult<()>;

    /// 对一批 `(N, H, W, channels)` 图像做前向推理, 返回 `(N, H, W, n_class)` 的概率图.
    fn predict(&mut self, batch: ArrayView4<f32>) -> PipelineResult<Array4<f32>>;

    /// 从 `provider` 拉取数据训练, 模型输出写到 `output` 目录下.
    /// 返回最终 checkpoint 的路径.
    fn train(
        &mut self,
        provider: &mut dyn BatchProvider,
        output: &Path,
        options: &TrainOptions,
    ) -> PipelineResult<PathBuf>;
}
