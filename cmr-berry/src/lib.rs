#![warn(missing_docs)]

//! 核心库. 为心脏 MRI (LGE / CEMRA) 语义分割提供数据准备、批量数据供给以及预测评估功能.
//!
//! 神经网络本身 (U-Net 结构、优化器、训练循环) 不在本 crate 内实现,
//! 而是通过 [`model::SegmentationModel`] 这一窄接口接入.
//!
//! # 注意
//!
//! 1. 本软件 **不得** 用于临床诊断或治疗.
//! 2. 整个流水线是单线程、同步、批处理式的. 仅在打开 `rayon` feature 时,
//!    单个受试者的逐层重采样会并行执行, 其结果与顺序执行完全一致.
//! 3. 每个阶段都完整消费上一阶段写入磁盘的文件, 因此任一阶段都可以从头重跑.
//!
//! # 模块一览
//!
//! ### 3D 体数据与 NIfTI 读写 ✅
//!
//! 3D 扫描/标注按 `(z, H, W)` 访问, 切片文件按 `(C, H, W)` 落盘.
//!
//! 实现位于 `cmr-berry/src/data`.
//!
//! ### 重采样与切片 ✅
//!
//! 图像使用双线性插值 (缩小时先做高斯抗混叠), 标签使用最近邻插值,
//! 然后逐层写出单通道图像和 one-hot 标签.
//!
//! 实现位于 `cmr-berry/src/resample` 和 `cmr-berry/src/slicer.rs`.
//!
//! ### 数据集划分 ✅
//!
//! 固定种子的随机置换, 按 80/20 划分训练/测试受试者, 并以单行 CSV 持久化.
//!
//! 实现位于 `cmr-berry/src/dataset`.
//!
//! ### 批量数据供给 ✅
//!
//! 循环游标 + 可选洗牌, 逐样本归一化后堆叠为固定大小的批.
//!
//! 实现位于 `cmr-berry/src/provider`.
//!
//! ### 评估 ✅
//!
//! 逐类阈值离散化、混淆矩阵派生指标、3D 重组与均值/标准差汇总.
//!
//! 实现位于 `cmr-berry/src/eval`.

/// 二维索引 (高, 宽).
pub type Idx2d = (usize, usize);

/// 三维索引 (z, 高, 宽).
pub type Idx3d = (usize, usize, usize);

pub mod config;
pub mod consts;
mod data;
pub mod dataset;
mod error;
pub mod eval;
pub mod model;
pub mod pipeline;
pub mod prelude;
pub mod provider;
pub mod resample;
pub mod slicer;

pub use data::{io, naming, MriData3d, MriLabel, MriScan, NiftiHeaderAttr};

pub use error::{PipelineError, PipelineResult};
