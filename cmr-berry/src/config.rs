//! 流水线配置.
//!
//! 所有路径、形状、类别数与阈值都集中在 [`PipelineConfig`] 中,
//! 由调用方显式传给各个组件, 不存在进程级的全局状态.

use crate::consts::*;
use crate::model::{NetworkSpec, TrainOptions};
use crate::{Idx2d, PipelineError, PipelineResult};
use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 各阶段读写的目录与文件.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PathConfig {
    /// 原始 3D 扫描与标注所在目录.
    pub raw_dir: PathBuf,

    /// 切片输出目录.
    pub processed_dir: PathBuf,

    /// 训练集切片暂存目录.
    pub train_dir: PathBuf,

    /// 测试集切片暂存目录.
    pub test_dir: PathBuf,

    /// 预测结果目录.
    pub results_dir: PathBuf,

    /// 模型输出 (checkpoint) 目录.
    pub model_dir: PathBuf,

    /// 评估时恢复的 checkpoint. 默认为 `model_dir` 下的 `model.ckpt`.
    pub checkpoint: PathBuf,

    /// 训练集受试者编号文件.
    pub train_index: PathBuf,

    /// 测试集受试者编号文件.
    pub test_index: PathBuf,
}

impl PathConfig {
    /// 以 `root` 为数据根目录构建标准目录布局.
    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        let model_dir = root.join("Model");
        Self {
            raw_dir: root.join("CMR").join("CEMRA3D"),
            processed_dir: root.join("Input").join("CEMRA2D"),
            train_dir: root.join("Input").join("TrainSet"),
            test_dir: root.join("Input").join("TestsSet"),
            results_dir: root.join("Predictions"),
            checkpoint: model_dir.join(CHECKPOINT_FILE),
            model_dir,
            train_index: root.join("trainIDX.csv"),
            test_index: root.join("testsIDX.csv"),
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self::with_root("Data")
    }
}

/// 重采样与切片参数.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SliceConfig {
    /// 受试者总数. 处理编号 `0..samples`.
    pub samples: u32,

    /// 平面重采样目标形状 (高, 宽).
    pub resize: Idx2d,

    /// 原始文件名前缀.
    pub raw_prefix: String,

    /// 原始文件扩展名.
    pub raw_ext: String,

    /// 图像缩小时是否做高斯抗混叠.
    pub anti_aliasing: bool,
}

impl Default for SliceConfig {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLES,
            resize: DEFAULT_RESIZE,
            raw_prefix: "lge_".to_string(),
            raw_ext: ".nii".to_string(),
            anti_aliasing: true,
        }
    }
}

/// 训练/测试划分参数.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SplitConfig {
    /// 排除的前导受试者个数.
    pub offset: u32,

    /// 随机置换的种子.
    pub seed: u64,

    /// 训练集比例, 取值 `(0, 1)`.
    pub train_ratio: f64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            offset: DEFAULT_SPLIT_OFFSET,
            seed: DEFAULT_SPLIT_SEED,
            train_ratio: DEFAULT_TRAIN_RATIO,
        }
    }
}

/// 批量数据供给参数.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ProviderConfig {
    /// 强度截断下界. `None` 表示不截断.
    pub clip_min: Option<f32>,

    /// 强度截断上界. `None` 表示不截断.
    pub clip_max: Option<f32>,

    /// 洗牌种子. `None` 时使用系统熵.
    pub seed: Option<u64>,
}

/// 评估参数.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EvalConfig {
    /// 前景类 `1..n_class` 各自的预测概率阈值.
    pub thresholds: Vec<f32>,

    /// 真值 one-hot 离散化时使用的统一阈值.
    pub label_threshold: f32,

    /// 是否为每个切片额外保存 JPEG 预览图.
    pub save_previews: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            thresholds: vec![DEFAULT_THRESHOLD; DEFAULT_N_CLASS - 1],
            label_threshold: DEFAULT_THRESHOLD,
            save_previews: false,
        }
    }
}

/// 完整的流水线配置.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    /// 目录布局.
    pub paths: PathConfig,

    /// 类别数 (含背景).
    pub n_class: usize,

    /// 切片参数.
    pub slicing: SliceConfig,

    /// 划分参数.
    pub split: SplitConfig,

    /// 网络结构参数.
    pub network: NetworkSpec,

    /// 训练参数.
    pub training: TrainOptions,

    /// 数据供给参数.
    pub provider: ProviderConfig,

    /// 评估参数.
    pub eval: EvalConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            paths: PathConfig::default(),
            n_class: DEFAULT_N_CLASS,
            slicing: SliceConfig::default(),
            split: SplitConfig::default(),
            network: NetworkSpec::default(),
            training: TrainOptions::default(),
            provider: ProviderConfig::default(),
            eval: EvalConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// 以 `root` 为数据根目录, 其余参数取默认值.
    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        Self {
            paths: PathConfig::with_root(root),
            ..Self::default()
        }
    }

    /// 从 JSON 文件加载配置. 缺省字段取默认值.
    #[cfg(feature = "serde")]
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        let config: Self = serde_json::from_reader(std::io::BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// 检查各项参数是否相互一致.
    pub fn validate(&self) -> PipelineResult<()> {
        fn check(ok: bool, msg: impl FnOnce() -> String) -> PipelineResult<()> {
            if ok {
                Ok(())
            } else {
                Err(PipelineError::Configuration(msg()))
            }
        }

        check(self.n_class >= 2, || {
            format!("类别数至少为 2, 实际为 {}", self.n_class)
        })?;
        let (h, w) = self.slicing.resize;
        check(h > 0 && w > 0, || format!("非法的重采样形状 {h}x{w}"))?;
        check(self.split.offset <= self.slicing.samples, || {
            format!(
                "排除个数 {} 大于受试者总数 {}",
                self.split.offset, self.slicing.samples
            )
        })?;
        let ratio = self.split.train_ratio;
        check(ratio > 0.0 && ratio < 1.0, || {
            format!("训练集比例 {ratio} 不在 (0, 1) 内")
        })?;
        check(self.eval.thresholds.len() == self.n_class - 1, || {
            format!(
                "需要 {} 个前景阈值, 实际为 {}",
                self.n_class - 1,
                self.eval.thresholds.len()
            )
        })?;
        check(
            self.eval
                .thresholds
                .iter()
                .chain(Some(&self.eval.label_threshold))
                .all(|t| t.is_finite()),
            || "阈值必须是有限值".to_string(),
        )?;
        if let (Some(lo), Some(hi)) = (self.provider.clip_min, self.provider.clip_max) {
            check(lo <= hi, || format!("截断区间 [{lo}, {hi}] 为空"))?;
        }
        check(self.network.channels > 0, || "输入通道数不能为 0".to_string())?;
        check(self.training.batch_size > 0, || "批大小不能为 0".to_string())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let cfg = PipelineConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.n_class, 4);
        assert_eq!(cfg.slicing.resize, (320, 320));
        assert_eq!(cfg.eval.thresholds, vec![0.5; 3]);
        assert_eq!(cfg.paths.processed_dir, Path::new("Data/Input/CEMRA2D"));
        assert_eq!(cfg.paths.checkpoint, Path::new("Data/Model/model.ckpt"));
    }

    #[test]
    fn test_invalid_settings() {
        let mut cfg = PipelineConfig::default();
        cfg.eval.thresholds = vec![0.5, 0.1];
        assert!(matches!(
            cfg.validate(),
            Err(PipelineError::Configuration(_))
        ));

        let mut cfg = PipelineConfig::default();
        cfg.split.offset = cfg.slicing.samples + 1;
        assert!(cfg.validate().is_err());

        let mut cfg = PipelineConfig::default();
        cfg.split.train_ratio = 1.0;
        assert!(cfg.validate().is_err());

        let mut cfg = PipelineConfig::default();
        cfg.provider.clip_min = Some(2.0);
        cfg.provider.clip_max = Some(1.0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_asymmetric_thresholds_allowed() {
        let mut cfg = PipelineConfig::default();
        cfg.eval.thresholds = vec![0.5, 0.1, 0.5];
        cfg.validate().unwrap();
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_partial_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        std::fs::write(
            &path,
            r#"{ "n_class": 2, "eval": { "thresholds": [0.3] }, "slicing": { "resize": [64, 64] } }"#,
        )
        .unwrap();
        let cfg = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(cfg.n_class, 2);
        assert_eq!(cfg.eval.thresholds, vec![0.3]);
        assert_eq!(cfg.eval.label_threshold, 0.5);
        assert_eq!(cfg.slicing.resize, (64, 64));
        assert_eq!(cfg.slicing.samples, 265);
    }
}
