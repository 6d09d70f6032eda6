//! 通用常量.

/// 默认的类别数 (背景 + 3 类前景).
pub const DEFAULT_N_CLASS: usize = 4;

/// 默认的受试者总数.
pub const DEFAULT_SAMPLES: u32 = 265;

/// 默认的平面重采样分辨率 (高, 宽).
pub const DEFAULT_RESIZE: (usize, usize) = (320, 320);

/// 默认排除的前导受试者个数 (保留给另一组观察者).
pub const DEFAULT_SPLIT_OFFSET: u32 = 110;

/// 默认的划分种子.
pub const DEFAULT_SPLIT_SEED: u64 = 0;

/// 默认的训练集比例.
pub const DEFAULT_TRAIN_RATIO: f64 = 0.8;

/// 默认的概率阈值.
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// 标签在重采样前被编码到 `[0, 1]` 时所用的比例.
pub const LABEL_UNIT_SCALE: f32 = 255.0;

/// 默认 checkpoint 文件名, 位于模型输出目录下.
pub const CHECKPOINT_FILE: &str = "model.ckpt";

/// 切片文件 (及结果文件) 的扩展名.
pub const NII_GZ: &str = ".nii.gz";

/// 切片标签文件相对于切片图像文件多出的后缀.
pub const LABEL_SUFFIX: &str = "_label";
