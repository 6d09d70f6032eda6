//! 基于切片文件的数据供给器.

use super::{expand_labels, normalize_intensity, BatchProvider, Sample};
use crate::config::PipelineConfig;
use crate::consts::{LABEL_SUFFIX, NII_GZ};
use crate::io::{read_label_hwc, read_scan_hwc};
use crate::{PipelineError, PipelineResult};
use log::{debug, info};
use ndarray::Axis;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::{Path, PathBuf};

/// [`SliceDataProvider`] 的参数.
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderOptions {
    /// 图像文件名后缀.
    pub data_suffix: String,

    /// 标签文件名后缀. 由图像文件名的 `data_suffix` 替换而来.
    pub label_suffix: String,

    /// 是否在初始化以及每轮结束时洗牌.
    pub shuffle: bool,

    /// 类别数 (含背景).
    pub n_class: usize,

    /// 强度截断下界.
    pub clip_min: Option<f32>,

    /// 强度截断上界.
    pub clip_max: Option<f32>,

    /// 洗牌种子. `None` 时使用系统熵.
    pub seed: Option<u64>,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            data_suffix: NII_GZ.to_string(),
            label_suffix: format!("{LABEL_SUFFIX}{NII_GZ}"),
            shuffle: true,
            n_class: crate::consts::DEFAULT_N_CLASS,
            clip_min: None,
            clip_max: None,
            seed: None,
        }
    }
}

impl ProviderOptions {
    /// 从流水线配置构建.
    pub fn from_config(cfg: &PipelineConfig, shuffle: bool) -> Self {
        Self {
            shuffle,
            n_class: cfg.n_class,
            clip_min: cfg.provider.clip_min,
            clip_max: cfg.provider.clip_max,
            seed: cfg.provider.seed,
            ..Self::default()
        }
    }
}

/// 从磁盘上的切片文件循环读取样本的供给器.
///
/// 游标从第一个文件之前开始, 每读取一个样本前进一步, 越过末尾时回到开头;
/// 打开洗牌时, 每次回到开头都会重新洗牌.
#[derive(Debug)]
pub struct SliceDataProvider {
    options: ProviderOptions,
    files: Vec<PathBuf>,
    cursor: Option<usize>,
    channels: usize,
    rng: StdRng,
}

impl SliceDataProvider {
    /// 搜索匹配 `pattern` 的图像文件并初始化.
    ///
    /// 只保留文件名以 `data_suffix` 结尾且不包含 `label_suffix` 的文件.
    /// 一个文件都没有时返回 [`PipelineError::Configuration`].
    /// 通道数由第一个文件推断.
    pub fn new(pattern: &str, options: ProviderOptions) -> PipelineResult<Self> {
        let mut files = Vec::new();
        for entry in glob::glob(pattern)? {
            let path = entry?;
            let keep = file_name(&path).is_some_and(|name| {
                name.ends_with(&options.data_suffix) && !name.contains(&options.label_suffix)
            });
            if keep {
                files.push(path);
            }
        }
        if files.is_empty() {
            return Err(PipelineError::Configuration(format!(
                "`{pattern}` 没有匹配到任何数据文件"
            )));
        }

        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        if options.shuffle {
            files.shuffle(&mut rng);
        }
        info!("Number of files used: {}", files.len());

        let channels = read_scan_hwc(&files[0])?.len_of(Axis(2));
        Ok(Self {
            options,
            files,
            cursor: None,
            channels,
            rng,
        })
    }

    /// 当前顺序下的全部图像文件.
    #[inline]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// 图像文件个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// 是否没有图像文件. 构造成功后总是 `false`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// 图像文件对应的标签文件.
    pub fn label_path(&self, data: &Path) -> PathBuf {
        let name = file_name(data).unwrap_or_default();
        let stem = name
            .strip_suffix(&self.options.data_suffix)
            .unwrap_or(name);
        data.with_file_name(format!("{stem}{}", self.options.label_suffix))
    }

    fn advance(&mut self) -> usize {
        let next = self.cursor.map_or(0, |i| i + 1);
        let next = if next >= self.files.len() {
            if self.options.shuffle {
                self.files.shuffle(&mut self.rng);
            }
            0
        } else {
            next
        };
        self.cursor = Some(next);
        next
    }
}

impl BatchProvider for SliceDataProvider {
    #[inline]
    fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    fn n_class(&self) -> usize {
        self.options.n_class
    }

    fn next_sample(&mut self) -> PipelineResult<Sample> {
        let idx = self.advance();
        let path = self.files[idx].clone();
        let label_path = self.label_path(&path);
        debug!("Loading {} / {}", path.display(), label_path.display());

        let mut data = read_scan_hwc(&path)?;
        let label = read_label_hwc(&label_path)?;
        let (dh, dw, _) = data.dim();
        let (lh, lw, lc) = label.dim();
        if (dh, dw) != (lh, lw) {
            return Err(PipelineError::shape_mismatch(
                format!("`{}` 与其标签的平面形状不一致", path.display()),
                &[dh, dw, lc],
                &[lh, lw, lc],
            ));
        }

        normalize_intensity(&mut data, self.options.clip_min, self.options.clip_max);
        let labels = expand_labels(label, self.options.n_class)?;
        Ok(Sample { path, data, labels })
    }
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}
