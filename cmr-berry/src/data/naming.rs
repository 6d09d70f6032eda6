//! 磁盘文件命名规则.
//!
//! - 原始体数据: `{raw}/{prefix}{id}{ext}`, `{raw}/{prefix}{id}_label{ext}`
//! - 切片: `{processed}/img_{id}_{z}.nii.gz`, `{processed}/img_{id}_{z}_label.nii.gz`
//! - 预测结果: `{results}/img_{id}_{z}{_labels,_probls,_output}.nii.gz`
//! - 3D 重组: `{results}/lbl_{id}_3D.nii.gz`, `{results}/out_{id}_3D.nii.gz`

use crate::consts::{LABEL_SUFFIX, NII_GZ};
use std::fmt;
use std::path::Path;

/// 切片标识: 受试者编号 + 深度索引.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SliceKey {
    /// 受试者编号.
    pub subject: u32,

    /// 深度 (z) 索引.
    pub depth: usize,
}

impl fmt::Display for SliceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "img_{}_{}", self.subject, self.depth)
    }
}

impl SliceKey {
    /// 直接初始化.
    #[inline]
    pub const fn new(subject: u32, depth: usize) -> Self {
        Self { subject, depth }
    }

    /// 切片图像文件名.
    #[inline]
    pub fn image_file(&self) -> String {
        format!("{self}{NII_GZ}")
    }

    /// 切片 one-hot 标签文件名.
    #[inline]
    pub fn label_file(&self) -> String {
        format!("{self}{LABEL_SUFFIX}{NII_GZ}")
    }

    /// 预测结果文件名.
    #[inline]
    pub fn result_file(&self, kind: ResultKind) -> String {
        format!("{self}{}{NII_GZ}", kind.suffix())
    }

    /// 预览图文件名.
    #[inline]
    pub fn preview_file(&self) -> String {
        format!("{self}_preview.jpg")
    }

    /// 从文件名解析切片标识. 返回标识以及剩余部分 (例如 `"_label.nii.gz"`).
    ///
    /// 形如 `img_{id}_{z}...` 之外的名字返回 `None`.
    pub fn parse(file_name: &str) -> Option<(Self, &str)> {
        let rest = file_name.strip_prefix("img_")?;
        let (subject, rest) = split_number(rest)?;
        let rest = rest.strip_prefix('_')?;
        let (depth, rest) = split_number(rest)?;
        Some((Self::new(subject.parse().ok()?, depth.parse().ok()?), rest))
    }
}

/// 把开头的十进制数字与其余部分分开. 没有数字时返回 `None`.
fn split_number(s: &str) -> Option<(&str, &str)> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    (end > 0).then(|| s.split_at(end))
}

/// 每个被预测切片写出的结果种类.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ResultKind {
    /// 归一化后的输入图像.
    Input,

    /// 离散化的真值标签图.
    Labels,

    /// 模型输出的逐类概率.
    Probabilities,

    /// 离散化的预测标签图.
    Output,
}

impl ResultKind {
    /// 文件名后缀.
    pub const fn suffix(&self) -> &'static str {
        match self {
            Self::Input => "",
            Self::Labels => "_labels",
            Self::Probabilities => "_probls",
            Self::Output => "_output",
        }
    }
}

/// 重组后的受试者 3D 结果种类.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StackKind {
    /// 由 `_labels` 切片堆叠而成.
    Labels,

    /// 由 `_output` 切片堆叠而成.
    Output,
}

impl StackKind {
    /// 对应的切片结果种类.
    pub const fn source(&self) -> ResultKind {
        match self {
            Self::Labels => ResultKind::Labels,
            Self::Output => ResultKind::Output,
        }
    }

    /// 3D 结果文件名.
    pub fn file_name(&self, subject: u32) -> String {
        let prefix = match self {
            Self::Labels => "lbl",
            Self::Output => "out",
        };
        format!("{prefix}_{subject}_3D{NII_GZ}")
    }
}

/// 原始 3D 扫描文件名.
#[inline]
pub fn raw_scan_file(prefix: &str, subject: u32, ext: &str) -> String {
    format!("{prefix}{subject}{ext}")
}

/// 原始 3D 标注文件名.
#[inline]
pub fn raw_label_file(prefix: &str, subject: u32, ext: &str) -> String {
    format!("{prefix}{subject}{LABEL_SUFFIX}{ext}")
}

/// 文件名中第一个 `.` 之前的部分. 用于由输入文件派生结果文件名.
pub fn stem_of(path: &Path) -> Option<&str> {
    let name = path.file_name()?.to_str()?;
    Some(name.split('.').next().unwrap_or(name))
}
