//! 通用 MRI scan/label 数据加载器.
//!
//! 提供迭代器风格的数据集获取模式.

use crate::naming::{raw_label_file, raw_scan_file};
use crate::{MriData3d, PipelineError, PipelineResult};
use std::io;
use std::path::{Path, PathBuf};

/// 原始体数据的命名方式: `{prefix}{id}{ext}` 与 `{prefix}{id}_label{ext}`.
#[derive(Clone, Debug)]
pub struct RawNaming {
    /// 文件名前缀, 例如 `lge_`.
    pub prefix: String,

    /// 扩展名, 例如 `.nii`.
    pub ext: String,
}

impl RawNaming {
    /// 直接初始化.
    pub fn new(prefix: impl Into<String>, ext: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ext: ext.into(),
        }
    }

    /// 扫描文件名.
    #[inline]
    pub fn scan_file(&self, subject: u32) -> String {
        raw_scan_file(&self.prefix, subject, &self.ext)
    }

    /// 标注文件名.
    #[inline]
    pub fn label_file(&self, subject: u32) -> String {
        raw_label_file(&self.prefix, subject, &self.ext)
    }
}

/// 从指定索引、路径、命名方式创建 3D MRI 数据 (scan + label) 加载器.
///
/// # 注意
///
/// `data` 的所有取值 `value` 必须在 `path` 下有对应的两个 nifti 文件.
/// 任一文件不存在时, 加载器在迭代时返回 `ErrorKind::NotFound` 的
/// [`PipelineError::Io`]; 其它读取错误原样返回.
pub fn data_loader<I: IntoIterator<Item = u32>, P: AsRef<Path>>(
    data: I,
    path: P,
    naming: RawNaming,
) -> MriDataLoader {
    let mut data: Vec<u32> = data.into_iter().collect();
    data.reverse();

    MriDataLoader {
        path: path.as_ref().to_owned(),
        naming,
        data_rev: data,
    }
}

/// 3D MRI 数据集 (scan + label) 加载器, 并在内部自动转换文件名.
#[derive(Debug)]
pub struct MriDataLoader {
    path: PathBuf,
    naming: RawNaming,
    data_rev: Vec<u32>,
}

impl MriDataLoader {
    fn load(&self, idx: u32) -> PipelineResult<MriData3d> {
        let scan = self.path.join(self.naming.scan_file(idx));
        let label = self.path.join(self.naming.label_file(idx));
        for p in [&scan, &label] {
            if !p.is_file() {
                return Err(PipelineError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("`{}` 不存在", p.display()),
                )));
            }
        }
        MriData3d::open(scan, label)
    }
}

impl Iterator for MriDataLoader {
    type Item = (u32, PipelineResult<MriData3d>);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.data_rev.pop()?;
        Some((idx, self.load(idx)))
    }
}

impl ExactSizeIterator for MriDataLoader {
    #[inline]
    fn len(&self) -> usize {
        self.data_rev.len()
    }
}

/// 判断错误是否由文件缺失导致.
pub fn is_missing(e: &PipelineError) -> bool {
    matches!(e, PipelineError::Io(e) if e.kind() == io::ErrorKind::NotFound)
}
