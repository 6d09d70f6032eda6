//! 数据集操作: 原始体数据加载、训练/测试划分与切片暂存.

use std::path::{Path, PathBuf};

pub mod generic;
mod partition;
mod stage;

pub use partition::Partition;
pub use stage::stage_subjects;

/// MRI 数据默认存放在 `{用户主目录}/dataset` 下.
pub fn home_dataset_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join("dataset"))
}

/// `{用户主目录}/dataset` 之下由 `it` 逐级拼接的路径, 例如 `["cmr", "raw"]`.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    home_dataset_dir().map(|root| it.into_iter().fold(root, |dir, p| dir.join(p)))
}
