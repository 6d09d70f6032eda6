//! 训练/测试集划分.

use crate::config::SplitConfig;
use crate::{PipelineError, PipelineResult};
use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::Path;

/// 互不相交的训练/测试受试者编号.
///
/// 编号 `0..offset` 被排除 (保留给另一组观察者), 不出现在任一集合中.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Partition {
    /// 训练集受试者编号.
    pub train: Vec<u32>,

    /// 测试集受试者编号.
    pub test: Vec<u32>,
}

impl Partition {
    /// 对 `offset..samples` 做固定种子的随机置换, 前 `floor(n * ratio)` 个为训练集,
    /// 其余为测试集.
    ///
    /// 相同的 `samples` 和 `split` 总是得到相同的结果.
    pub fn new(samples: u32, split: &SplitConfig) -> PipelineResult<Self> {
        if split.offset > samples {
            return Err(PipelineError::Configuration(format!(
                "排除个数 {} 大于受试者总数 {samples}",
                split.offset
            )));
        }
        if !(split.train_ratio > 0.0 && split.train_ratio < 1.0) {
            return Err(PipelineError::Configuration(format!(
                "训练集比例 {} 不在 (0, 1) 内",
                split.train_ratio
            )));
        }

        let mut ids: Vec<u32> = (split.offset..samples).collect();
        let mut rng = StdRng::seed_from_u64(split.seed);
        ids.shuffle(&mut rng);

        let n_train = (ids.len() as f64 * split.train_ratio) as usize;
        let test = ids.split_off(n_train);
        Ok(Self { train: ids, test })
    }

    /// 从两个单行 CSV 文件读取划分.
    pub fn load<P: AsRef<Path>>(train: P, test: P) -> PipelineResult<Self> {
        Ok(Self {
            train: read_row(train.as_ref())?,
            test: read_row(test.as_ref())?,
        })
    }

    /// 将划分写成两个单行 CSV 文件. 父目录不存在时自动创建.
    pub fn save<P: AsRef<Path>>(&self, train: P, test: P) -> PipelineResult<()> {
        write_row(train.as_ref(), &self.train)?;
        write_row(test.as_ref(), &self.test)
    }

    /// 两个文件都存在时直接读取; 否则重新划分并保存.
    pub fn load_or_create<P: AsRef<Path>>(
        samples: u32,
        split: &SplitConfig,
        train: P,
        test: P,
    ) -> PipelineResult<Self> {
        let (train, test) = (train.as_ref(), test.as_ref());
        if train.is_file() && test.is_file() {
            info!("Reusing split from {} and {}", train.display(), test.display());
            return Self::load(train, test);
        }
        let part = Self::new(samples, split)?;
        part.save(train, test)?;
        info!(
            "Created split: {} train / {} test subjects",
            part.train.len(),
            part.test.len()
        );
        Ok(part)
    }

    /// 两个集合是否不相交.
    pub fn is_disjoint(&self) -> bool {
        self.train.iter().all(|id| !self.test.contains(id))
    }
}

fn read_row(path: &Path) -> PipelineResult<Vec<u32>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let Some(record) = reader.records().next() else {
        return Ok(Vec::new());
    };
    record?
        .iter()
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(|field| {
            field.parse::<u32>().map_err(|e| {
                PipelineError::Configuration(format!(
                    "`{}` 中的编号 `{field}` 非法: {e}",
                    path.display()
                ))
            })
        })
        .collect()
}

fn write_row(path: &Path, ids: &[u32]) -> PipelineResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(ids.iter().map(u32::to_string))?;
    writer.flush()?;
    Ok(())
}
