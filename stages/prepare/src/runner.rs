//! 程序运行函数.

use cmr_berry::dataset::Partition;
use cmr_berry::pipeline;
use cmr_berry::slicer::SliceReport;
use cmr_berry::PipelineResult;
use utils::loader;

/// 准备阶段的结果.
pub struct PrepareResult {
    slices: SliceReport,
    partition: Partition,
}

impl PrepareResult {
    /// 打印结果.
    pub fn describe(&self) {
        const S4: &str = "    ";

        utils::sep();
        println!("Sliced subjects: {}", self.slices.subjects.len());
        println!("{S4}Slices written: {}", self.slices.slices);
        println!("{S4}Skipped subjects: {:?}", self.slices.skipped);
        utils::sep();
        println!("Training subjects: {}", self.partition.train.len());
        println!("Testing subjects: {}", self.partition.test.len());
        utils::sep();
    }
}

/// 实际运行.
pub fn run() -> PipelineResult<PrepareResult> {
    let cfg = loader::config_from_env_or_home()?;
    println!("Preparing slices under {}...", cfg.paths.processed_dir.display());
    let (slices, partition) = pipeline::prepare(&cfg)?;
    Ok(PrepareResult { slices, partition })
}
