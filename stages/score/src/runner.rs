//! 程序运行函数.

use cmr_berry::dataset::Partition;
use cmr_berry::pipeline::{self, EvaluationReport};
use cmr_berry::PipelineResult;
use utils::loader;

/// 实际运行. 只对测试集受试者重新打分.
pub fn run() -> PipelineResult<EvaluationReport> {
    let cfg = loader::config_from_env_or_home()?;
    let partition = Partition::load(&cfg.paths.train_index, &cfg.paths.test_index)?;
    println!(
        "Rescoring {} testing subjects under {}...",
        partition.test.len(),
        cfg.paths.results_dir.display()
    );
    pipeline::rescore(&cfg.paths.results_dir, &partition.test, cfg.n_class)
}
