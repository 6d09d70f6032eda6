//! 对 `cmr-berry::config` 的更一层封装. 从环境变量定位数据与配置.

use cmr_berry::config::PipelineConfig;
use cmr_berry::{PipelineError, PipelineResult};
use std::env;
use std::path::PathBuf;

/// 数据根目录所用的环境变量.
pub const DATA_DIR_VAR: &str = "CMR_DATA_DIR";

/// JSON 配置文件所用的环境变量.
pub const CONFIG_VAR: &str = "CMR_CONFIG";

/// 获取数据根目录.
///
/// 1. 若环境变量 `$CMR_DATA_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/cmr`.
pub fn data_root_from_env_or_home() -> Option<PathBuf> {
    match env::var(DATA_DIR_VAR) {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => cmr_berry::dataset::home_dataset_dir_with(["cmr"]),
    }
}

/// 获取流水线配置.
///
/// 1. 若环境变量 `$CMR_CONFIG` 非空, 则从该 JSON 文件加载;
/// 2. 否则, 以 `data_root_from_env_or_home()` 的结果为根目录使用默认配置.
pub fn config_from_env_or_home() -> PipelineResult<PipelineConfig> {
    if let Ok(path) = env::var(CONFIG_VAR) {
        if !path.is_empty() {
            return PipelineConfig::from_json_file(path);
        }
    }
    let root = data_root_from_env_or_home().ok_or_else(|| {
        PipelineError::Configuration(format!("未设置 `${DATA_DIR_VAR}`, 且无法确定用户主目录"))
    })?;
    let cfg = PipelineConfig::with_root(root);
    cfg.validate()?;
    Ok(cfg)
}
