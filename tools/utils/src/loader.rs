//! 对 `nii-berry::dataset` 的更一层封装. 从环境变量读取数据集配置.

use nii_berry::dataset::{self, BunchConfig, Device};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// 读取环境变量 `key` 并解析. 未设置时返回 `None`, 无法解析时返回 `Err(原值)`.
fn parse_env<T: FromStr>(key: &str) -> Option<Result<T, String>> {
    let raw = env::var(key).ok().filter(|v| !v.trim().is_empty())?;
    Some(raw.trim().parse().map_err(|_| raw))
}

/// 目录: 环境变量 `key` 非空时取其值, 否则取 `$HOME/dataset/nii/{leaf}`.
fn dir_from_env_or_home(key: &str, leaf: &str) -> Option<PathBuf> {
    match env::var(key) {
        Ok(d) if !d.trim().is_empty() => Some(PathBuf::from(d)),
        _ => dataset::home_dataset_dir_with(["nii", leaf]),
    }
}

/// 获取源图像目录.
///
/// 1. 若环境变量 `$NII_SOURCE_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/nii/source`.
pub fn source_dir_from_env_or_home() -> Option<PathBuf> {
    dir_from_env_or_home("NII_SOURCE_DIR", "source")
}

/// 获取目标图像目录.
///
/// 1. 若环境变量 `$NII_TARGET_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/nii/target`.
pub fn target_dir_from_env_or_home() -> Option<PathBuf> {
    dir_from_env_or_home("NII_TARGET_DIR", "target")
}

/// 从环境变量构造 [`BunchConfig`], 未设置的项取默认值.
///
/// | 变量          | 字段     |
/// |---------------|----------|
/// | `NII_SPLIT`   | `split`  |
/// | `NII_BS`      | `bs`     |
/// | `NII_DEVICE`  | `device` |
/// | `NII_WORKERS` | `n_jobs` |
/// | `NII_SEED`    | `seed`   |
///
/// 任一变量无法解析时返回 `Err`, 内容为出错的变量名和原值.
pub fn bunch_config_from_env() -> Result<BunchConfig, String> {
    let mut cfg = BunchConfig::default();
    macro_rules! set_from_env {
        ($key: literal, $field: expr, $ty: ty) => {
            if let Some(v) = parse_env::<$ty>($key) {
                $field = v.map_err(|raw| format!("{}={raw}", $key))?.into();
            }
        };
    }
    set_from_env!("NII_SPLIT", cfg.split, f64);
    set_from_env!("NII_BS", cfg.bs, usize);
    set_from_env!("NII_DEVICE", cfg.device, Device);
    set_from_env!("NII_WORKERS", cfg.n_jobs, usize);
    set_from_env!("NII_SEED", cfg.seed, u64);
    if let Some(d) = dataset::home_dataset_dir() {
        cfg.path = d;
    }
    Ok(cfg)
}
