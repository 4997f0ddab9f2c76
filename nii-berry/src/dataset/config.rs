//! 数据集组装参数.

use crate::consts::{default_workers, DEFAULT_BATCH_SIZE, DEFAULT_SPLIT};
use crate::DatasetError;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

cfg_if::cfg_if! {
    if #[cfg(feature = "serde")] {
        use serde::{Deserialize, Serialize};
    }
}

/// 批次数据的目标设备.
///
/// 这里只是一个标记: 数据始终在主存中组装, 搬运到加速器由下游负责.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Device {
    /// 主存.
    #[default]
    Cpu,

    /// 第 n 块 CUDA 设备.
    Cuda(usize),
}

impl FromStr for Device {
    type Err = DatasetError;

    /// 接受 `cpu`, `cuda` (即 `cuda:0`) 和 `cuda:N`, 不区分大小写.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" => Ok(Self::Cuda(0)),
            other => other
                .strip_prefix("cuda:")
                .and_then(|n| n.parse().ok())
                .map(Self::Cuda)
                .ok_or_else(|| DatasetError::InvalidDevice(s.to_string())),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda(n) => write!(f, "cuda:{n}"),
        }
    }
}

/// [`super::niidatabunch`] 的参数.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BunchConfig {
    /// 验证集比例, 取值 `[0, 1]`.
    pub split: f64,

    /// 数据集根路径, 供下游保存模型等使用.
    pub path: PathBuf,

    /// 批大小.
    pub bs: usize,

    /// 目标设备.
    pub device: Device,

    /// 数据加载工作线程数. 0 视为 1.
    pub n_jobs: usize,

    /// 随机种子. `None` 时从系统熵初始化.
    pub seed: Option<u64>,
}

impl Default for BunchConfig {
    fn default() -> Self {
        Self {
            split: DEFAULT_SPLIT,
            path: PathBuf::from("."),
            bs: DEFAULT_BATCH_SIZE,
            device: Device::Cpu,
            n_jobs: default_workers(),
            seed: None,
        }
    }
}
