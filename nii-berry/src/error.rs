//! 运行时错误.

use std::path::PathBuf;
use thiserror::Error;

/// 采样 (切片 / patch) 与像素级变换的运行时错误.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SampleError {
    /// 输入维度不足. 参数为实际维度数.
    #[error("expected at least 3 dimensions, got {0}")]
    TooFewDims(usize),

    /// 切片轴只能是 0, 1 或 2. 参数为实际给出的轴.
    #[error("slice axis must be 0, 1 or 2, got {0}")]
    InvalidAxis(usize),

    /// 所选轴长度为 0, 无切片可取.
    #[error("axis {0} has zero length")]
    EmptyAxis(usize),

    /// 比例位置不是有限数.
    #[error("fractional position must be finite")]
    InvalidPct,

    /// 没有任何体素高于全局均值 (例如常数体数据).
    #[error("no voxel exceeds the volume mean")]
    NoVoxelAboveMean,

    /// patch 边长为 0 或超过了体数据某一维.
    ///
    /// 第一个参数为 patch 边长, 第二个参数为体数据形状.
    #[error("patch size {0} does not fit into volume of shape {1:?}")]
    PatchTooLarge(usize, Vec<usize>),

    /// 成对数据的形状不一致.
    #[error("shape mismatch: {0:?} vs {1:?}")]
    ShapeMismatch(Vec<usize>, Vec<usize>),
}

/// 采样运行时结果.
pub type SampleResult<T> = Result<T, SampleError>;

/// 数据集组装与加载错误.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// 源图像与目标图像个数不同.
    #[error("number of source ({n_src}) and target ({n_tgt}) images must be equal")]
    CountMismatch {
        /// 源图像个数.
        n_src: usize,
        /// 目标图像个数.
        n_tgt: usize,
    },

    /// 源目录与目标目录都没有图像.
    #[error("number of source and target images must be non-zero")]
    Empty,

    /// 验证集比例不在 `[0, 1]` 内.
    #[error("validation split must be within [0, 1], got {0}")]
    InvalidSplit(f64),

    /// 批大小为 0.
    #[error("batch size must be positive")]
    InvalidBatchSize,

    /// 无法解析的设备描述.
    #[error("unknown device `{0}`")]
    InvalidDevice(String),

    /// 通配模式非法.
    #[error("bad glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    /// 目录遍历时的底层 I/O 错误.
    #[error("io error at {}: {source}", .path.display())]
    Io {
        /// 出错路径.
        path: PathBuf,
        /// 底层错误.
        #[source]
        source: std::io::Error,
    },

    /// nii 解码错误.
    #[error("nifti error: {0}")]
    Nifti(#[from] nifti::NiftiError),

    /// 采样 / 变换错误.
    #[error("sampling error: {0}")]
    Sample(#[from] SampleError),

    /// 同一批次中的样本形状不一致, 无法堆叠.
    #[error("batch contains varying shapes: {0:?} vs {1:?}")]
    ShapeMismatch(Vec<usize>, Vec<usize>),

    /// 工作线程池创建失败.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl From<glob::GlobError> for DatasetError {
    fn from(e: glob::GlobError) -> Self {
        let path = e.path().to_owned();
        Self::Io {
            path,
            source: e.into_error(),
        }
    }
}

/// 数据集运行时结果.
pub type DatasetResult<T> = Result<T, DatasetError>;
