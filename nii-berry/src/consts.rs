//! 通用常量.

/// 默认的 nii 文件通配模式, 同时匹配 `.nii` 与 `.nii.gz`.
pub const DEFAULT_NII_PATTERN: &str = "*.nii*";

/// 默认的 3D patch 边长.
pub const DEFAULT_PATCH_SIZE: usize = 64;

/// 默认的验证集比例.
pub const DEFAULT_SPLIT: f64 = 0.2;

/// 默认的批大小.
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// 默认工作线程数的上限.
pub const MAX_DEFAULT_WORKERS: usize = 16;

/// 获得默认的数据加载工作线程数: 可并行核心数, 但不超过 [`MAX_DEFAULT_WORKERS`].
pub fn default_workers() -> usize {
    let cpus = std::thread::available_parallelism().map_or_else(|_| num_cpus::get(), usize::from);
    cpus.clamp(1, MAX_DEFAULT_WORKERS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_workers_in_range() {
        let n = default_workers();
        assert!((1..=MAX_DEFAULT_WORKERS).contains(&n));
    }
}
