//! 数据集操作.

use crate::transforms::{PixelTransform, Tfms};
use crate::utils::glob_nii;
use crate::{DatasetError, DatasetResult};
use itertools::Itertools;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::path::{Path, PathBuf};

mod config;
mod item;
mod loader;

pub use config::{BunchConfig, Device};
pub use item::{ItemList, ItemLists, LabelList, LabelLists};
pub use loader::{Batch, BatchIter, DataBunch, DataLoader};

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = home_dataset_dir()?;
    ans.extend(it);
    Some(ans)
}

/// 从 `[0, n)` 中 **有放回地** 抽取 `k` 个索引.
///
/// # 注意
///
/// 有放回抽样可能产生重复索引, 此时验证集实际大小小于 `k`.
fn choice_with_replacement(n: usize, k: usize, rng: &mut dyn RngCore) -> Vec<usize> {
    (0..k).map(|_| rng.random_range(0..n)).collect()
}

/// 从源目录和目标目录组装训练/验证数据.
///
/// 1. 分别收集两个目录下的 nii 文件 (排序后按位置配对);
/// 2. 个数不同或为 0 时返回错误, 此时尚未读取任何文件内容;
/// 3. 有放回地抽取 `floor(split * N)` 个验证集索引, 两侧按同一组索引划分;
/// 4. 两侧共享 `tfms`, 并共享每个样本的随机参数;
/// 5. 按 `cfg` 创建批次加载器.
///
/// # 错误
///
/// 1. `cfg.split` 不在 `[0, 1]` 内: [`DatasetError::InvalidSplit`];
/// 2. `cfg.bs` 为 0: [`DatasetError::InvalidBatchSize`];
/// 3. 两侧文件个数不同: [`DatasetError::CountMismatch`];
/// 4. 两侧都没有文件: [`DatasetError::Empty`];
/// 5. 目录遍历失败或线程池创建失败.
pub fn niidatabunch<P: AsRef<Path>, Q: AsRef<Path>>(
    src_dir: P,
    tgt_dir: Q,
    tfms: Option<Vec<Box<dyn PixelTransform>>>,
    cfg: &BunchConfig,
) -> DatasetResult<DataBunch> {
    if !(0.0..=1.0).contains(&cfg.split) {
        return Err(DatasetError::InvalidSplit(cfg.split));
    }
    if cfg.bs == 0 {
        return Err(DatasetError::InvalidBatchSize);
    }

    let src_fns = glob_nii(src_dir)?;
    let tgt_fns = glob_nii(tgt_dir)?;
    if src_fns.len() != tgt_fns.len() {
        return Err(DatasetError::CountMismatch {
            n_src: src_fns.len(),
            n_tgt: tgt_fns.len(),
        });
    }
    if src_fns.is_empty() {
        return Err(DatasetError::Empty);
    }

    let mut rng = match cfg.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };
    let n = src_fns.len();
    let n_valid = (cfg.split * n as f64).floor() as usize;
    let val_idxs = choice_with_replacement(n, n_valid, &mut rng);
    let unique = val_idxs.iter().unique().count();
    if unique < n_valid {
        warn!("validation draw has duplicates: {unique} unique of {n_valid} requested");
    }

    let srcd = ItemList::new(src_fns).split_by_idx(&val_idxs);
    let tgtd = ItemList::new(tgt_fns).split_by_idx(&val_idxs);
    let tfms: Option<Tfms> = tfms.map(Tfms::from);
    if let Some(t) = &tfms {
        info!(
            "pixel transforms: [{}]",
            t.iter().map(|t| t.name()).join(", ")
        );
    }

    let ll = LabelLists {
        path: cfg.path.clone(),
        train: LabelList::new(srcd.train, tgtd.train, tfms.clone())?,
        valid: LabelList::new(srcd.valid, tgtd.valid, tfms)?,
    };
    DataBunch::create_from_ll(ll, cfg.bs, cfg.device, cfg.n_jobs, Some(rng.next_u64()))
}
