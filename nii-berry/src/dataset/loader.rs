//! 批次加载.
//!
//! 每个批次内的样本在共享的 `rayon` 线程池中并行读取和变换,
//! 结果顺序与索引顺序一致.

use super::config::Device;
use super::item::{LabelList, LabelLists};
use crate::{DatasetError, DatasetResult};
use log::{debug, info};
use ndarray::{ArrayD, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// 一个批次. 第 0 轴为批次轴.
#[derive(Debug, Clone)]
pub struct Batch {
    /// 源图像堆叠.
    pub x: ArrayD<f32>,

    /// 目标图像堆叠.
    pub y: ArrayD<f32>,

    /// 目标设备标记.
    pub device: Device,

    /// 本批次样本在所属列表中的索引.
    pub indices: Vec<usize>,
}

impl Batch {
    /// 批次中的样本数.
    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// 是否为空. 正常产生的批次总是非空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// 由 (轮次种子, 样本索引) 派生单个样本的随机种子.
#[inline]
fn item_seed(epoch_seed: u64, index: usize) -> u64 {
    epoch_seed ^ (index as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// 沿新的第 0 轴堆叠. 形状不一致时返回 [`DatasetError::ShapeMismatch`].
fn collate(arrs: &[ArrayD<f32>]) -> DatasetResult<ArrayD<f32>> {
    let first = arrs.first().map(|a| a.shape().to_vec()).unwrap_or_default();
    if let Some(bad) = arrs.iter().find(|a| a.shape() != first.as_slice()) {
        return Err(DatasetError::ShapeMismatch(first, bad.shape().to_vec()));
    }
    let views: Vec<_> = arrs.iter().map(|a| a.view()).collect();
    ndarray::stack(Axis(0), &views).map_err(|_| DatasetError::ShapeMismatch(first.clone(), first))
}

/// 按批次迭代 [`LabelList`] 的加载器.
#[derive(Debug)]
pub struct DataLoader {
    ds: LabelList,
    bs: usize,
    shuffle: bool,
    drop_last: bool,
    device: Device,
    pool: Arc<ThreadPool>,
    seed: u64,
    epoch: AtomicU64,
}

impl DataLoader {
    /// 构造加载器.
    ///
    /// 1. `shuffle` 为 `true` 时每轮迭代都重新打乱顺序;
    /// 2. `drop_last` 为 `true` 时丢弃最后一个不满的批次.
    ///
    /// `bs` 为 0 时返回 [`DatasetError::InvalidBatchSize`].
    pub fn new(
        ds: LabelList,
        bs: usize,
        shuffle: bool,
        drop_last: bool,
        device: Device,
        pool: Arc<ThreadPool>,
        seed: u64,
    ) -> DatasetResult<Self> {
        if bs == 0 {
            return Err(DatasetError::InvalidBatchSize);
        }
        Ok(Self {
            ds,
            bs,
            shuffle,
            drop_last,
            device,
            pool,
            seed,
            epoch: AtomicU64::new(0),
        })
    }

    /// 底层成对列表.
    #[inline]
    pub fn dataset(&self) -> &LabelList {
        &self.ds
    }

    /// 批大小.
    #[inline]
    pub fn batch_size(&self) -> usize {
        self.bs
    }

    /// 目标设备.
    #[inline]
    pub fn device(&self) -> Device {
        self.device
    }

    /// 每轮的批次数.
    pub fn len(&self) -> usize {
        let n = self.ds.len();
        if self.drop_last {
            n / self.bs
        } else {
            n.div_ceil(self.bs)
        }
    }

    /// 每轮是否没有任何批次.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 开始新的一轮迭代.
    ///
    /// 每次调用轮次计数加一; 给定种子时, 第 n 轮的顺序与随机变换参数是确定的.
    pub fn iter(&self) -> BatchIter<'_> {
        self.epoch_iter(self.epoch.fetch_add(1, Ordering::Relaxed))
    }

    /// 预览下一轮迭代, 不推进轮次计数.
    ///
    /// 产出的批次与随后一次 [`Self::iter`] 完全相同.
    pub fn peek(&self) -> BatchIter<'_> {
        self.epoch_iter(self.epoch.load(Ordering::Relaxed))
    }

    fn epoch_iter(&self, epoch: u64) -> BatchIter<'_> {
        let mut rng = StdRng::seed_from_u64(self.seed ^ epoch.wrapping_mul(0xD1B5_4A32_D192_ED03));
        let mut order: Vec<usize> = (0..self.ds.len()).collect();
        if self.shuffle {
            order.shuffle(&mut rng);
        }
        BatchIter {
            dl: self,
            order,
            cursor: 0,
            epoch_seed: rng.next_u64(),
        }
    }

    /// 并行读取并堆叠 `indices` 对应的样本.
    ///
    /// 多个样本出错时, 返回批次内位置最靠前的那个错误.
    fn load_batch(&self, indices: &[usize], epoch_seed: u64) -> DatasetResult<Batch> {
        let loaded: Vec<DatasetResult<_>> = self.pool.install(|| {
            indices
                .par_iter()
                .map(|&i| {
                    let mut rng = StdRng::seed_from_u64(item_seed(epoch_seed, i));
                    self.ds.get(i, &mut rng)
                })
                .collect()
        });
        let pairs = loaded.into_iter().collect::<DatasetResult<Vec<_>>>()?;
        let (xs, ys): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        let x = collate(&xs)?;
        let y = collate(&ys)?;
        debug!("loaded batch of {}, x {:?}, y {:?}", indices.len(), x.shape(), y.shape());

        Ok(Batch {
            x,
            y,
            device: self.device,
            indices: indices.to_vec(),
        })
    }
}

/// 一轮迭代. 每次产出一个批次, 或该批次中位置最靠前的出错样本的错误.
#[derive(Debug)]
pub struct BatchIter<'a> {
    dl: &'a DataLoader,
    order: Vec<usize>,
    cursor: usize,
    epoch_seed: u64,
}

impl Iterator for BatchIter<'_> {
    type Item = DatasetResult<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.order.len();
        if self.cursor >= n {
            return None;
        }
        let end = (self.cursor + self.dl.bs).min(n);
        if self.dl.drop_last && end - self.cursor < self.dl.bs {
            self.cursor = n;
            return None;
        }
        let start = std::mem::replace(&mut self.cursor, end);
        Some(self.dl.load_batch(&self.order[start..end], self.epoch_seed))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.order.len() - self.cursor;
        let n = if self.dl.drop_last {
            rest / self.dl.bs
        } else {
            rest.div_ceil(self.dl.bs)
        };
        (n, Some(n))
    }
}

impl ExactSizeIterator for BatchIter<'_> {}

/// 训练集与验证集加载器.
#[derive(Debug)]
pub struct DataBunch {
    /// 数据集根路径.
    pub path: PathBuf,

    /// 目标设备.
    pub device: Device,

    /// 训练集加载器: 每轮打乱, 丢弃不满的最后批次.
    pub train_dl: DataLoader,

    /// 验证集加载器: 保持顺序, 保留最后批次.
    pub valid_dl: DataLoader,
}

impl DataBunch {
    /// 从成对列表创建.
    ///
    /// 两个加载器共享一个 `num_workers` 线程的工作池 (0 视为 1).
    /// `seed` 为 `None` 时从系统熵初始化.
    pub fn create_from_ll(
        ll: LabelLists,
        bs: usize,
        device: Device,
        num_workers: usize,
        seed: Option<u64>,
    ) -> DatasetResult<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_workers.max(1))
            .thread_name(|i| format!("nii-loader-{i}"))
            .build()?;
        let pool = Arc::new(pool);

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let (train_seed, valid_seed) = (rng.random(), rng.random());

        let LabelLists { path, train, valid } = ll;
        info!(
            "data bunch: {} train / {} valid pairs, bs {bs}, {} worker(s), device {device}",
            train.len(),
            valid.len(),
            pool.current_num_threads()
        );
        let train_dl = DataLoader::new(train, bs, true, true, device, pool.clone(), train_seed)?;
        let valid_dl = DataLoader::new(valid, bs, false, false, device, pool, valid_seed)?;

        Ok(Self {
            path,
            device,
            train_dl,
            valid_dl,
        })
    }

    /// 训练集.
    #[inline]
    pub fn train_ds(&self) -> &LabelList {
        self.train_dl.dataset()
    }

    /// 验证集.
    #[inline]
    pub fn valid_ds(&self) -> &LabelList {
        self.valid_dl.dataset()
    }

    /// 训练集与验证集的样本对总数.
    #[inline]
    pub fn len_items(&self) -> usize {
        self.train_ds().len() + self.valid_ds().len()
    }

    /// 取验证集第一个批次, 常用于检查形状.
    ///
    /// 不推进验证集的轮次计数, 因此不影响之后的迭代.
    pub fn one_batch(&self) -> Option<DatasetResult<Batch>> {
        self.valid_dl.peek().next()
    }
}
