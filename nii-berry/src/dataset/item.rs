//! 文件列表与成对标签列表.
//!
//! 列表只保存路径, 数据在访问时才从硬盘读取.

use crate::transforms::{apply_tfms_pair, Tfms};
use crate::utils::glob_nii;
use crate::{open_nii, DatasetError, DatasetResult, NiiImage};
use ndarray::ArrayD;
use rand::RngCore;
use std::path::{Path, PathBuf};

/// 有序的 nii 文件列表.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemList {
    items: Vec<PathBuf>,
}

/// 按索引划分后的 (训练, 验证) 文件列表.
#[derive(Debug, Clone, Default)]
pub struct ItemLists {
    /// 训练部分.
    pub train: ItemList,

    /// 验证部分.
    pub valid: ItemList,
}

impl From<Vec<PathBuf>> for ItemList {
    #[inline]
    fn from(items: Vec<PathBuf>) -> Self {
        Self::new(items)
    }
}

impl ItemList {
    /// 直接从路径列表构造. 顺序保持不变.
    #[inline]
    pub fn new(items: Vec<PathBuf>) -> Self {
        Self { items }
    }

    /// 收集目录 `dir` 下的所有 nii 文件 (按字典序).
    pub fn from_folder<P: AsRef<Path>>(dir: P) -> DatasetResult<Self> {
        glob_nii(dir).map(Self::new)
    }

    /// 文件个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// 是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 全部路径.
    #[inline]
    pub fn items(&self) -> &[PathBuf] {
        &self.items
    }

    /// 打开第 `index` 个文件.
    ///
    /// 当 `index` 越界时 panic.
    #[inline]
    pub fn get(&self, index: usize) -> nifti::Result<NiiImage> {
        open_nii(&self.items[index])
    }

    /// 按验证集索引划分.
    ///
    /// `valid_idx` 视为集合: 重复索引只计一次. 验证部分按索引升序排列,
    /// 训练部分为其余文件, 保持原顺序. 因此两部分长度之和总等于 `self.len()`.
    ///
    /// 如果存在越界索引, 则程序 panic.
    pub fn split_by_idx(&self, valid_idx: &[usize]) -> ItemLists {
        let mut mask = vec![false; self.len()];
        for &i in valid_idx {
            mask[i] = true;
        }

        let mut lists = ItemLists::default();
        for (path, is_valid) in self.items.iter().zip(mask) {
            let dst = if is_valid {
                &mut lists.valid
            } else {
                &mut lists.train
            };
            dst.items.push(path.clone());
        }
        lists
    }
}

/// 位置对齐的 (源图像, 目标图像) 列表, 附带共享的像素级变换.
#[derive(Debug, Clone)]
pub struct LabelList {
    x: ItemList,
    y: ItemList,
    tfms: Option<Tfms>,
}

impl LabelList {
    /// 构造成对列表. 两侧长度不同时返回 [`DatasetError::CountMismatch`].
    ///
    /// 同一位置的源图像与目标图像必须一一对应, 否则程序行为未定义.
    pub fn new(x: ItemList, y: ItemList, tfms: Option<Tfms>) -> DatasetResult<Self> {
        if x.len() != y.len() {
            return Err(DatasetError::CountMismatch {
                n_src: x.len(),
                n_tgt: y.len(),
            });
        }
        Ok(Self { x, y, tfms })
    }

    /// 样本对个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// 是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// 源图像列表.
    #[inline]
    pub fn x(&self) -> &ItemList {
        &self.x
    }

    /// 目标图像列表.
    #[inline]
    pub fn y(&self) -> &ItemList {
        &self.y
    }

    /// 像素级变换流水线.
    #[inline]
    pub fn tfms(&self) -> Option<&Tfms> {
        self.tfms.as_ref()
    }

    /// 打开第 `index` 对图像, 不做任何变换.
    ///
    /// 当 `index` 越界时 panic.
    pub fn open(&self, index: usize) -> nifti::Result<(NiiImage, NiiImage)> {
        Ok((self.x.get(index)?, self.y.get(index)?))
    }

    /// 打开第 `index` 对图像并实施变换, 两侧共享随机参数.
    ///
    /// 当 `index` 越界时 panic.
    pub fn get(
        &self,
        index: usize,
        rng: &mut dyn RngCore,
    ) -> DatasetResult<(ArrayD<f32>, ArrayD<f32>)> {
        let (x, y) = self.open(index)?;
        let (x, y) = (x.into_array(), y.into_array());
        match &self.tfms {
            Some(tfms) => Ok(apply_tfms_pair(tfms, x, y, rng)?),
            None => Ok((x, y)),
        }
    }
}

/// 训练集与验证集的成对列表.
#[derive(Debug, Clone)]
pub struct LabelLists {
    /// 数据集根路径.
    pub path: PathBuf,

    /// 训练集.
    pub train: LabelList,

    /// 验证集.
    pub valid: LabelList,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(names: &[&str]) -> ItemList {
        ItemList::new(names.iter().map(PathBuf::from).collect())
    }

    #[test]
    fn test_split_by_idx() {
        let l = items(&["a", "b", "c", "d", "e"]);
        let s = l.split_by_idx(&[3, 1]);
        assert_eq!(s.valid, items(&["b", "d"]));
        assert_eq!(s.train, items(&["a", "c", "e"]));
    }

    #[test]
    fn test_split_by_idx_duplicates_counted_once() {
        let l = items(&["a", "b", "c"]);
        let s = l.split_by_idx(&[2, 2, 2]);
        assert_eq!(s.valid, items(&["c"]));
        assert_eq!(s.train.len() + s.valid.len(), l.len());
    }

    #[test]
    fn test_split_by_idx_empty() {
        let l = items(&["a", "b"]);
        let s = l.split_by_idx(&[]);
        assert!(s.valid.is_empty());
        assert_eq!(s.train, l);
    }

    #[test]
    #[should_panic]
    fn test_split_by_idx_out_of_range() {
        items(&["a"]).split_by_idx(&[1]);
    }

    #[test]
    fn test_label_list_len_mismatch() {
        let r = LabelList::new(items(&["a", "b"]), items(&["a"]), None);
        assert!(matches!(
            r,
            Err(DatasetError::CountMismatch { n_src: 2, n_tgt: 1 })
        ));
    }
}
