//! 像素级数据增强.
//!
//! 每个变换都是一个 [`PixelTransform`] 对象, 按顺序组成流水线 [`Tfms`].
//! 对成对数据 (源, 目标), 变换默认以同一随机状态分别作用于两侧,
//! 因此两侧得到相同的随机参数.

use crate::sample::{extract_patch, get_patch3d, get_slice, patch_center};
use crate::{SampleError, SampleResult};
use ndarray::{s, ArrayD, Axis, Ix3};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::fmt::Debug;
use std::sync::Arc;

/// 变换流水线. 训练集和验证集共享同一份.
pub type Tfms = Arc<[Box<dyn PixelTransform>]>;

/// 像素级变换.
pub trait PixelTransform: Send + Sync + Debug {
    /// 变换名, 用于日志.
    fn name(&self) -> &'static str;

    /// 对单个数组实施变换. 需要的随机参数从 `rng` 抽取.
    fn apply(&self, x: ArrayD<f32>, rng: &mut dyn RngCore) -> SampleResult<ArrayD<f32>>;

    /// 对一对数组实施变换, 两侧共享随机参数.
    ///
    /// 默认实现从 `rng` 抽取一个种子, 再用两条相同的随机流分别调用 [`Self::apply`].
    fn apply_pair(
        &self,
        x: ArrayD<f32>,
        y: ArrayD<f32>,
        rng: &mut dyn RngCore,
    ) -> SampleResult<(ArrayD<f32>, ArrayD<f32>)> {
        let mut rng_x = StdRng::seed_from_u64(rng.next_u64());
        let mut rng_y = rng_x.clone();
        Ok((self.apply(x, &mut rng_x)?, self.apply(y, &mut rng_y)?))
    }
}

/// 依次对 `(x, y)` 实施流水线中的每个变换.
pub fn apply_tfms_pair(
    tfms: &[Box<dyn PixelTransform>],
    mut x: ArrayD<f32>,
    mut y: ArrayD<f32>,
    rng: &mut dyn RngCore,
) -> SampleResult<(ArrayD<f32>, ArrayD<f32>)> {
    for t in tfms {
        (x, y) = t.apply_pair(x, y, rng)?;
    }
    Ok((x, y))
}

/// 从 `[0, 1)` 均匀抽取比例位置.
#[inline]
fn uniform_pct(rng: &mut dyn RngCore) -> f64 {
    rng.random::<f64>()
}

/// 转为三维视图. 维度不符时返回 [`SampleError::TooFewDims`].
#[inline]
fn as_3d(x: &ArrayD<f32>) -> SampleResult<ndarray::ArrayView3<'_, f32>> {
    x.view()
        .into_dimensionality::<Ix3>()
        .map_err(|_| SampleError::TooFewDims(x.ndim()))
}

/// 在固定轴上取随机切片.
#[derive(Debug, Clone, Copy)]
pub struct RandomSlice {
    /// 切片轴, 0, 1 或 2.
    pub axis: usize,
}

impl PixelTransform for RandomSlice {
    fn name(&self) -> &'static str {
        "random_slice"
    }

    fn apply(&self, x: ArrayD<f32>, rng: &mut dyn RngCore) -> SampleResult<ArrayD<f32>> {
        get_slice(x.view(), uniform_pct(rng), self.axis)
    }
}

/// 取偏向高于均值体素的随机 3D patch.
#[derive(Debug, Clone, Copy)]
pub struct RandomPatch3d {
    /// patch 边长.
    pub ps: usize,
}

impl Default for RandomPatch3d {
    fn default() -> Self {
        Self {
            ps: crate::consts::DEFAULT_PATCH_SIZE,
        }
    }
}

impl PixelTransform for RandomPatch3d {
    fn name(&self) -> &'static str {
        "random_patch3d"
    }

    fn apply(&self, x: ArrayD<f32>, rng: &mut dyn RngCore) -> SampleResult<ArrayD<f32>> {
        Ok(get_patch3d(as_3d(&x)?, uniform_pct(rng), self.ps)?.into_dyn())
    }

    /// 中心只由源图像决定, 目标图像取同一区域.
    fn apply_pair(
        &self,
        x: ArrayD<f32>,
        y: ArrayD<f32>,
        rng: &mut dyn RngCore,
    ) -> SampleResult<(ArrayD<f32>, ArrayD<f32>)> {
        if x.shape() != y.shape() {
            return Err(SampleError::ShapeMismatch(
                x.shape().to_vec(),
                y.shape().to_vec(),
            ));
        }
        let (xv, yv) = (as_3d(&x)?, as_3d(&y)?);
        let center = patch_center(xv, uniform_pct(rng), self.ps)?;
        Ok((
            extract_patch(xv, center, self.ps)?.into_dyn(),
            extract_patch(yv, center, self.ps)?.into_dyn(),
        ))
    }
}

/// 均匀随机位置的立方体裁剪, 输出 `(1, size, size, size)`.
#[derive(Debug, Clone, Copy)]
pub struct RandomCrop3d {
    /// 裁剪边长.
    pub size: usize,
}

impl PixelTransform for RandomCrop3d {
    fn name(&self) -> &'static str {
        "random_crop3d"
    }

    fn apply(&self, x: ArrayD<f32>, rng: &mut dyn RngCore) -> SampleResult<ArrayD<f32>> {
        let v = as_3d(&x)?;
        let (h, w, d) = v.dim();
        let sz = self.size;
        if sz == 0 || sz > h || sz > w || sz > d {
            return Err(SampleError::PatchTooLarge(sz, vec![h, w, d]));
        }
        let i = rng.random_range(0..=h - sz);
        let j = rng.random_range(0..=w - sz);
        let k = rng.random_range(0..=d - sz);
        Ok(v.slice(s![i..i + sz, j..j + sz, k..k + sz])
            .insert_axis(Axis(0))
            .as_standard_layout()
            .into_owned()
            .into_dyn())
    }
}

/// 先在 `axis` 轴上取随机切片, 再做均匀随机位置的方形裁剪, 输出 `(1, size, size)`.
///
/// 输入必须是三维体数据.
#[derive(Debug, Clone, Copy)]
pub struct RandomCrop2d {
    /// 裁剪边长.
    pub size: usize,

    /// 切片轴, 0, 1 或 2.
    pub axis: usize,
}

impl PixelTransform for RandomCrop2d {
    fn name(&self) -> &'static str {
        "random_crop2d"
    }

    fn apply(&self, x: ArrayD<f32>, rng: &mut dyn RngCore) -> SampleResult<ArrayD<f32>> {
        let slice = get_slice(as_3d(&x)?.into_dyn(), uniform_pct(rng), self.axis)?;
        // 三维输入的切片形状总是 `(1, h, w)`.
        let (h, w) = (slice.shape()[1], slice.shape()[2]);
        let sz = self.size;
        if sz == 0 || sz > h || sz > w {
            return Err(SampleError::PatchTooLarge(sz, vec![h, w]));
        }
        let i = rng.random_range(0..=h - sz);
        let j = rng.random_range(0..=w - sz);
        Ok(slice
            .slice(s![.., i..i + sz, j..j + sz])
            .to_owned()
            .into_dyn())
    }
}

/// 在最前面补一个长度为 1 的通道轴.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddChannel;

impl PixelTransform for AddChannel {
    fn name(&self) -> &'static str {
        "add_channel"
    }

    fn apply(&self, x: ArrayD<f32>, _rng: &mut dyn RngCore) -> SampleResult<ArrayD<f32>> {
        Ok(x.insert_axis(Axis(0)))
    }
}

/// 标准化为零均值、单位标准差. 标准差为 0 时只做去均值.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalize;

impl PixelTransform for Normalize {
    fn name(&self) -> &'static str {
        "normalize"
    }

    fn apply(&self, mut x: ArrayD<f32>, _rng: &mut dyn RngCore) -> SampleResult<ArrayD<f32>> {
        if x.is_empty() {
            return Ok(x);
        }
        let n = x.len() as f64;
        let mean = x.iter().map(|&v| v as f64).sum::<f64>() / n;
        let var = x.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
        let std = var.sqrt();
        let scale = if std > 0.0 { std } else { 1.0 };
        x.mapv_inplace(|v| ((v as f64 - mean) / scale) as f32);
        Ok(x)
    }
}
