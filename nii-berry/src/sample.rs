//! 切片与 3D patch 采样.
//!
//! 所有函数都是确定性的: 比例位置 `pct` 由调用方 (通常是
//! [`crate::transforms`] 中的随机变换) 给出, 这里不抽取随机数.

use crate::{Idx3d, SampleError, SampleResult};
use ndarray::{s, Array4, ArrayD, ArrayView3, ArrayViewD, Axis};
use num::ToPrimitive;

/// 把比例位置 `pct` 映射到长度为 `len` 的轴上的索引, 结果夹在 `[0, len - 1]` 内.
///
/// `len` 必须非零.
#[inline]
fn pct_to_index(len: usize, pct: f64) -> usize {
    debug_assert_ne!(len, 0);
    let raw = (len as f64 * pct).floor();
    if raw <= 0.0 {
        0
    } else {
        (raw as usize).min(len - 1)
    }
}

/// 在第 `axis` 轴上按比例位置 `pct` 取一张切片, 并在最前面补一个长度为 1 的通道轴.
///
/// 切片索引为 `floor(len * pct)`, 并夹在合法范围内, 因此 `pct == 1.0` 取最后一张.
/// 输入至少三维; 多于三维时, 其余轴原样保留.
///
/// # 错误
///
/// 1. 输入少于三维: [`SampleError::TooFewDims`];
/// 2. `axis` 不是 0, 1, 2: [`SampleError::InvalidAxis`];
/// 3. 所选轴长度为 0: [`SampleError::EmptyAxis`];
/// 4. `pct` 不是有限数: [`SampleError::InvalidPct`].
pub fn get_slice<T: Clone>(x: ArrayViewD<T>, pct: f64, axis: usize) -> SampleResult<ArrayD<T>> {
    if x.ndim() < 3 {
        return Err(SampleError::TooFewDims(x.ndim()));
    }
    if axis > 2 {
        return Err(SampleError::InvalidAxis(axis));
    }
    if !pct.is_finite() {
        return Err(SampleError::InvalidPct);
    }
    let len = x.len_of(Axis(axis));
    if len == 0 {
        return Err(SampleError::EmptyAxis(axis));
    }

    let index = pct_to_index(len, pct);
    Ok(x.index_axis_move(Axis(axis), index)
        .insert_axis(Axis(0))
        .as_standard_layout()
        .into_owned())
}

/// 计算 3D patch 的中心.
///
/// 1. 收集所有强度严格大于全局均值的体素坐标 (行优先序);
/// 2. 取其中第 `floor(count * pct) - 1` 个, 结果为 `-1` 时取最后一个,
///   越界时同样取最后一个;
/// 3. 把每个轴上的坐标夹到 `[ps / 2, dim - ps / 2 - ps % 2]` 内,
///   以保证 [`extract_patch`] 取出的立方体完全位于体数据内.
///
/// # 错误
///
/// 1. `ps` 为 0 或超过任一维: [`SampleError::PatchTooLarge`];
/// 2. `pct` 不是有限数: [`SampleError::InvalidPct`];
/// 3. 没有体素高于均值: [`SampleError::NoVoxelAboveMean`].
pub fn patch_center<T>(x: ArrayView3<T>, pct: f64, ps: usize) -> SampleResult<Idx3d>
where
    T: Copy + ToPrimitive,
{
    let (h, w, d) = x.dim();
    if ps == 0 || ps > h || ps > w || ps > d {
        return Err(SampleError::PatchTooLarge(ps, vec![h, w, d]));
    }
    if !pct.is_finite() {
        return Err(SampleError::InvalidPct);
    }

    let value = |v: &T| v.to_f64().unwrap_or(f64::NAN);
    let mean = x.iter().map(value).sum::<f64>() / x.len() as f64;
    let above: Vec<Idx3d> = x
        .indexed_iter()
        .filter_map(|(pos, v)| (value(v) > mean).then_some(pos))
        .collect();
    if above.is_empty() {
        return Err(SampleError::NoVoxelAboveMean);
    }

    let count = above.len();
    // `as` 饱和转换, 极端的 `pct` 不会溢出.
    let c = ((count as f64 * pct).floor() as i64).saturating_sub(1);
    let c = if c < 0 { count - 1 } else { (c as usize).min(count - 1) };
    let (i, j, k) = above[c];

    let half = ps / 2;
    let clamp = |v: usize, dim: usize| v.clamp(half, dim - half - ps % 2);
    Ok((clamp(i, h), clamp(j, w), clamp(k, d)))
}

/// 以 `center` 为中心取边长 `ps` 的立方体, 并补一个长度为 1 的通道轴.
///
/// 每个轴取 `[c - ps / 2, c + ps / 2 + ps % 2)`. 越界时返回
/// [`SampleError::PatchTooLarge`].
pub fn extract_patch<T: Clone>(x: ArrayView3<T>, center: Idx3d, ps: usize) -> SampleResult<Array4<T>> {
    let (h, w, d) = x.dim();
    let half = ps / 2;
    let odd = ps % 2;
    let (i, j, k) = center;
    let fits = |c: usize, dim: usize| c >= half && c + half + odd <= dim;
    if ps == 0 || !fits(i, h) || !fits(j, w) || !fits(k, d) {
        return Err(SampleError::PatchTooLarge(ps, vec![h, w, d]));
    }

    Ok(x.slice(s![
        i - half..i + half + odd,
        j - half..j + half + odd,
        k - half..k + half + odd
    ])
    .insert_axis(Axis(0))
    .as_standard_layout()
    .into_owned())
}

/// 取一个偏向高于均值体素的随机 3D patch, 形状为 `(1, ps, ps, ps)`.
///
/// 中心由 [`patch_center`] 决定, 立方体由 [`extract_patch`] 取出.
/// 常数体数据 (没有体素高于均值) 会返回 `Err` 而不是 patch.
pub fn get_patch3d<T>(x: ArrayView3<T>, pct: f64, ps: usize) -> SampleResult<Array4<T>>
where
    T: Copy + ToPrimitive,
{
    let center = patch_center(x.view(), pct, ps)?;
    extract_patch(x, center, ps)
}
