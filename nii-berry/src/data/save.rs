//! 切片的持久化存储.

use image::ImageResult;
use ndarray::ArrayView2;
use std::path::Path;

/// 以 **可视化友好** 的方式将 2D 切片保存到 `path`.
///
/// 切片按最小值/最大值线性映射到 `0..=255` 的灰度, 第 0 轴对应图像的行.
/// 常数切片 (或只含非有限值的切片) 保存为全黑.
pub fn save_slice_png<P: AsRef<Path>>(slice: ArrayView2<f32>, path: P) -> ImageResult<()> {
    let (height, width) = slice.dim();
    let (lo, hi) = slice
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = hi - lo;

    let mut buf = image::GrayImage::new(width as u32, height as u32);
    for ((h, w), &v) in slice.indexed_iter() {
        // 255, not 256.
        let gray = if range > 0.0 && v.is_finite() {
            ((v - lo) / range * 255.0) as u8
        } else {
            0
        };
        buf.put_pixel(w as u32, h as u32, image::Luma([gray]));
    }
    buf.save(path)
}
