#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 把 NIfTI 格式的 3D 医学影像接入 (源图像, 目标图像) 成对的训练数据管线.
//!
//! 该 crate 本身不做图像解码, 也不做张量运算: 解码交给 `nifti`,
//! 数组交给 `ndarray`, 多线程加载交给 `rayon`. 这里只负责把它们粘起来.
//!
//! # 注意
//!
//! 1. 体数据的轴顺序与文件中保持一致, 即 `(x, y, z, ...)`, 不做转置.
//! 2. 成对文件的对应关系完全依赖排序后的位置. 两个目录中文件名排序不一致时,
//!   训练会 "静默" 地学错, 程序无法察觉.
//!
//! # 功能
//!
//! ### 读取 nii 文件 ✅
//!
//! [`open_nii`] 返回 [`NiiImage`], 解码错误原样向上传递.
//!
//! 实现位于 `nii-berry/src/data`.
//!
//! ### 切片与 3D patch 采样 ✅
//!
//! 1. [`sample::get_slice`]: 按比例位置在某一轴上取一张 2D 切片.
//! 2. [`sample::get_patch3d`]: 以高于全局均值的体素为中心取立方体 patch.
//!
//! 两者都是确定性函数, 随机性由 [`transforms`] 中的变换在调用时注入.
//!
//! ### 像素级数据增强 ✅
//!
//! [`transforms::PixelTransform`] 把上述采样函数包装为可注册的变换,
//! 并保证成对数据 (源, 目标) 共享同一组随机参数.
//!
//! ### 数据集组装 ✅
//!
//! [`dataset::niidatabunch`] 从两个目录组装训练/验证集,
//! 得到可按批次迭代的 [`dataset::DataBunch`].
//!
//! ### 路径工具 ✅
//!
//! [`utils::split_filename`] 与 [`utils::glob_imgs`].

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// nii 文件基础数据结构.
mod data;

pub use data::{open_nii, save_slice_png, NiftiHeaderAttr, NiiImage};

pub mod consts;

mod error;

pub use error::{DatasetError, DatasetResult, SampleError, SampleResult};

pub mod dataset;
pub mod prelude;
pub mod sample;
pub mod transforms;
pub mod utils;
