//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::Idx3d;

pub use crate::data::{open_nii, save_slice_png, NiftiHeaderAttr, NiiImage};
pub use crate::{DatasetError, DatasetResult, SampleError, SampleResult};

pub use crate::consts::{default_workers, DEFAULT_NII_PATTERN, DEFAULT_PATCH_SIZE};

pub use crate::dataset::{niidatabunch, Batch, BunchConfig, DataBunch, Device, LabelList};
pub use crate::sample::{get_patch3d, get_slice};
pub use crate::transforms::{
    AddChannel, Normalize, PixelTransform, RandomCrop2d, RandomCrop3d, RandomPatch3d,
    RandomSlice,
};
pub use crate::utils::{glob_imgs, glob_nii, split_filename};
