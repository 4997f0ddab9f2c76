use std::ops::Index;
use std::path::Path;

use log::debug;
use ndarray::{ArrayD, ArrayViewD};
use ndarray_npy::WriteNpyError;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

mod save;

pub use save::save_slice_png;

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// 内存中的 nii 图像. 体素值以 `f32` 保存, 轴顺序与文件一致.
///
/// 数据一经加载即不可变. 需要修改时请用 [`NiiImage::into_array`] 取出数组.
#[derive(Debug, Clone)]
pub struct NiiImage {
    header: Option<BoxedHeader>,
    data: ArrayD<f32>,
}

/// 打开 nii 文件 (`.nii` 或 `.nii.gz`), 返回 [`NiiImage`].
///
/// 除解码器本身的检查外不做任何校验; 文件缺失、格式错误等均原样返回 `Err`.
#[inline]
pub fn open_nii<P: AsRef<Path>>(path: P) -> nifti::Result<NiiImage> {
    NiiImage::open(path)
}

/// 保证数组为行优先布局.
#[inline]
fn standardize(data: ArrayD<f32>) -> ArrayD<f32> {
    if data.is_standard_layout() {
        data
    } else {
        data.as_standard_layout().into_owned()
    }
}

/// nii 图像 header 的共用属性.
pub trait NiftiHeaderAttr {
    /// 获取 header 部分. 内存中直接构造的图像没有 header.
    fn header(&self) -> Option<&NiftiHeader>;

    /// 数据维度数.
    fn ndim(&self) -> usize;

    /// 获取每个轴上的体素分辨率 (通常以毫米为单位), 顺序与数据轴一致.
    ///
    /// 没有 header 时, 每个轴都视为 `1.0`.
    fn pix_dim(&self) -> Vec<f64> {
        let n = self.ndim().min(7);
        match self.header() {
            Some(h) => h.pixdim[1..=n].iter().map(|&p| p as f64).collect(),
            None => vec![1.0; n],
        }
    }

    /// 获取体素的实际体积值 (前三个轴分辨率之积).
    #[inline]
    fn voxel(&self) -> f64 {
        self.pix_dim().iter().take(3).product()
    }

    /// 体素分辨率在前三个维度上是否是各向同的?
    fn is_isotropic(&self) -> bool {
        let p = self.pix_dim();
        p.iter().take(3).all(|&v| v == p[0])
    }

    /// header 中的描述字段. 没有 header 或描述为空时返回 `None`.
    fn description(&self) -> Option<String> {
        let raw = &self.header()?.descrip;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        let s = String::from_utf8_lossy(&raw[..end]).trim().to_string();
        (!s.is_empty()).then_some(s)
    }
}

impl NiftiHeaderAttr for NiiImage {
    #[inline]
    fn header(&self) -> Option<&NiftiHeader> {
        self.header.as_deref()
    }

    #[inline]
    fn ndim(&self) -> usize {
        self.data.ndim()
    }
}

impl Index<&[usize]> for NiiImage {
    type Output = f32;

    #[inline]
    fn index(&self, index: &[usize]) -> &Self::Output {
        &self.data[index]
    }
}

impl From<ArrayD<f32>> for NiiImage {
    #[inline]
    fn from(data: ArrayD<f32>) -> Self {
        Self::from_array(data)
    }
}

impl NiiImage {
    /// 打开 nii 文件格式的图像. `path` 为 nii 文件的本地路径.
    /// 如果打开成功, 则返回 `Ok(Self)`, 否则返回 `Err`.
    pub fn open<P: AsRef<Path>>(path: P) -> nifti::Result<Self> {
        let path = path.as_ref();
        let obj = ReaderOptions::new().read_file(path)?;
        let header = Box::new(obj.header().clone());

        // nifti 数据本身按列优先排列, 这里转成行优先, 逻辑索引不变.
        let data = standardize(obj.into_volume().into_ndarray::<f32>()?);
        debug!("opened `{}`, shape {:?}", path.display(), data.shape());

        Ok(Self {
            header: Some(header),
            data,
        })
    }

    /// 从内存数组直接构造图像, 不带 header.
    #[inline]
    pub fn from_array(data: ArrayD<f32>) -> Self {
        Self {
            header: None,
            data: standardize(data),
        }
    }

    /// 获取数据形状.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// 获取体素个数.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayViewD<'_, f32> {
        self.data.view()
    }

    /// 取出底层数组.
    #[inline]
    pub fn into_array(self) -> ArrayD<f32> {
        self.data
    }

    /// 以 `.npy` 格式将数据写入 `path`.
    pub fn save_npy<P: AsRef<Path>>(&self, path: P) -> Result<(), WriteNpyError> {
        ndarray_npy::write_npy(path, &self.data)
    }
}
