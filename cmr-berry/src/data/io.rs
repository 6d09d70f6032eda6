//! NIfTI 文件读写.
//!
//! NIfTI 数据区按 `[W, H, z]` (Fortran 序) 存储. 本模块读入后统一转换为
//! `(z, H, W)` 的标准布局, 写出时再反转回去. 切片文件的 "z" 轴用来存放通道,
//! 因此单通道图像为 `(1, H, W)`, one-hot 标签为 `(C, H, W)`.

use crate::{PipelineError, PipelineResult};
use ndarray::{Array3, ArrayD, ArrayView3, Axis, Ix3};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use std::path::Path;

/// 将 `[W, H, z]` 转换成 `(z, H, W)`. 二维文件视作 `z == 1`.
fn to_zyx<T: Clone>(data: ArrayD<T>, path: &Path) -> PipelineResult<Array3<T>> {
    let data = match data.ndim() {
        2 => data.insert_axis(Axis(2)),
        3 => data,
        _ => {
            return Err(PipelineError::shape_mismatch(
                format!("`{}` 不是二维或三维体数据", path.display()),
                &[0, 0, 0],
                data.shape(),
            ))
        }
    };
    // hint: 原第一维向下增长, 原第二维向右增长.
    let data = data.into_dimensionality::<Ix3>()?.permuted_axes([2, 1, 0]);
    Ok(data.as_standard_layout().into_owned())
}

/// `(z, H, W)` -> `(H, W, z)`, 即 "通道在后".
#[inline]
fn to_channels_last<T: Clone>(data: Array3<T>) -> Array3<T> {
    data.permuted_axes([1, 2, 0]).as_standard_layout().into_owned()
}

macro_rules! impl_nifti_io {
    ($t: ty, $read: ident, $read_hwc: ident, $write: ident, $what: literal) => {
        #[doc = concat!("读取 ", $what, ", 返回 header 和 `(z, H, W)` 布局的数据.")]
        pub fn $read<P: AsRef<Path>>(path: P) -> PipelineResult<(NiftiHeader, Array3<$t>)> {
            let path = path.as_ref();
            let obj = ReaderOptions::new().read_file(path)?;
            let header = obj.header().clone();
            let data = obj.into_volume().into_ndarray::<$t>()?;
            Ok((header, to_zyx(data, path)?))
        }

        #[doc = concat!("读取 ", $what, ", 并按 `(H, W, C)` (通道在后) 布局返回.")]
        pub fn $read_hwc<P: AsRef<Path>>(path: P) -> PipelineResult<Array3<$t>> {
            let (_, data) = $read(path)?;
            Ok(to_channels_last(data))
        }

        #[doc = concat!("将 `(z, H, W)` 布局的", $what, "写入 `path`. 以 `.gz` 结尾时自动压缩.")]
        pub fn $write<P: AsRef<Path>>(path: P, data: ArrayView3<$t>) -> PipelineResult<()> {
            // (z, H, W) -> [W, H, z]
            let data = data.as_standard_layout();
            WriterOptions::new(path.as_ref()).write_nifti(&data.view().reversed_axes())?;
            Ok(())
        }
    };
}

impl_nifti_io!(f32, read_scan, read_scan_hwc, write_scan, "强度数据");
impl_nifti_io!(u8, read_label, read_label_hwc, write_label, "标签数据");
