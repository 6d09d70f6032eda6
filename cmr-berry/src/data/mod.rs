//! 3D MRI 体数据.

use std::path::Path;

use ndarray::{Array3, ArrayView3};
use nifti::NiftiHeader;

use crate::{Idx3d, PipelineError, PipelineResult};

pub mod io;
pub mod naming;

/// 放在堆上, 体数据在加载器之间移动时只搬运指针.
type BoxedHeader = Box<NiftiHeader>;

/// 3D MRI nii 文件 header 的共用属性.
pub trait NiftiHeaderAttr {
    /// 获取 header 部分.
    fn header(&self) -> &NiftiHeader;

    /// 获取单个体素分辨率. 该分辨率以毫米为单位, 分别代表空间 (相邻切片方向),
    /// 高 (自然图像的垂直方向), 宽 (自然图像的水平方向).
    #[inline]
    fn pix_dim(&self) -> [f64; 3] {
        let [_, w, h, z, ..] = self.header().pixdim;
        [z as f64, h as f64, w as f64]
    }
}

macro_rules! impl_volume {
    ($volume: ident, $elem: ty, $read: path) => {
        impl NiftiHeaderAttr for $volume {
            #[inline]
            fn header(&self) -> &NiftiHeader {
                &self.header
            }
        }

        impl $volume {
            /// 打开 nii 文件格式的 3D 体数据. `path` 为 nii 文件的本地路径.
            /// 如果打开成功, 则返回 `Ok(Self)`, 否则返回 `Err`.
            pub fn open<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
                let (header, data) = $read(path)?;
                Ok(Self {
                    header: Box::new(header),
                    data,
                })
            }

            /// 由 `(z, H, W)` 布局的裸数据直接创建, header 取默认值.
            pub fn from_array(data: Array3<$elem>) -> Self {
                Self {
                    header: Box::default(),
                    data,
                }
            }

            /// 数据形状 `(z, H, W)`.
            #[inline]
            pub fn shape(&self) -> Idx3d {
                self.data.dim()
            }

            /// 获得数据的一份不可变 shallow copy.
            #[inline]
            pub fn data(&self) -> ArrayView3<'_, $elem> {
                self.data.view()
            }
        }
    };
}

/// nii 格式 3D MRI 扫描, 包括 header 和强度数据. 强度以 `f32` 保存.
#[derive(Debug, Clone)]
pub struct MriScan {
    header: BoxedHeader,
    data: Array3<f32>,
}

/// nii 格式 3D MRI 标注, 包括 header 和类别标签. 标签值以 `u8` 保存.
#[derive(Debug, Clone)]
pub struct MriLabel {
    header: BoxedHeader,
    data: Array3<u8>,
}

impl_volume!(MriScan, f32, io::read_scan);
impl_volume!(MriLabel, u8, io::read_label);

/// nii 格式的 3D MRI 扫描与对应的标注.
///
/// 两者形状一致由构造函数保证.
#[derive(Debug, Clone)]
pub struct MriData3d {
    scan: MriScan,
    label: MriLabel,
}

impl MriData3d {
    /// 组合扫描与标注. 两者的切片个数或平面形状不一致时返回
    /// [`PipelineError::ShapeMismatch`].
    pub fn new(scan: MriScan, label: MriLabel) -> PipelineResult<Self> {
        let (sz, sh, sw) = scan.shape();
        let (lz, lh, lw) = label.shape();
        if (sz, sh, sw) != (lz, lh, lw) {
            return Err(PipelineError::shape_mismatch(
                "MRI 扫描和标注形状不一致",
                &[sz, sh, sw],
                &[lz, lh, lw],
            ));
        }
        Ok(Self { scan, label })
    }

    /// 分别打开 nii 文件格式的 3D 扫描和对应标注.
    /// 如果任一文件打开失败或两者形状不一致, 则返回 `Err`.
    pub fn open(scan_path: impl AsRef<Path>, label_path: impl AsRef<Path>) -> PipelineResult<Self> {
        let scan = MriScan::open(scan_path.as_ref())?;
        let label = MriLabel::open(label_path.as_ref())?;
        Self::new(scan, label)
    }

    /// 3D 扫描.
    #[inline]
    pub fn scan(&self) -> &MriScan {
        &self.scan
    }

    /// 3D 标注.
    #[inline]
    pub fn label(&self) -> &MriLabel {
        &self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_mismatch_fails_fast() {
        let scan = MriScan::from_array(Array3::zeros((3, 4, 4)));
        let label = MriLabel::from_array(Array3::zeros((2, 4, 4)));
        match MriData3d::new(scan, label) {
            Err(PipelineError::ShapeMismatch {
                expected, found, ..
            }) => {
                assert_eq!(expected, vec![3, 4, 4]);
                assert_eq!(found, vec![2, 4, 4]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_in_plane_mismatch_fails_fast() {
        let scan = MriScan::from_array(Array3::zeros((2, 4, 5)));
        let label = MriLabel::from_array(Array3::zeros((2, 4, 4)));
        assert!(MriData3d::new(scan, label).is_err());
    }

    #[test]
    fn test_accessors() {
        let scan = MriScan::from_array(Array3::from_shape_fn((2, 3, 4), |(z, _, _)| z as f32));
        let label = MriLabel::from_array(Array3::zeros((2, 3, 4)));
        let data = MriData3d::new(scan, label).unwrap();
        assert_eq!(data.scan().shape(), (2, 3, 4));
        assert_eq!(data.scan().data()[(1, 2, 3)], 1.0);
        assert_eq!(data.label().pix_dim().len(), 3);
    }
}
