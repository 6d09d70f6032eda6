//! 3D 体数据的重采样与切片.
//!
//! 对每个受试者:
//!
//! 1. 图像逐层双线性重采样 (缩小时先做高斯抗混叠);
//! 2. 标签先编码到 `[0, 1]` (`value / 255`), 逐层最近邻重采样,
//!    再以 `round(x * 255)` 还原为整数类别;
//! 3. 每层写出 `(1, H, W)` 的图像文件和 `(C, H, W)` 的 one-hot 标签文件.

use crate::config::{PipelineConfig, SliceConfig};
use crate::consts::LABEL_UNIT_SCALE;
use crate::dataset::generic::{self, RawNaming};
use crate::io::{write_label, write_scan};
use crate::naming::SliceKey;
use crate::resample::ResizeSpec;
use crate::{MriData3d, NiftiHeaderAttr, PipelineError, PipelineResult};
use log::{debug, info, warn};
use ndarray::{Array, Array2, Array3, ArrayView, ArrayView2, Axis, Dimension, Zip};
use std::fs;
use std::path::{Path, PathBuf};

/// 将整数标签编码为 `[0, 1]` 内的浮点数.
#[inline]
pub fn encode_label_unit<D: Dimension>(label: ArrayView<u8, D>) -> Array<f32, D> {
    label.mapv(|v| v as f32 / LABEL_UNIT_SCALE)
}

/// 由 `[0, 1]` 编码还原整数标签: `round(x * 255)`.
#[inline]
pub fn recover_label(unit: ArrayView2<f32>) -> Array2<u8> {
    unit.mapv(|v| (v * LABEL_UNIT_SCALE).round().clamp(0.0, 255.0) as u8)
}

/// 生成 `(n_class, H, W)` 的 one-hot 标签. 第 `c` 个通道为 `label == c`.
///
/// 存在 `>= n_class` 的标签值时返回 [`PipelineError::LabelOutOfRange`].
pub fn one_hot(label: ArrayView2<u8>, n_class: usize) -> PipelineResult<Array3<u8>> {
    if let Some(&value) = label.iter().find(|v| **v as usize >= n_class) {
        return Err(PipelineError::LabelOutOfRange { value, n_class });
    }
    let (h, w) = label.dim();
    let mut out = Array3::zeros((n_class, h, w));
    Zip::indexed(&label).for_each(|(y, x), &c| out[(c as usize, y, x)] = 1);
    Ok(out)
}

/// 切片阶段的统计.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SliceReport {
    /// 成功处理的受试者.
    pub subjects: Vec<u32>,

    /// 因文件缺失而跳过的受试者.
    pub skipped: Vec<u32>,

    /// 写出的切片个数 (每个切片两个文件).
    pub slices: usize,
}

/// 重采样 + 切片器.
#[derive(Clone, Debug)]
pub struct Slicer {
    config: SliceConfig,
    n_class: usize,
    raw_dir: PathBuf,
    out_dir: PathBuf,
}

impl Slicer {
    /// 直接初始化.
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        config: SliceConfig,
        n_class: usize,
        raw_dir: P,
        out_dir: Q,
    ) -> Self {
        Self {
            config,
            n_class,
            raw_dir: raw_dir.as_ref().to_owned(),
            out_dir: out_dir.as_ref().to_owned(),
        }
    }

    /// 由流水线配置创建.
    pub fn from_config(cfg: &PipelineConfig) -> Self {
        Self::new(
            cfg.slicing.clone(),
            cfg.n_class,
            &cfg.paths.raw_dir,
            &cfg.paths.processed_dir,
        )
    }

    /// 输出目录.
    #[inline]
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// 重采样一个受试者, 返回 `(z, H, W)` 的图像和 `(z, H, W)` 的整数标签.
    pub fn resample(&self, data: &MriData3d) -> (Array3<f32>, Array3<u8>) {
        let image = ResizeSpec::image(self.config.resize, self.config.anti_aliasing)
            .apply_stack(data.scan().data());

        let unit = encode_label_unit(data.label().data());
        let unit = ResizeSpec::label(self.config.resize).apply_stack(unit.view());
        let (z, h, w) = unit.dim();
        let mut label = Array3::zeros((z, h, w));
        Zip::from(label.axis_iter_mut(Axis(0)))
            .and(unit.axis_iter(Axis(0)))
            .for_each(|mut dst, src| dst.assign(&recover_label(src)));
        (image, label)
    }

    /// 处理一个受试者并写出其全部切片. 返回写出的切片个数.
    pub fn slice_subject(&self, subject: u32, data: &MriData3d) -> PipelineResult<usize> {
        debug!(
            "Subject {subject}: shape {:?}, spacing {:?} mm",
            data.scan().shape(),
            data.scan().pix_dim()
        );
        let (image, label) = self.resample(data);
        fs::create_dir_all(&self.out_dir)?;

        for (z, (img, lbl)) in image
            .axis_iter(Axis(0))
            .zip(label.axis_iter(Axis(0)))
            .enumerate()
        {
            let key = SliceKey::new(subject, z);
            let hot = one_hot(lbl, self.n_class)?;
            write_scan(self.out_dir.join(key.image_file()), img.insert_axis(Axis(0)))?;
            write_label(self.out_dir.join(key.label_file()), hot.view())?;
        }
        Ok(image.len_of(Axis(0)))
    }

    /// 依次处理编号 `0..samples` 的全部受试者.
    ///
    /// 任一文件缺失的受试者会被跳过并记录; 其它错误 (包括形状不一致) 立即返回.
    pub fn run(&self) -> PipelineResult<SliceReport> {
        let samples = self.config.samples;
        let naming = RawNaming::new(&self.config.raw_prefix, &self.config.raw_ext);
        let mut report = SliceReport::default();

        for (subject, data) in generic::data_loader(0..samples, &self.raw_dir, naming) {
            let data = match data {
                Ok(d) => d,
                Err(e) if generic::is_missing(&e) => {
                    warn!("Skipping subject {subject}: {e}");
                    report.skipped.push(subject);
                    continue;
                }
                Err(e) => return Err(e),
            };
            info!("Slicing subject {subject} out of {samples}");
            report.slices += self.slice_subject(subject, &data)?;
            report.subjects.push(subject);
        }
        info!(
            "Sliced {} subjects into {} slices ({} skipped)",
            report.subjects.len(),
            report.slices,
            report.skipped.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{read_label, read_scan, write_label, write_scan};
    use crate::{MriLabel, MriScan};
    use ndarray::{array, Array3};

    #[test]
    fn test_label_recovery_is_exact() {
        let label = array![[0u8, 1, 2, 3], [3, 2, 1, 0]];
        let unit = encode_label_unit(label.view());
        assert!(unit.iter().all(|v| (0.0..=1.0).contains(v)));
        assert_eq!(recover_label(unit.view()), label);

        // 由插值带来的微小偏差也能还原.
        let noisy = unit.mapv(|v| v + 0.4 / 255.0);
        assert_eq!(recover_label(noisy.view()), label);
    }

    #[test]
    fn test_one_hot_exclusive() {
        let label = array![[0u8, 1], [2, 3]];
        let hot = one_hot(label.view(), 4).unwrap();
        assert_eq!(hot.dim(), (4, 2, 2));
        assert!(hot.sum_axis(Axis(0)).iter().all(|s| *s == 1));
        assert_eq!(hot[(3, 1, 1)], 1);
        assert_eq!(hot[(0, 0, 0)], 1);
        assert_eq!(hot[(1, 1, 1)], 0);
    }

    #[test]
    fn test_one_hot_out_of_range() {
        let label = array![[0u8, 4]];
        assert!(matches!(
            one_hot(label.view(), 4),
            Err(PipelineError::LabelOutOfRange {
                value: 4,
                n_class: 4
            })
        ));
    }

    fn config(resize: (usize, usize), samples: u32) -> SliceConfig {
        SliceConfig {
            samples,
            resize,
            ..SliceConfig::default()
        }
    }

    #[test]
    fn test_resample_keeps_classes() {
        let scan = MriScan::from_array(Array3::from_elem((2, 6, 6), 10.0));
        let label = MriLabel::from_array(Array3::from_shape_fn((2, 6, 6), |(_, h, w)| {
            ((h / 3) * 2 + w / 3) as u8
        }));
        let data = MriData3d::new(scan, label).unwrap();
        let slicer = Slicer::new(config((4, 4), 1), 4, "", "");
        let (image, label) = slicer.resample(&data);
        assert_eq!(image.dim(), (2, 4, 4));
        assert_eq!(label.dim(), (2, 4, 4));
        assert!(label.iter().all(|v| *v < 4));
        assert_eq!(label[(0, 0, 0)], 0);
        assert_eq!(label[(1, 3, 3)], 3);
    }

    #[test]
    fn test_run_writes_slices_and_skips_missing() {
        let dir = tempfile::tempdir().unwrap();
        let (raw, out) = (dir.path().join("raw"), dir.path().join("out"));
        fs::create_dir_all(&raw).unwrap();

        // 受试者 0: 3 层, 8x8. 受试者 1 缺失.
        let scan = Array3::from_shape_fn((3, 8, 8), |(z, h, w)| (z + h + w) as f32);
        let label = Array3::from_shape_fn((3, 8, 8), |(z, h, _)| ((z + h) % 4) as u8);
        write_scan(raw.join("lge_0.nii"), scan.view()).unwrap();
        write_label(raw.join("lge_0_label.nii"), label.view()).unwrap();

        let slicer = Slicer::new(config((4, 4), 2), 4, &raw, &out);
        let report = slicer.run().unwrap();
        assert_eq!(report.subjects, vec![0]);
        assert_eq!(report.skipped, vec![1]);
        assert_eq!(report.slices, 3);

        for z in 0..3 {
            let key = SliceKey::new(0, z);
            let (_, img) = read_scan(out.join(key.image_file())).unwrap();
            assert_eq!(img.dim(), (1, 4, 4));
            let (_, hot) = read_label(out.join(key.label_file())).unwrap();
            assert_eq!(hot.dim(), (4, 4, 4));
            assert!(hot.sum_axis(Axis(0)).iter().all(|s| *s == 1));
        }
    }

    #[test]
    fn test_run_fails_fast_on_depth_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw");
        fs::create_dir_all(&raw).unwrap();
        write_scan(raw.join("lge_0.nii"), Array3::zeros((3, 4, 4)).view()).unwrap();
        write_label(raw.join("lge_0_label.nii"), Array3::zeros((2, 4, 4)).view()).unwrap();

        let slicer = Slicer::new(config((4, 4), 1), 4, &raw, dir.path().join("out"));
        assert!(matches!(
            slicer.run(),
            Err(PipelineError::ShapeMismatch { .. })
        ));
    }
}
