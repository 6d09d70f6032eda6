//! 批量数据供给.
//!
//! 训练与推理都通过 [`BatchProvider`] 拉取数据: 每次调用 [`BatchProvider::next_batch`]
//! 都会独立地读取 `n` 个切片, 逐个归一化后堆叠成 `(n, H, W, ·)` 的批.
//! 批本身不被缓存, 生命周期只有一次训练或推理.

mod slices;

pub use slices::{ProviderOptions, SliceDataProvider};

use crate::{PipelineError, PipelineResult};
use ndarray::{s, Array3, Array4, ArrayView3, Axis};
use std::path::PathBuf;

/// 单个处理完毕的切片.
#[derive(Clone, Debug)]
pub struct Sample {
    /// 图像文件路径.
    pub path: PathBuf,

    /// `(H, W, channels)` 的归一化图像.
    pub data: Array3<f32>,

    /// `(H, W, n_class)` 的 one-hot 标签.
    pub labels: Array3<f32>,
}

/// 一批切片.
#[derive(Clone, Debug)]
pub struct Batch {
    /// `(N, H, W, channels)`.
    pub data: Array4<f32>,

    /// `(N, H, W, n_class)`.
    pub labels: Array4<f32>,
}

impl Batch {
    /// 批大小 `N`.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// 是否为空批.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 有状态的批量数据生成器.
pub trait BatchProvider {
    /// 图像通道数.
    fn channels(&self) -> usize;

    /// 类别数 (含背景).
    fn n_class(&self) -> usize;

    /// 推进内部游标, 读取并处理下一个切片.
    fn next_sample(&mut self) -> PipelineResult<Sample>;

    /// 连续读取 `n` 个切片并堆叠成一批.
    ///
    /// 所有切片的平面形状必须一致, 否则返回 [`PipelineError::ShapeMismatch`].
    fn next_batch(&mut self, n: usize) -> PipelineResult<Batch> {
        if n == 0 {
            return Err(PipelineError::Configuration("批大小不能为 0".to_string()));
        }
        let first = self.next_sample()?;
        let (h, w, c) = first.data.dim();
        let k = first.labels.len_of(Axis(2));
        let mut data = Array4::zeros((n, h, w, c));
        let mut labels = Array4::zeros((n, h, w, k));

        let mut put = |i: usize, sample: Sample| -> PipelineResult<()> {
            check_shape(&sample.data.view(), &[h, w, c], &sample.path)?;
            check_shape(&sample.labels.view(), &[h, w, k], &sample.path)?;
            data.slice_mut(s![i, .., .., ..]).assign(&sample.data);
            labels.slice_mut(s![i, .., .., ..]).assign(&sample.labels);
            Ok(())
        };
        put(0, first)?;
        for i in 1..n {
            put(i, self.next_sample()?)?;
        }
        Ok(Batch { data, labels })
    }
}

fn check_shape(arr: &ArrayView3<f32>, expected: &[usize], path: &std::path::Path) -> PipelineResult<()> {
    if arr.shape() == expected {
        Ok(())
    } else {
        Err(PipelineError::shape_mismatch(
            format!("`{}` 与本批其它切片形状不一致", path.display()),
            expected,
            arr.shape(),
        ))
    }
}

/// 强度归一化: 取绝对值, 截断到 `[min, max]`, 减去最小值, 再除以最大值.
///
/// 最大值为 0 (例如全零图像) 时不做除法, 结果保持全零.
/// NaN 像素不参与最小/最大值统计, 最终置为 0.
pub fn normalize_intensity(data: &mut Array3<f32>, clip_min: Option<f32>, clip_max: Option<f32>) {
    let lo = clip_min.unwrap_or(f32::NEG_INFINITY);
    let hi = clip_max.unwrap_or(f32::INFINITY);
    // `f32::max`/`f32::min` 会吞掉 NaN, 这里让它原样保留到最后.
    data.mapv_inplace(|v| if v.is_nan() { v } else { v.abs().max(lo).min(hi) });

    let min = data.iter().copied().fold(f32::INFINITY, f32::min);
    if min.is_finite() {
        data.mapv_inplace(|v| v - min);
    }
    let max = data.iter().copied().fold(0.0, f32::max);
    if max != 0.0 {
        data.mapv_inplace(|v| v / max);
    }
    data.mapv_inplace(|v| if v.is_nan() { 0.0 } else { v });
}

/// 将 `(H, W, C)` 的整数标签展开为 `(H, W, n_class)` 的浮点标签.
///
/// 二分类时只取前两个通道 (背景和前景); 其它情况下原样使用,
/// 但通道数必须等于 `n_class`.
pub fn expand_labels(label: Array3<u8>, n_class: usize) -> PipelineResult<Array3<f32>> {
    let (h, w, c) = label.dim();
    if n_class == 2 {
        if c < 2 {
            return Err(PipelineError::shape_mismatch(
                "二分类标签至少需要 2 个通道",
                &[h, w, 2],
                &[h, w, c],
            ));
        }
        return Ok(label.slice(s![.., .., 0..2]).mapv(f32::from));
    }
    if c != n_class {
        return Err(PipelineError::shape_mismatch(
            "标签通道数与类别数不一致",
            &[h, w, n_class],
            &[h, w, c],
        ));
    }
    Ok(label.mapv(f32::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};

    #[test]
    fn test_normalize_range() {
        let mut data = Array3::from_shape_fn((4, 5, 1), |(h, w, _)| h as f32 * 3.0 - w as f32 * 7.5);
        normalize_intensity(&mut data, None, None);
        assert!(data.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(data.iter().any(|v| *v == 0.0));
        assert!(data.iter().any(|v| *v == 1.0));
    }

    #[test]
    fn test_normalize_all_zero_stays_zero() {
        let mut data = Array3::<f32>::zeros((3, 3, 1));
        normalize_intensity(&mut data, None, None);
        assert!(data.iter().all(|v| *v == 0.0));

        // 截断后为常数图像, 同样保持全零.
        let mut data = Array3::from_elem((2, 2, 1), 9.0);
        normalize_intensity(&mut data, None, Some(4.0));
        assert!(data.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_normalize_clip() {
        let mut data = array![[[-10.0f32], [2.0]], [[5.0], [20.0]]];
        normalize_intensity(&mut data, Some(2.0), Some(10.0));
        // abs -> [10, 2, 5, 20] -> clip -> [10, 2, 5, 10] -> [8, 0, 3, 8] / 8
        assert_eq!(data, array![[[1.0f32], [0.0]], [[0.375], [1.0]]]);
    }

    #[test]
    fn test_normalize_ignores_nan() {
        let mut data = array![[[f32::NAN], [5.0]], [[-10.0], [7.5]]];
        normalize_intensity(&mut data, None, None);
        // NaN 之外为 [5, 10, 7.5] -> [0, 5, 2.5] / 5
        assert_eq!(data, array![[[0.0f32], [0.0]], [[1.0], [0.5]]]);

        let mut data = Array3::from_elem((2, 2, 1), f32::NAN);
        normalize_intensity(&mut data, Some(1.0), Some(2.0));
        assert!(data.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_two_class_labels_sum_to_one() {
        let label = Array3::from_shape_fn((4, 4, 4), |(h, w, c)| {
            let fg = (h + w) % 2;
            match c {
                0 => (1 - fg) as u8,
                1 => fg as u8,
                _ => 1,
            }
        });
        let out = expand_labels(label, 2).unwrap();
        assert_eq!(out.dim(), (4, 4, 2));
        assert!(out.sum_axis(Axis(2)).iter().all(|s| *s == 1.0));
    }

    #[test]
    fn test_expand_labels_channel_checks() {
        assert!(matches!(
            expand_labels(Array3::zeros((2, 2, 1)), 2),
            Err(PipelineError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            expand_labels(Array3::zeros((2, 2, 3)), 4),
            Err(PipelineError::ShapeMismatch { .. })
        ));
        assert_eq!(expand_labels(Array3::zeros((2, 2, 4)), 4).unwrap().dim(), (2, 2, 4));
    }

    /// 依次返回预置切片的供给器.
    struct Fixed {
        samples: Vec<Sample>,
        cursor: usize,
    }

    impl BatchProvider for Fixed {
        fn channels(&self) -> usize {
            1
        }

        fn n_class(&self) -> usize {
            2
        }

        fn next_sample(&mut self) -> PipelineResult<Sample> {
            let s = self.samples[self.cursor % self.samples.len()].clone();
            self.cursor += 1;
            Ok(s)
        }
    }

    fn sample(h: usize, w: usize, value: f32) -> Sample {
        Sample {
            path: PathBuf::from(format!("img_{h}_{w}.nii.gz")),
            data: Array3::from_elem((h, w, 1), value),
            labels: Array3::zeros((h, w, 2)),
        }
    }

    #[test]
    fn test_default_next_batch() {
        let mut p = Fixed {
            samples: vec![sample(3, 2, 0.0), sample(3, 2, 1.0)],
            cursor: 0,
        };
        let batch = p.next_batch(3).unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.data.dim(), (3, 3, 2, 1));
        assert_eq!(batch.labels.dim(), (3, 3, 2, 2));
        assert_eq!(batch.data[(1, 0, 0, 0)], 1.0);
        assert_eq!(batch.data[(2, 0, 0, 0)], 0.0);

        assert!(matches!(p.next_batch(0), Err(PipelineError::Configuration(_))));
    }

    #[test]
    fn test_next_batch_rejects_mixed_shapes() {
        let mut p = Fixed {
            samples: vec![sample(3, 2, 0.0), sample(2, 3, 0.0)],
            cursor: 0,
        };
        assert!(matches!(
            p.next_batch(2),
            Err(PipelineError::ShapeMismatch { .. })
        ));
    }
}
