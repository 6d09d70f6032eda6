//! 逐类阈值离散化.

use crate::{PipelineError, PipelineResult};
use ndarray::{Array2, ArrayView3, Axis, Zip};

/// 前景类 `1..n_class` 各自的概率阈值.
///
/// 离散化时按类别编号从小到大依次覆盖: 某像素同时超过多个类的阈值时,
/// 编号最大的类胜出.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassThresholds {
    thresholds: Vec<f32>,
}

impl ClassThresholds {
    /// 由前景类的阈值构建. 第 `i` 个元素对应类别 `i + 1`.
    pub fn new(thresholds: Vec<f32>) -> PipelineResult<Self> {
        if thresholds.is_empty() {
            return Err(PipelineError::Configuration(
                "至少需要一个前景类阈值".to_string(),
            ));
        }
        Ok(Self { thresholds })
    }

    /// 所有前景类使用同一个阈值.
    pub fn uniform(n_class: usize, threshold: f32) -> PipelineResult<Self> {
        Self::new(vec![threshold; n_class.saturating_sub(1)])
    }

    /// 类别数 (含背景).
    #[inline]
    pub fn n_class(&self) -> usize {
        self.thresholds.len() + 1
    }

    /// 类别 `class` 的阈值. 背景类或越界时返回 `None`.
    #[inline]
    pub fn get(&self, class: usize) -> Option<f32> {
        class.checked_sub(1).and_then(|i| self.thresholds.get(i).copied())
    }

    /// 将 `(C, H, W)` 的逐类概率离散化为 `(H, W)` 的类别图.
    ///
    /// 背景通道不参与比较; 没有任何前景类超过阈值的像素为背景.
    pub fn discretize(&self, probs: ArrayView3<f32>) -> PipelineResult<Array2<u8>> {
        let (c, h, w) = probs.dim();
        if c != self.n_class() {
            return Err(PipelineError::shape_mismatch(
                "概率图通道数与阈值个数不一致",
                &[self.n_class(), h, w],
                &[c, h, w],
            ));
        }
        let mut out = Array2::zeros((h, w));
        for (i, &t) in self.thresholds.iter().enumerate() {
            let class = (i + 1) as u8;
            Zip::from(&mut out)
                .and(probs.index_axis(Axis(0), i + 1))
                .for_each(|o, &p| {
                    if p > t {
                        *o = class;
                    }
                });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};

    #[test]
    fn test_last_writer_wins() {
        let t = ClassThresholds::uniform(4, 0.5).unwrap();
        // 像素 (0, 0) 同时超过类 1 和类 3 的阈值.
        let probs = array![
            [[0.0f32, 0.9]],
            [[0.9, 0.2]],
            [[0.1, 0.6]],
            [[0.7, 0.0]],
        ];
        assert_eq!(t.discretize(probs.view()).unwrap(), array![[3u8, 2]]);
    }

    #[test]
    fn test_per_class_threshold() {
        let t = ClassThresholds::new(vec![0.5, 0.1, 0.5]).unwrap();
        assert_eq!(t.get(0), None);
        assert_eq!(t.get(2), Some(0.1));
        assert_eq!(t.get(4), None);

        let mut probs = Array3::zeros((4, 1, 2));
        probs[(2, 0, 0)] = 0.2;
        probs[(1, 0, 1)] = 0.2;
        // 0.2 只超过类 2 的宽松阈值.
        assert_eq!(t.discretize(probs.view()).unwrap(), array![[2u8, 0]]);
    }

    #[test]
    fn test_threshold_is_strict() {
        let t = ClassThresholds::uniform(2, 0.5).unwrap();
        let probs = array![[[0.5f32, 0.5]], [[0.5, 0.51]]];
        assert_eq!(t.discretize(probs.view()).unwrap(), array![[0u8, 1]]);
    }

    #[test]
    fn test_channel_mismatch() {
        let t = ClassThresholds::uniform(4, 0.5).unwrap();
        assert!(matches!(
            t.discretize(Array3::zeros((3, 2, 2)).view()),
            Err(PipelineError::ShapeMismatch { .. })
        ));
        assert!(ClassThresholds::new(Vec::new()).is_err());
    }
}
