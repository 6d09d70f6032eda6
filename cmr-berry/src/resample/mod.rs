//! 二维平面重采样.
//!
//! 输出像素中心与输入像素中心对齐: 输出坐标 `o` 对应输入坐标
//! `(o + 0.5) * in / out - 0.5`, 并截断在输入范围内 (边缘复制).

mod gaussian;

pub use gaussian::gaussian_blur;

use crate::Idx2d;
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};

/// 插值方式.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Interpolation {
    /// 最近邻 (0 阶). 用于类别数据, 不会产生新的类别值.
    Nearest,

    /// 双线性 (1 阶). 用于强度图像.
    Bilinear,
}

/// 一次平面重采样的完整描述.
#[derive(Copy, Clone, Debug)]
pub struct ResizeSpec {
    /// 目标形状 (高, 宽).
    pub shape: Idx2d,

    /// 插值方式.
    pub interpolation: Interpolation,

    /// 缩小时是否先做高斯抗混叠. 只对 [`Interpolation::Bilinear`] 生效.
    pub anti_aliasing: bool,
}

impl ResizeSpec {
    /// 强度图像的重采样规则.
    #[inline]
    pub const fn image(shape: Idx2d, anti_aliasing: bool) -> Self {
        Self {
            shape,
            interpolation: Interpolation::Bilinear,
            anti_aliasing,
        }
    }

    /// 标签的重采样规则.
    #[inline]
    pub const fn label(shape: Idx2d) -> Self {
        Self {
            shape,
            interpolation: Interpolation::Nearest,
            anti_aliasing: false,
        }
    }

    /// 重采样一张二维切片.
    pub fn apply(&self, src: ArrayView2<f32>) -> Array2<f32> {
        let (out_h, out_w) = self.shape;
        let (in_h, in_w) = src.dim();
        if in_h == 0 || in_w == 0 {
            return Array2::zeros(self.shape);
        }
        if (in_h, in_w) == self.shape {
            return src.to_owned();
        }
        let (scale_h, scale_w) = (in_h as f64 / out_h as f64, in_w as f64 / out_w as f64);

        match self.interpolation {
            Interpolation::Nearest => {
                let rows = nearest_table(in_h, out_h, scale_h);
                let cols = nearest_table(in_w, out_w, scale_w);
                Array2::from_shape_fn(self.shape, |(h, w)| src[(rows[h], cols[w])])
            }
            Interpolation::Bilinear => {
                let sigma = (anti_alias_sigma(scale_h), anti_alias_sigma(scale_w));
                let smoothed = if self.anti_aliasing && (sigma.0 > 0.0 || sigma.1 > 0.0) {
                    gaussian_blur(src, sigma)
                } else {
                    src.to_owned()
                };
                let src = smoothed.view();
                let rows = linear_table(in_h, out_h, scale_h);
                let cols = linear_table(in_w, out_w, scale_w);
                Array2::from_shape_fn(self.shape, |(h, w)| {
                    let (y0, y1, fy) = rows[h];
                    let (x0, x1, fx) = cols[w];
                    let top = (1.0 - fx) * src[(y0, x0)] as f64 + fx * src[(y0, x1)] as f64;
                    let bottom = (1.0 - fx) * src[(y1, x0)] as f64 + fx * src[(y1, x1)] as f64;
                    ((1.0 - fy) * top + fy * bottom) as f32
                })
            }
        }
    }

    /// 逐层重采样 `(z, H, W)` 体数据, 各层互相独立.
    ///
    /// 打开 `rayon` feature 时各层并行处理, 结果与顺序处理一致.
    pub fn apply_stack(&self, volume: ArrayView3<f32>) -> Array3<f32> {
        let (z, _, _) = volume.dim();
        let (h, w) = self.shape;
        let mut out = Array3::zeros((z, h, w));

        cfg_if::cfg_if! {
            if #[cfg(feature = "rayon")] {
                use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};

                out.axis_iter_mut(Axis(0))
                    .into_par_iter()
                    .zip(volume.axis_iter(Axis(0)).into_par_iter())
                    .for_each(|(mut dst, src)| dst.assign(&self.apply(src)));
            } else {
                out.axis_iter_mut(Axis(0))
                    .zip(volume.axis_iter(Axis(0)))
                    .for_each(|(mut dst, src)| dst.assign(&self.apply(src)));
            }
        }
        out
    }
}

/// 输出坐标 `o` 在输入中的 (截断后) 连续坐标.
#[inline]
fn source_coord(o: usize, scale: f64, n: usize) -> f64 {
    ((o as f64 + 0.5) * scale - 0.5).clamp(0.0, (n - 1) as f64)
}

fn nearest_table(n: usize, out: usize, scale: f64) -> Vec<usize> {
    (0..out)
        .map(|o| (source_coord(o, scale, n).round() as usize).min(n - 1))
        .collect()
}

fn linear_table(n: usize, out: usize, scale: f64) -> Vec<(usize, usize, f64)> {
    (0..out)
        .map(|o| {
            let c = source_coord(o, scale, n);
            let i0 = c.floor() as usize;
            let i1 = (i0 + 1).min(n - 1);
            (i0, i1, c - i0 as f64)
        })
        .collect()
}

/// 缩小倍率 `scale` 对应的抗混叠 sigma. 放大时为 0.
#[inline]
fn anti_alias_sigma(scale: f64) -> f64 {
    ((scale - 1.0) / 2.0).max(0.0)
}
