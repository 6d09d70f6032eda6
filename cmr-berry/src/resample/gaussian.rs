//! 可分离高斯滤波. 用于缩小图像前的抗混叠.

use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut1, Axis, Zip};

/// 核半径截断在 `TRUNCATE * sigma` 处.
const TRUNCATE: f64 = 4.0;

/// 归一化的一维高斯核, 长度为 `2 * radius + 1`.
fn kernel(sigma: f64) -> Vec<f64> {
    let radius = (TRUNCATE * sigma + 0.5) as usize;
    let denom = -0.5 / (sigma * sigma);
    let mut k: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let x = i as f64 - radius as f64;
            (x * x * denom).exp()
        })
        .collect();
    let sum: f64 = k.iter().sum();
    k.iter_mut().for_each(|v| *v /= sum);
    k
}

/// 一维卷积. 越界部分按 0 处理.
fn convolve_lane(src: ArrayView1<f32>, mut dst: ArrayViewMut1<f32>, k: &[f64]) {
    let n = src.len() as isize;
    let radius = (k.len() / 2) as isize;
    for (i, out) in dst.iter_mut().enumerate() {
        let i = i as isize;
        let mut acc = 0.0;
        for (j, w) in k.iter().enumerate() {
            let pos = i + j as isize - radius;
            if (0..n).contains(&pos) {
                acc += w * src[pos as usize] as f64;
            }
        }
        *out = acc as f32;
    }
}

fn blur_axis(data: ArrayView2<f32>, axis: Axis, sigma: f64) -> Array2<f32> {
    let k = kernel(sigma);
    let mut out = Array2::zeros(data.raw_dim());
    Zip::from(out.lanes_mut(axis))
        .and(data.lanes(axis))
        .for_each(|dst, src| convolve_lane(src, dst, &k));
    out
}

/// 分别沿高、宽方向以 `sigma = (sigma_h, sigma_w)` 做高斯滤波.
///
/// 某方向 `sigma <= 0` 时该方向保持不变.
pub fn gaussian_blur(data: ArrayView2<f32>, (sigma_h, sigma_w): (f64, f64)) -> Array2<f32> {
    let mut out = data.to_owned();
    if sigma_h > 0.0 {
        out = blur_axis(out.view(), Axis(0), sigma_h);
    }
    if sigma_w > 0.0 {
        out = blur_axis(out.view(), Axis(1), sigma_w);
    }
    out
}
