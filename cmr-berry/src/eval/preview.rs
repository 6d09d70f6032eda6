//! 预测结果的 JPEG 预览图.
//!
//! 预览图从左到右依次为: 输入图像, 真值第 1 类通道, 预测第 1 类通道.

use crate::{PipelineError, PipelineResult};
use image::codecs::jpeg::JpegEncoder;
use image::ColorType;
use ndarray::{concatenate, s, Array3, ArrayView3, ArrayView4, Axis};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// JPEG 压缩质量.
const JPEG_QUALITY: u8 = 90;

/// 将 `(H, W, C)` 图像转换为 `0..=255` 范围的 RGB 浮点图.
///
/// 少于 3 个通道时沿通道轴平铺 3 份; NaN 视作 0; 然后线性拉伸到 `[0, 255]`.
pub fn to_rgb(img: ArrayView3<f32>) -> Array3<f32> {
    let (h, w, c) = img.dim();
    let mut out = if c < 3 {
        Array3::from_shape_fn((h, w, 3 * c), |(y, x, k)| img[(y, x, k % c)])
    } else {
        img.to_owned()
    };
    out.mapv_inplace(|v| if v.is_nan() { 0.0 } else { v });
    let min = out.iter().copied().fold(f32::INFINITY, f32::min);
    if min.is_finite() {
        out.mapv_inplace(|v| v - min);
    }
    let max = out.iter().copied().fold(0.0, f32::max);
    if max != 0.0 {
        out.mapv_inplace(|v| v / max);
    }
    out.mapv_inplace(|v| v * 255.0);
    out
}

/// 沿 `(N, H, W, C)` 的两个平面轴居中裁剪到 `shape`.
pub fn crop_to_shape(data: ArrayView4<f32>, (h, w): (usize, usize)) -> PipelineResult<ArrayView4<f32>> {
    let (n, dh, dw, c) = data.dim();
    if h > dh || w > dw {
        return Err(PipelineError::shape_mismatch(
            "裁剪目标大于原图",
            &[n, dh, dw, c],
            &[n, h, w, c],
        ));
    }
    let (oh, ow) = ((dh - h) / 2, (dw - w) / 2);
    Ok(data.slice_move(s![.., oh..oh + h, ow..ow + w, ..]))
}

/// 把一批 `(N, H, W, ·)` 的输入、真值与预测横向拼成一张 `(N * H, 3 * W, 3)` 的图.
///
/// 输入与真值先居中裁剪到预测的平面形状; 真值与预测只取第 1 类通道.
pub fn combine_img_prediction(
    data: ArrayView4<f32>,
    gt: ArrayView4<f32>,
    pred: ArrayView4<f32>,
) -> PipelineResult<Array3<f32>> {
    let (n, h, w, k) = pred.dim();
    if k < 2 {
        return Err(PipelineError::shape_mismatch(
            "预测至少需要 2 个通道",
            &[n, h, w, 2],
            &[n, h, w, k],
        ));
    }
    let data = crop_to_shape(data, (h, w))?;
    let gt = crop_to_shape(gt, (h, w))?;

    let rows = |a: ArrayView4<f32>| -> PipelineResult<Array3<f32>> {
        let c = a.len_of(Axis(3));
        let flat = a
            .as_standard_layout()
            .into_owned()
            .into_shape((a.len_of(Axis(0)) * h, w, c))?;
        Ok(to_rgb(flat.view()))
    };
    let panels = [
        rows(data)?,
        rows(gt.slice(s![.., .., .., 1..2]))?,
        rows(pred.slice(s![.., .., .., 1..2]))?,
    ];
    let views: Vec<_> = panels.iter().map(Array3::view).collect();
    Ok(concatenate(Axis(1), &views)?)
}

/// 将 `(H, W, 3)` 的 RGB 浮点图四舍五入后保存为 JPEG.
pub fn save_preview<P: AsRef<Path>>(img: ArrayView3<f32>, path: P) -> PipelineResult<()> {
    let (h, w, c) = img.dim();
    if c != 3 {
        return Err(PipelineError::shape_mismatch(
            "预览图必须为 RGB",
            &[h, w, 3],
            &[h, w, c],
        ));
    }
    let mut buf = image::RgbImage::new(w as u32, h as u32);
    for (y, row) in img.outer_iter().enumerate() {
        for (x, px) in row.outer_iter().enumerate() {
            let rgb = [0, 1, 2].map(|i| px[i].round().clamp(0.0, 255.0) as u8);
            buf.put_pixel(x as u32, y as u32, image::Rgb(rgb));
        }
    }

    let writer = BufWriter::new(File::create(path.as_ref())?);
    let mut encoder = JpegEncoder::new_with_quality(writer, JPEG_QUALITY);
    encoder.encode(buf.as_raw(), w as u32, h as u32, ColorType::Rgb8)?;
    Ok(())
}
