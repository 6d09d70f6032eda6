//! 由 2D 结果切片重组 3D 体数据.

use crate::consts::NII_GZ;
use crate::io::{read_label, write_label};
use crate::naming::{ResultKind, SliceKey, StackKind};
use crate::{PipelineError, PipelineResult};
use log::{debug, warn};
use ndarray::{Array2, Array3, Axis};
use std::fs;
use std::path::{Path, PathBuf};

/// 找出 `dir` 下受试者 `subject` 的所有 `kind` 类结果切片, 按深度升序返回.
pub fn collect_slices<P: AsRef<Path>>(
    dir: P,
    subject: u32,
    kind: ResultKind,
) -> PipelineResult<Vec<(usize, PathBuf)>> {
    let tail = format!("{}{NII_GZ}", kind.suffix());
    let mut found = Vec::new();
    for entry in fs::read_dir(dir.as_ref())? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some((key, rest)) = SliceKey::parse(name) {
            if key.subject == subject && rest == tail {
                found.push((key.depth, entry.path()));
            }
        }
    }
    found.sort_unstable_by_key(|(depth, _)| *depth);
    Ok(found)
}

/// 读取一个 `(1, H, W)` 的类别图切片.
pub fn read_label_map<P: AsRef<Path>>(path: P) -> PipelineResult<Array2<u8>> {
    let path = path.as_ref();
    let (_, data) = read_label(path)?;
    let (z, h, w) = data.dim();
    if z != 1 {
        return Err(PipelineError::shape_mismatch(
            format!("`{}` 不是单通道类别图", path.display()),
            &[1, h, w],
            &[z, h, w],
        ));
    }
    Ok(data.index_axis_move(Axis(0), 0))
}

/// 把受试者 `subject` 的 `kind` 类切片按深度升序堆叠为 `(z, H, W)`.
///
/// 没有任何切片时返回 `None`. 深度不连续时只记录警告.
pub fn stack_subject<P: AsRef<Path>>(
    dir: P,
    subject: u32,
    kind: StackKind,
) -> PipelineResult<Option<Array3<u8>>> {
    let slices = collect_slices(dir.as_ref(), subject, kind.source())?;
    if slices.is_empty() {
        return Ok(None);
    }
    if slices.iter().enumerate().any(|(i, (depth, _))| i != *depth) {
        let depths: Vec<usize> = slices.iter().map(|(d, _)| *d).collect();
        warn!("Subject {subject}: depth indices {depths:?} are not contiguous");
    }

    let mut maps = Vec::with_capacity(slices.len());
    for (_, path) in &slices {
        let map = read_label_map(path)?;
        if let Some(first) = maps.first().map(Array2::dim) {
            if map.dim() != first {
                return Err(PipelineError::shape_mismatch(
                    format!("`{}` 与同一受试者的其它切片平面形状不一致", path.display()),
                    &[first.0, first.1],
                    map.shape(),
                ));
            }
        }
        maps.push(map);
    }
    let views: Vec<_> = maps.iter().map(Array2::view).collect();
    Ok(Some(ndarray::stack(Axis(0), &views)?))
}

/// 重组并写出受试者的 `lbl_{id}_3D` 与 `out_{id}_3D`.
///
/// 返回是否写出了任何文件.
pub fn write_stacks<P: AsRef<Path>>(dir: P, subject: u32) -> PipelineResult<bool> {
    let dir = dir.as_ref();
    let mut written = false;
    for kind in [StackKind::Labels, StackKind::Output] {
        match stack_subject(dir, subject, kind)? {
            Some(volume) => {
                let path = dir.join(kind.file_name(subject));
                write_label(&path, volume.view())?;
                debug!("Wrote {} {:?}", path.display(), volume.dim());
                written = true;
            }
            None => warn!("Subject {subject}: no {kind:?} slices to stack"),
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn write_map(dir: &Path, key: SliceKey, kind: ResultKind, value: u8) {
        let map = Array3::from_elem((1, 2, 3), value);
        write_label(dir.join(key.result_file(kind)), map.view()).unwrap();
    }

    #[test]
    fn test_stacks_in_depth_order() {
        let dir = tempfile::tempdir().unwrap();
        for depth in [2, 0, 1] {
            write_map(dir.path(), SliceKey::new(7, depth), ResultKind::Labels, depth as u8);
        }
        // 其它受试者与其它种类的文件不参与.
        write_map(dir.path(), SliceKey::new(70, 0), ResultKind::Labels, 9);
        write_map(dir.path(), SliceKey::new(7, 0), ResultKind::Output, 9);

        let volume = stack_subject(dir.path(), 7, StackKind::Labels)
            .unwrap()
            .unwrap();
        assert_eq!(volume.dim(), (3, 2, 3));
        for z in 0..3 {
            assert!(volume.index_axis(Axis(0), z).iter().all(|v| *v == z as u8));
        }
    }

    #[test]
    fn test_write_stacks() {
        let dir = tempfile::tempdir().unwrap();
        for depth in 0..2 {
            let key = SliceKey::new(3, depth);
            write_map(dir.path(), key, ResultKind::Labels, 1);
            write_map(dir.path(), key, ResultKind::Output, 2);
        }
        assert!(write_stacks(dir.path(), 3).unwrap());
        let (_, lbl) = read_label(dir.path().join("lbl_3_3D.nii.gz")).unwrap();
        let (_, out) = read_label(dir.path().join("out_3_3D.nii.gz")).unwrap();
        assert_eq!(lbl.dim(), (2, 2, 3));
        assert!(out.iter().all(|v| *v == 2));

        assert!(!write_stacks(dir.path(), 4).unwrap());
    }

    #[test]
    fn test_plane_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        write_map(dir.path(), SliceKey::new(1, 0), ResultKind::Output, 0);
        let odd = Array3::<u8>::zeros((1, 3, 3));
        write_label(
            dir.path().join(SliceKey::new(1, 1).result_file(ResultKind::Output)),
            odd.view(),
        )
        .unwrap();
        assert!(matches!(
            stack_subject(dir.path(), 1, StackKind::Output),
            Err(PipelineError::ShapeMismatch { .. })
        ));
    }
}
