//! 按受试者暂存切片文件.

use crate::naming::SliceKey;
use crate::PipelineResult;
use log::{debug, info};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// 将 `from` 目录下属于 `subjects` 的全部切片文件 (图像和标签) 复制到 `to` 目录.
///
/// 受试者按编号精确匹配, 例如编号 1 不会匹配 `img_10_*`. `to`
/// 不存在时自动创建, 同名文件被覆盖. `to` 中已有的、不属于 `subjects`
/// 的切片文件会先被删除, 因此重新划分后再次暂存不会残留旧集合的受试者.
///
/// 返回复制的文件个数.
pub fn stage_subjects<P: AsRef<Path>, Q: AsRef<Path>>(
    subjects: &[u32],
    from: P,
    to: Q,
) -> PipelineResult<usize> {
    let (from, to) = (from.as_ref(), to.as_ref());
    fs::create_dir_all(to)?;
    let wanted: HashSet<u32> = subjects.iter().copied().collect();

    let mut removed = 0usize;
    for entry in fs::read_dir(to)? {
        let entry = entry?;
        let stale = entry
            .file_name()
            .to_str()
            .and_then(SliceKey::parse)
            .is_some_and(|(key, _)| !wanted.contains(&key.subject));
        if stale {
            fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    if removed > 0 {
        info!("Removed {removed} stale files from {}", to.display());
    }

    let mut copied = 0usize;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        match SliceKey::parse(name) {
            Some((key, _)) if wanted.contains(&key.subject) => {
                fs::copy(entry.path(), to.join(name))?;
                copied += 1;
                debug!("Staged {name}");
            }
            _ => {}
        }
    }
    info!(
        "Staged {copied} files of {} subjects into {}",
        wanted.len(),
        to.display()
    );
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_subject_match() {
        let dir = tempfile::tempdir().unwrap();
        let (from, to) = (dir.path().join("all"), dir.path().join("train"));
        fs::create_dir_all(&from).unwrap();
        for name in [
            "img_1_0.nii.gz",
            "img_1_0_label.nii.gz",
            "img_1_1.nii.gz",
            "img_10_0.nii.gz",
            "img_2_0.nii.gz",
            "notes.txt",
        ] {
            fs::write(from.join(name), name).unwrap();
        }

        assert_eq!(stage_subjects(&[1], &from, &to).unwrap(), 3);
        let mut names: Vec<String> = fs::read_dir(&to)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(
            names,
            ["img_1_0.nii.gz", "img_1_0_label.nii.gz", "img_1_1.nii.gz"]
        );

        // 重复执行不出错.
        assert_eq!(stage_subjects(&[1], &from, &to).unwrap(), 3);
    }

    fn listing(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_restaging_drops_other_subjects() {
        let dir = tempfile::tempdir().unwrap();
        let (from, to) = (dir.path().join("all"), dir.path().join("train"));
        fs::create_dir_all(&from).unwrap();
        for name in ["img_1_0.nii.gz", "img_2_0.nii.gz", "img_2_0_label.nii.gz"] {
            fs::write(from.join(name), name).unwrap();
        }

        stage_subjects(&[1], &from, &to).unwrap();
        fs::write(to.join("notes.txt"), "keep").unwrap();
        assert_eq!(stage_subjects(&[2], &from, &to).unwrap(), 2);
        assert_eq!(
            listing(&to),
            ["img_2_0.nii.gz", "img_2_0_label.nii.gz", "notes.txt"]
        );
    }
}
