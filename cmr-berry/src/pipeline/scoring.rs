//! 测试集推理、打分与重新打分.

use super::{open_provider, EvaluationReport, SliceScore};
use crate::config::PipelineConfig;
use crate::dataset::{stage_subjects, Partition};
use crate::eval::{
    collect_slices, label_metrics, per_class_metrics, preview, read_label_map, write_stacks,
    ClassThresholds,
};
use crate::io::{write_label, write_scan};
use crate::model::SegmentationModel;
use crate::naming::{stem_of, ResultKind, SliceKey};
use crate::provider::BatchProvider;
use crate::{PipelineError, PipelineResult};
use log::{info, warn};
use ndarray::{ArrayView2, Axis};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// 在测试集上推理并评估.
///
/// 模型从 `paths.checkpoint` 恢复.
///
/// 对每个测试切片依次: 推理, 离散化真值与预测, 写出输入/真值/概率/预测四个文件,
/// 计算指标. 最后为每个测试受试者重组 3D 结果.
pub fn evaluate<M: SegmentationModel + ?Sized>(
    model: &mut M,
    cfg: &PipelineConfig,
) -> PipelineResult<EvaluationReport> {
    cfg.validate()?;
    let partition = Partition::load(&cfg.paths.train_index, &cfg.paths.test_index)?;
    stage_subjects(&partition.test, &cfg.paths.processed_dir, &cfg.paths.test_dir)?;
    let mut provider = open_provider(cfg, &cfg.paths.test_dir, false)?;
    info!("Restoring model from {}", cfg.paths.checkpoint.display());
    model.restore(&cfg.paths.checkpoint)?;

    let results = cfg.paths.results_dir.as_path();
    fs::create_dir_all(results)?;
    let truth = ClassThresholds::uniform(cfg.n_class, cfg.eval.label_threshold)?;
    let thresholds = ClassThresholds::new(cfg.eval.thresholds.clone())?;
    let mut report = EvaluationReport::new(cfg.n_class);

    for i in 0..provider.len() {
        let sample = provider.next_sample()?;
        let key = slice_key(&sample.path)?;
        let x = sample.data.view().insert_axis(Axis(0));
        let pred = model.predict(x)?;

        let (h, w, _) = sample.data.dim();
        if pred.dim() != (1, h, w, cfg.n_class) {
            return Err(PipelineError::shape_mismatch(
                format!("模型对 `{key}` 的输出"),
                &[1, h, w, cfg.n_class],
                pred.shape(),
            ));
        }

        // (H, W, C) -> (C, H, W)
        let p = pred.index_axis(Axis(0), 0).permuted_axes([2, 0, 1]);
        let y = sample.labels.view().permuted_axes([2, 0, 1]);
        let l = truth.discretize(y)?;
        let o = thresholds.discretize(p)?;

        let out = |kind: ResultKind| results.join(key.result_file(kind));
        write_scan(out(ResultKind::Input), sample.data.view().permuted_axes([2, 0, 1]))?;
        write_label(out(ResultKind::Labels), l.view().insert_axis(Axis(0)))?;
        write_scan(out(ResultKind::Probabilities), p)?;
        write_label(out(ResultKind::Output), o.view().insert_axis(Axis(0)))?;

        if cfg.eval.save_previews {
            let gt = sample.labels.view().insert_axis(Axis(0));
            let img = preview::combine_img_prediction(x, gt, pred.view())?;
            preview::save_preview(img.view(), results.join(key.preview_file()))?;
        }

        report.slices.push(score(key, l.view(), o.view(), cfg.n_class)?);
        info!("Testing image {i}");
    }

    stack_subjects(results, &partition.test, &mut report)?;
    Ok(report)
}

/// 不经过模型, 由 `results_dir` 下已写出的 `_labels` 与 `_output` 切片重新计算指标,
/// 并重建 3D 结果.
pub fn rescore<P: AsRef<Path>>(
    results_dir: P,
    subjects: &[u32],
    n_class: usize,
) -> PipelineResult<EvaluationReport> {
    let results = results_dir.as_ref();
    let mut report = EvaluationReport::new(n_class);

    for &subject in subjects {
        let outputs: HashMap<usize, _> = collect_slices(results, subject, ResultKind::Output)?
            .into_iter()
            .collect();
        for (depth, label_path) in collect_slices(results, subject, ResultKind::Labels)? {
            let key = SliceKey::new(subject, depth);
            let Some(output_path) = outputs.get(&depth) else {
                warn!("Skipping {key}: no prediction found");
                continue;
            };
            let l = read_label_map(&label_path)?;
            let o = read_label_map(output_path)?;
            report.slices.push(score(key, l.view(), o.view(), n_class)?);
        }
    }
    info!("Rescored {} slices", report.slices.len());

    stack_subjects(results, subjects, &mut report)?;
    Ok(report)
}

fn score(
    key: SliceKey,
    truth: ArrayView2<u8>,
    pred: ArrayView2<u8>,
    n_class: usize,
) -> PipelineResult<SliceScore> {
    Ok(SliceScore {
        key,
        metrics: label_metrics(truth, pred)?,
        per_class: per_class_metrics(truth, pred, n_class)?,
    })
}

fn stack_subjects(results: &Path, subjects: &[u32], report: &mut EvaluationReport) -> PipelineResult<()> {
    for &subject in subjects {
        if write_stacks(results, subject)? {
            report.stacked.push(subject);
        }
    }
    Ok(())
}

fn slice_key(path: &Path) -> PipelineResult<SliceKey> {
    stem_of(path)
        .and_then(SliceKey::parse)
        .map(|(key, _)| key)
        .ok_or_else(|| {
            PipelineError::Configuration(format!(
                "无法由 `{}` 解析受试者与深度",
                path.display()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{read_label, read_scan};
    use crate::naming::StackKind;
    use crate::pipeline::tests::{fixture, Bright};
    use crate::pipeline::{prepare, train};
    use ndarray::{Array4, ArrayView4};
    use std::path::PathBuf;

    #[test]
    fn test_evaluate_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = fixture(dir.path(), 4);
        cfg.eval.save_previews = true;
        cfg.training.epochs = 1;
        cfg.training.batch_size = 2;
        let (_, part) = prepare(&cfg).unwrap();

        let mut model = Bright::default();
        let ckpt = train(&mut model, &cfg).unwrap();
        let report = evaluate(&mut model, &cfg).unwrap();
        // 恢复的是训练写出的 checkpoint 文件, 而不是模型目录.
        assert_eq!(ckpt, cfg.paths.checkpoint);
        assert_eq!(model.restored.as_deref(), Some(ckpt.as_path()));
        assert_eq!(report.slices.len(), part.test.len() * 3);
        assert_eq!(report.summary().unwrap().count, 6);
        assert!(report.slices.iter().all(|s| s.per_class.len() == 3));

        let results = &cfg.paths.results_dir;
        for s in &report.slices {
            for kind in [
                ResultKind::Input,
                ResultKind::Labels,
                ResultKind::Probabilities,
                ResultKind::Output,
            ] {
                assert!(results.join(s.key.result_file(kind)).is_file());
            }
            assert!(results.join(s.key.preview_file()).is_file());
        }
        let (_, probs) = read_scan(results.join(report.slices[0].key.result_file(ResultKind::Probabilities))).unwrap();
        assert_eq!(probs.dim(), (4, 4, 4));

        let mut stacked = report.stacked.clone();
        stacked.sort_unstable();
        let mut test = part.test.clone();
        test.sort_unstable();
        assert_eq!(stacked, test);
        for &id in &part.test {
            let (_, lbl) = read_label(results.join(StackKind::Labels.file_name(id))).unwrap();
            assert_eq!(lbl.dim(), (3, 4, 4));
            // 真值的左上角为类 1, 右下角为类 3.
            assert_eq!(lbl[(0, 0, 0)], 1);
            assert_eq!(lbl[(2, 3, 3)], 3);
        }

        // 不经过模型重新打分, 结果一致.
        let again = rescore(results, &part.test, cfg.n_class).unwrap();
        assert_eq!(again.slices.len(), report.slices.len());
        let (a, b) = (report.summary().unwrap(), again.summary().unwrap());
        assert!((a.mean.dice - b.mean.dice).abs() < 1e-12);
    }

    /// 返回错误形状的模型.
    struct Wrong;

    impl SegmentationModel for Wrong {
        fn restore(&mut self, _: &Path) -> PipelineResult<()> {
            Ok(())
        }

        fn predict(&mut self, batch: ArrayView4<f32>) -> PipelineResult<Array4<f32>> {
            let (n, h, w, _) = batch.dim();
            Ok(Array4::zeros((n, h, w, 2)))
        }

        fn train(
            &mut self,
            _: &mut dyn BatchProvider,
            _: &Path,
            _: &crate::model::TrainOptions,
        ) -> PipelineResult<PathBuf> {
            Err(PipelineError::model("not trainable"))
        }
    }

    #[test]
    fn test_prediction_shape_checked() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = fixture(dir.path(), 2);
        prepare(&cfg).unwrap();
        assert!(matches!(
            evaluate(&mut Wrong, &cfg),
            Err(PipelineError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_restores_configured_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = fixture(dir.path(), 2);
        cfg.paths.checkpoint = dir.path().join("elsewhere").join("best.ckpt");
        prepare(&cfg).unwrap();

        let mut model = Bright::default();
        evaluate(&mut model, &cfg).unwrap();
        assert_eq!(model.restored, Some(cfg.paths.checkpoint.clone()));
    }

    #[test]
    fn test_slice_key_from_path() {
        assert_eq!(
            slice_key(Path::new("/x/img_12_3.nii.gz")).unwrap(),
            SliceKey::new(12, 3)
        );
        assert!(slice_key(Path::new("/x/scan.nii.gz")).is_err());
    }
}
