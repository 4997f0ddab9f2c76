//! 端到端: 在临时目录中写入真实 nii 文件, 组装数据集并迭代批次.

use ndarray::{Array3, Axis};
use nii_berry::prelude::*;
use nii_berry::dataset::{ItemList, LabelLists};
use nii_berry::transforms::Tfms;
use std::fs;
use std::path::Path;

/// 在 `dir` 下写入 `n` 个 `(8, 8, 8)` 的 nii 文件, 第 i 个的体素值为 `i * scale + 坐标和`.
fn write_volumes(dir: &Path, n: usize, scale: f32, ext: &str) {
    fs::create_dir_all(dir).unwrap();
    for i in 0..n {
        let path = dir.join(format!("vol-{i:02}{ext}"));
        let arr = Array3::from_shape_fn((8, 8, 8), |(a, b, c)| {
            i as f32 * scale + (a + b + c) as f32
        });
        nifti::writer::WriterOptions::new(&path)
            .write_nifti(&arr)
            .unwrap();
    }
}

fn cfg(split: f64, bs: usize) -> BunchConfig {
    BunchConfig {
        split,
        bs,
        n_jobs: 2,
        seed: Some(42),
        ..Default::default()
    }
}

#[test]
fn bunch_counts_add_up() {
    let _ = simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init();
    let tmp = tempfile::tempdir().unwrap();
    write_volumes(&tmp.path().join("src"), 10, 1000.0, ".nii");
    write_volumes(&tmp.path().join("tgt"), 10, -1000.0, ".nii.gz");

    for split in [0.0, 0.2, 0.5, 1.0] {
        let db = niidatabunch(
            tmp.path().join("src"),
            tmp.path().join("tgt"),
            None,
            &cfg(split, 3),
        )
        .unwrap();
        assert_eq!(db.len_items(), 10);
        assert!(db.valid_ds().len() <= (split * 10.0) as usize);
    }
}

#[test]
fn bunch_rejects_mismatch_and_empty() {
    let tmp = tempfile::tempdir().unwrap();
    let (src, tgt) = (tmp.path().join("src"), tmp.path().join("tgt"));
    fs::create_dir_all(&src).unwrap();
    fs::create_dir_all(&tgt).unwrap();

    assert!(matches!(
        niidatabunch(&src, &tgt, None, &cfg(0.2, 2)),
        Err(DatasetError::Empty)
    ));

    // 文件内容无效也无妨: 个数校验先于任何读取.
    fs::write(src.join("a.nii"), b"garbage").unwrap();
    fs::write(src.join("b.nii"), b"garbage").unwrap();
    fs::write(tgt.join("a.nii"), b"garbage").unwrap();
    assert!(matches!(
        niidatabunch(&src, &tgt, None, &cfg(0.2, 2)),
        Err(DatasetError::CountMismatch { n_src: 2, n_tgt: 1 })
    ));
}

#[test]
fn pairs_stay_aligned_through_batches() {
    let tmp = tempfile::tempdir().unwrap();
    write_volumes(&tmp.path().join("src"), 6, 1000.0, ".nii");
    write_volumes(&tmp.path().join("tgt"), 6, -1000.0, ".nii");

    let tfms: Vec<Box<dyn PixelTransform>> = vec![Box::new(RandomSlice { axis: 2 })];
    let db = niidatabunch(
        tmp.path().join("src"),
        tmp.path().join("tgt"),
        Some(tfms),
        &cfg(0.0, 2),
    )
    .unwrap();
    assert!(db.valid_ds().is_empty());
    assert_eq!(db.train_dl.len(), 3);

    let mut seen = 0;
    for batch in db.train_dl.iter() {
        let batch = batch.unwrap();
        assert_eq!(batch.x.shape(), &[2, 1, 8, 8]);
        assert_eq!(batch.y.shape(), &[2, 1, 8, 8]);
        assert_eq!(batch.device, Device::Cpu);
        for (b, &i) in batch.indices.iter().enumerate() {
            let x = batch.x.index_axis(Axis(0), b);
            let y = batch.y.index_axis(Axis(0), b);
            // 同一文件对、同一随机切片: 坐标和相互抵消.
            let diff = &x - &y;
            let expect = 2000.0 * i as f32;
            assert!(diff.iter().all(|d| (d - expect).abs() < 1e-2));
        }
        seen += batch.len();
    }
    assert_eq!(seen, 6);
}

#[test]
fn train_drops_last_valid_keeps_it() {
    let tmp = tempfile::tempdir().unwrap();
    write_volumes(&tmp.path().join("src"), 5, 10.0, ".nii");
    write_volumes(&tmp.path().join("tgt"), 5, 10.0, ".nii");

    let x = ItemList::from_folder(tmp.path().join("src")).unwrap();
    let y = ItemList::from_folder(tmp.path().join("tgt")).unwrap();
    let split = x.split_by_idx(&[0, 1, 2]);
    let split_y = y.split_by_idx(&[0, 1, 2]);
    let ll = LabelLists {
        path: tmp.path().to_owned(),
        train: LabelList::new(split.train, split_y.train, None).unwrap(),
        valid: LabelList::new(split.valid, split_y.valid, None).unwrap(),
    };
    let db = DataBunch::create_from_ll(ll, 2, Device::Cuda(1), 1, Some(7)).unwrap();

    // train: 2 个样本, bs 2 -> 1 批.
    assert_eq!(db.train_dl.len(), 1);
    // valid: 3 个样本, bs 2 -> 2 批, 最后一批只有 1 个.
    let sizes: Vec<usize> = db.valid_dl.iter().map(|b| b.unwrap().len()).collect();
    assert_eq!(sizes, [2, 1]);

    let first = db.one_batch().unwrap().unwrap();
    assert_eq!(first.x.shape(), &[2, 8, 8, 8]);
    assert_eq!(first.indices, [0, 1]);
    assert_eq!(first.device, Device::Cuda(1));
}

#[test]
fn shuffle_is_reproducible_with_seed() {
    let tmp = tempfile::tempdir().unwrap();
    write_volumes(&tmp.path().join("src"), 8, 1.0, ".nii");
    write_volumes(&tmp.path().join("tgt"), 8, 1.0, ".nii");

    let order = || {
        let db = niidatabunch(
            tmp.path().join("src"),
            tmp.path().join("tgt"),
            None,
            &cfg(0.0, 4),
        )
        .unwrap();
        let indices: Vec<usize> = db
            .train_dl
            .iter()
            .flat_map(|b| b.unwrap().indices)
            .collect();
        indices
    };
    let a = order();
    assert_eq!(a, order());
    let mut sorted = a.clone();
    sorted.sort();
    assert_eq!(sorted, (0..8).collect::<Vec<_>>());
}

#[test]
fn corrupt_file_surfaces_as_error() {
    let tmp = tempfile::tempdir().unwrap();
    let (src, tgt) = (tmp.path().join("src"), tmp.path().join("tgt"));
    write_volumes(&src, 1, 1.0, ".nii");
    fs::create_dir_all(&tgt).unwrap();
    fs::write(tgt.join("vol-00.nii"), b"not a nifti file").unwrap();

    let db = niidatabunch(&src, &tgt, None, &cfg(1.0, 1)).unwrap();
    let batch = db.valid_dl.iter().next().unwrap();
    assert!(matches!(batch, Err(DatasetError::Nifti(_))));
}

/// 全部文件放入验证集 (保持顺序), 并共享 `tfms`.
fn all_valid_bunch(root: &Path, n: usize, tfms: Option<Tfms>, bs: usize) -> DataBunch {
    let idx: Vec<usize> = (0..n).collect();
    let x = ItemList::from_folder(root.join("src")).unwrap().split_by_idx(&idx);
    let y = ItemList::from_folder(root.join("tgt")).unwrap().split_by_idx(&idx);
    let ll = LabelLists {
        path: root.to_owned(),
        train: LabelList::new(x.train, y.train, tfms.clone()).unwrap(),
        valid: LabelList::new(x.valid, y.valid, tfms).unwrap(),
    };
    DataBunch::create_from_ll(ll, bs, Device::Cpu, 2, Some(11)).unwrap()
}

/// 同一批次中多个样本出错时, 总是报告位置最靠前的那个.
#[test]
fn batch_reports_earliest_failing_item() {
    let tfms: Tfms = Tfms::from(vec![
        Box::new(RandomPatch3d { ps: 9 }) as Box<dyn PixelTransform>
    ]);
    for (corrupt, expect_nifti) in [("vol-00.nii", true), ("vol-01.nii", false)] {
        let tmp = tempfile::tempdir().unwrap();
        for side in ["src", "tgt"] {
            let dir = tmp.path().join(side);
            write_volumes(&dir, 2, 1.0, ".nii");
            fs::write(dir.join(corrupt), b"not a nifti file").unwrap();
        }
        let db = all_valid_bunch(tmp.path(), 2, Some(tfms.clone()), 2);
        for _ in 0..16 {
            let err = db.valid_dl.iter().next().unwrap().unwrap_err();
            if expect_nifti {
                assert!(matches!(err, DatasetError::Nifti(_)), "{err}");
            } else {
                assert!(
                    matches!(err, DatasetError::Sample(SampleError::PatchTooLarge(9, _))),
                    "{err}"
                );
            }
        }
    }
}

/// 预览批次不推进轮次, 之后的迭代得到相同的随机切片.
#[test]
fn one_batch_does_not_advance_epoch() {
    let tmp = tempfile::tempdir().unwrap();
    write_volumes(&tmp.path().join("src"), 5, 1000.0, ".nii");
    write_volumes(&tmp.path().join("tgt"), 5, -1000.0, ".nii");
    let tfms: Tfms = Tfms::from(vec![Box::new(RandomSlice { axis: 2 }) as Box<dyn PixelTransform>]);
    let db = all_valid_bunch(tmp.path(), 5, Some(tfms), 4);

    let peeked = db.one_batch().unwrap().unwrap();
    let again = db.one_batch().unwrap().unwrap();
    let first = db.valid_dl.iter().next().unwrap().unwrap();
    assert_eq!(peeked.indices, [0, 1, 2, 3]);
    assert_eq!(peeked.x, again.x);
    assert_eq!(peeked.x, first.x);
    assert_eq!(peeked.y, first.y);
}
