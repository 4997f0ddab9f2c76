//! 程序运行函数.

use crate::report::{PeekReport, SplitStats};
use log::info;
use nii_berry::dataset::{niidatabunch, DataLoader};
use nii_berry::transforms::{PixelTransform, RandomSlice};
use nii_berry::DatasetResult;
use std::time::Instant;
use utils::loader;

/// 迭代一轮, 收集统计信息. 遇到第一个错误即返回.
fn peek(dl: &DataLoader) -> DatasetResult<SplitStats> {
    let mut stats = SplitStats::default();
    let started = Instant::now();
    for batch in dl.iter() {
        let batch = batch?;
        stats.batches += 1;
        stats.items += batch.len();
        stats.x_shape.get_or_insert_with(|| batch.x.shape().to_vec());
        stats.y_shape.get_or_insert_with(|| batch.y.shape().to_vec());
    }
    stats.elapsed = started.elapsed();
    Ok(stats)
}

/// 实际运行.
pub fn run() -> Result<PeekReport, String> {
    let src = loader::source_dir_from_env_or_home().ok_or("cannot locate home directory")?;
    let tgt = loader::target_dir_from_env_or_home().ok_or("cannot locate home directory")?;
    let cfg = loader::bunch_config_from_env().map_err(|e| format!("bad config: {e}"))?;
    info!("source `{}`, target `{}`", src.display(), tgt.display());

    let tfms: Vec<Box<dyn PixelTransform>> = vec![Box::new(RandomSlice { axis: 2 })];
    let db = niidatabunch(&src, &tgt, Some(tfms), &cfg).map_err(|e| e.to_string())?;

    println!("Peeking into data bunch...");
    let train = peek(&db.train_dl).map_err(|e| e.to_string())?;
    let valid = peek(&db.valid_dl).map_err(|e| e.to_string())?;
    Ok(PeekReport::new(cfg, train, valid))
}
