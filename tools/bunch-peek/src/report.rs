//! 运行结果.

use nii_berry::dataset::BunchConfig;
use std::io::{self, Write};
use std::time::Duration;

/// 单个加载器一轮迭代的统计.
#[derive(Debug, Default)]
pub struct SplitStats {
    pub batches: usize,
    pub items: usize,
    pub x_shape: Option<Vec<usize>>,
    pub y_shape: Option<Vec<usize>>,
    pub elapsed: Duration,
}

impl SplitStats {
    /// 平均每批耗时, 单位微秒. 没有批次时为 `None`.
    fn avg_batch_us(&self) -> Option<f64> {
        (self.batches > 0).then(|| self.elapsed.as_micros() as f64 / self.batches as f64)
    }
}

/// 将 `stats` 的结果写进 `w` 中.
fn describe_into<W: Write>(name: &str, s: &SplitStats, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    #[inline]
    fn shape_to_display(s: &Option<Vec<usize>>) -> String {
        match s {
            Some(s) => format!("{s:?}"),
            None => "/".to_string(),
        }
    }

    writeln!(w, "Split `{name}`:")?;
    writeln!(w, "{S4}Batches: {}", s.batches)?;
    writeln!(w, "{S4}Items: {}", s.items)?;
    writeln!(w, "{S4}Source batch shape: {}", shape_to_display(&s.x_shape))?;
    writeln!(w, "{S4}Target batch shape: {}", shape_to_display(&s.y_shape))?;
    writeln!(w, "{S4}Total time: {} us", s.elapsed.as_micros())?;
    let avg = s.avg_batch_us().map_or_else(|| "/".to_string(), |f| format!("{f:.3}"));
    write!(w, "{S4}Average time: {avg} us per batch")?;
    Ok(())
}

/// 最终结果.
pub struct PeekReport {
    cfg: BunchConfig,
    data: [(&'static str, SplitStats); 2],
}

impl PeekReport {
    pub fn new(cfg: BunchConfig, train: SplitStats, valid: SplitStats) -> Self {
        Self {
            cfg,
            data: [("train", train), ("valid", valid)],
        }
    }

    /// 输出运行结果.
    pub fn analyze(&self) {
        utils::sep();
        println!(
            "bs {}, split {}, device {}, workers {} (of {} cpus)",
            self.cfg.bs,
            self.cfg.split,
            self.cfg.device,
            self.cfg.n_jobs,
            utils::cpus()
        );
        utils::sep();

        let mut buf = Vec::with_capacity(512);
        for (key, stats) in self.data.iter() {
            if describe_into(key, stats, &mut buf).is_ok() {
                println!("{}", String::from_utf8_lossy(&buf));
            }
            buf.clear();

            utils::sep();
        }
    }
}
