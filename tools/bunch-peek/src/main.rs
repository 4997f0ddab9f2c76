//! 从环境变量配置的目录组装数据集, 并报告每个批次的形状与耗时.

mod report;
mod runner;

use log::LevelFilter;
use simple_logger::SimpleLogger;

fn main() {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()
        .expect("logger already initialized");

    match runner::run() {
        Ok(report) => report.analyze(),
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    }
}
