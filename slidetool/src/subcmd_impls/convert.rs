use super::utils::{finish, level_legal_range};
use anyhow::Context;
use clap::Args;
use slide::prelude::{BatchSummary, ConvertConfig};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct Convert {
    /// kfb源文件目录。
    #[arg(long = "input-dir", short)]
    in_dir: PathBuf,
    /// svs输出目录。
    #[arg(long = "output-dir", short)]
    out_dir: PathBuf,
    /// 外部转换程序（如`KFbioConverter.exe`）的路径。
    #[arg(long, short)]
    exe: PathBuf,
    /// 转换等级，取值范围为[2, 9]。
    #[arg(long, short, default_value_t = 9, value_parser = level_legal_range)]
    level: u8,
    /// 同时运行的转换进程数，0表示逻辑CPU个数。
    #[arg(long, short, default_value_t = 1)]
    jobs: usize,
    /// 将任务汇总写入该JSON文件。
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Convert {
    pub fn run(&mut self) -> anyhow::Result<BatchSummary> {
        // [input-dir/*.kfb] -> [output-dir/*.svs]
        let config = ConvertConfig::new(
            self.exe.as_path(),
            self.in_dir.as_path(),
            self.out_dir.as_path(),
            self.level,
        )
        .context("invalid conversion settings")?
        .with_workers(self.jobs);
        log::info!("conversion level: {}", config.level());
        let summary = config.run().context("conversion could not start")?;
        finish(summary, self.report.as_deref())
    }
}
