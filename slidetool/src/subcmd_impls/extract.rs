use super::utils::{ensure_file, finish};
use anyhow::Context;
use clap::Args;
use slide::prelude::{BatchSummary, RoiBatch, RoiJob, TiffOpener};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct Extract {
    /// JSON标注文件。
    #[arg(long = "annotation", short)]
    annotation: PathBuf,
    /// svs切片文件。
    #[arg(long = "image", short)]
    image: PathBuf,
    /// 输出根目录，结果写到其下的`svs`与`png`目录。
    #[arg(long = "output-dir", short)]
    out_dir: PathBuf,
    /// 读取的分辨率层，0为最高分辨率。
    #[arg(long, short, default_value_t = 0)]
    level: usize,
    /// 将任务汇总写入该JSON文件。
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Extract {
    pub fn run(&mut self) -> anyhow::Result<BatchSummary> {
        // [annotation + image] -> [output-dir/{svs,png}/{stem}-roi{idx}.*]
        ensure_file(self.annotation.as_path(), "annotation file")?;
        ensure_file(self.image.as_path(), "slide")?;
        let batch = RoiBatch::new(self.out_dir.as_path(), Arc::new(TiffOpener))
            .context("failed to create output directories")?
            .with_level(self.level);
        let job = RoiJob::single(self.annotation.as_path(), self.image.as_path());
        finish(batch.run(vec![job]), self.report.as_deref())
    }
}
