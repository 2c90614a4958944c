use super::utils::{ensure_dir, finish};
use anyhow::Context;
use clap::Args;
use slide::prelude::{pair_folder, BatchSummary, RoiBatch, TiffOpener};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct ExtractFolder {
    /// 标注根目录，其下每张切片对应一个`{stem}_kfb`子目录（小写）。
    #[arg(long = "annotation-dir", short)]
    annotation_dir: PathBuf,
    /// svs切片目录。
    #[arg(long = "image-dir", short)]
    image_dir: PathBuf,
    /// 输出根目录，结果写到其下的`svs`与`png`目录。
    #[arg(long = "output-dir", short)]
    out_dir: PathBuf,
    /// 参与处理的切片扩展名（不区分大小写），可重复指定。
    #[arg(long = "ext", default_value = "svs")]
    extensions: Vec<String>,
    /// 读取的分辨率层，0为最高分辨率。
    #[arg(long, short, default_value_t = 0)]
    level: usize,
    /// 同时处理的切片数，0表示逻辑CPU个数。
    #[arg(long, short, default_value_t = 1)]
    jobs: usize,
    /// 将任务汇总写入该JSON文件。
    #[arg(long)]
    report: Option<PathBuf>,
}

impl ExtractFolder {
    pub fn run(&mut self) -> anyhow::Result<BatchSummary> {
        // [image-dir/*.svs + annotation-dir/{stem}_kfb/Annotations/1.json] -> [output-dir/{svs,png}]
        ensure_dir(self.annotation_dir.as_path(), "annotation directory")?;
        ensure_dir(self.image_dir.as_path(), "slide directory")?;
        let jobs = pair_folder(
            self.annotation_dir.as_path(),
            self.image_dir.as_path(),
            self.extensions.as_slice(),
        )
        .context("failed to list slides")?;
        let batch = RoiBatch::new(self.out_dir.as_path(), Arc::new(TiffOpener))
            .context("failed to create output directories")?
            .with_level(self.level)
            .with_workers(self.jobs);
        finish(batch.run(jobs), self.report.as_deref())
    }
}
