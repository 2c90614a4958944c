use anyhow::Context;
use clap::{Parser, Subcommand};
use slide::prelude::BatchSummary;
use std::mem;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "slidetool")]
#[command(about = "KFB切片转换与蓝色标注区域裁剪的工具集.")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// 子命令。
    #[command(subcommand)]
    command: Commands,
    /// 外部程序依赖的动态库目录，可重复指定。
    #[arg(long = "lib-dir", global = true)]
    lib_dirs: Vec<PathBuf>,
}

impl Cli {
    pub fn run_program(&mut self) -> anyhow::Result<BatchSummary> {
        slide::runtime::init(mem::take(&mut self.lib_dirs))
            .context("failed to configure library search path")?;
        match self.command {
            Commands::Convert(ref mut v) => v.run(),
            Commands::Extract(ref mut v) => v.run(),
            Commands::ExtractFolder(ref mut v) => v.run(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 调用外部转换程序，将目录中的kfb文件逐个转换为svs文件。
    Convert(crate::subcmd_impls::convert::Convert),
    /// 按一个标注文件裁剪一张切片中的蓝色区域。
    Extract(crate::subcmd_impls::extract::Extract),
    /// 按`{stem}_kfb/Annotations/1.json`配对，批量裁剪目录中所有切片的蓝色区域。
    ExtractFolder(crate::subcmd_impls::extract_folder::ExtractFolder),
}
