//! 调用厂商提供的转换程序，将`.kfb`切片逐个转换为`.svs`。

use crate::error::ConvertError;
use crate::pool::{run_jobs, BatchJob};
use crate::report::{BatchSummary, JobReport, Outcome};
use crate::runtime;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::Instant;
use walkdir::WalkDir;

/// 转换等级下限。
pub const MIN_LEVEL: u8 = 2;
/// 转换等级上限。
pub const MAX_LEVEL: u8 = 9;
/// 源文件扩展名。
pub const SOURCE_EXTENSION: &str = "kfb";
/// 输出文件扩展名。
pub const DEST_EXTENSION: &str = "svs";

pub fn check_level(level: u8) -> Result<u8, ConvertError> {
    if (MIN_LEVEL..=MAX_LEVEL).contains(&level) {
        Ok(level)
    } else {
        Err(ConvertError::LevelOutOfRange {
            level,
            min: MIN_LEVEL,
            max: MAX_LEVEL,
        })
    }
}

/// 经过检查的转换配置。构造成功之后才会开始任何转换。
#[derive(Clone, Debug)]
pub struct ConvertConfig {
    exe: PathBuf,
    src_dir: PathBuf,
    dest_dir: PathBuf,
    level: u8,
    workers: usize,
}

impl ConvertConfig {
    pub fn new(
        exe: impl Into<PathBuf>,
        src_dir: impl Into<PathBuf>,
        dest_dir: impl Into<PathBuf>,
        level: u8,
    ) -> Result<Self, ConvertError> {
        let level = check_level(level)?;
        let exe = exe.into();
        if !exe.is_file() {
            return Err(ConvertError::MissingExecutable(exe));
        }
        let src_dir = src_dir.into();
        if !src_dir.is_dir() {
            return Err(ConvertError::MissingSourceDir(src_dir));
        }
        Ok(Self {
            exe,
            src_dir,
            dest_dir: dest_dir.into(),
            level,
            workers: 1,
        })
    }

    /// 同时运行的转换进程数，`0`表示逻辑CPU个数，默认为1。
    #[inline]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[inline]
    pub fn level(&self) -> u8 {
        self.level
    }

    /// 列出源目录中（不递归）所有`.kfb`文件对应的任务，按文件名排序。
    pub fn discover_jobs(&self) -> Result<Vec<ConversionJob>, ConvertError> {
        let mut jobs = Vec::new();
        for entry in WalkDir::new(self.src_dir.as_path())
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let is_source = path
                .extension()
                .and_then(|s| s.to_str())
                .map(|s| s.eq_ignore_ascii_case(SOURCE_EXTENSION))
                .unwrap_or(false);
            if !is_source {
                continue;
            }
            let dest_path = self
                .dest_dir
                .join(entry.file_name())
                .with_extension(DEST_EXTENSION);
            jobs.push(ConversionJob {
                source_path: path.to_path_buf(),
                dest_path,
                level: self.level,
            });
        }
        Ok(jobs)
    }

    /// 创建输出目录并执行全部转换。单个转换失败不会中止整批任务。
    pub fn run(&self) -> Result<BatchSummary, ConvertError> {
        fs::create_dir_all(self.dest_dir.as_path()).map_err(|source| ConvertError::CreateDir {
            path: self.dest_dir.clone(),
            source,
        })?;
        let jobs = self.discover_jobs()?;
        log::info!(
            "found {} slide(s), converting to {DEST_EXTENSION} format ...",
            jobs.len()
        );

        let start = Instant::now();
        let converter = Converter::new(self.exe.as_path());
        let reports = run_jobs(jobs, self.workers, move |job| converter.convert(&job));
        Ok(BatchSummary::new(reports, start.elapsed()))
    }
}

/// 一次转换。
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConversionJob {
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
    pub level: u8,
}

impl BatchJob for ConversionJob {
    fn name(&self) -> String {
        self.source_path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source_path.display().to_string())
    }
}

/// 外部转换程序，调用方式为`<exe> <src> <dst> <level>`。
#[derive(Clone, Debug)]
pub struct Converter {
    exe: PathBuf,
}

impl Converter {
    #[inline]
    pub fn new<P: AsRef<Path>>(exe: P) -> Self {
        Self {
            exe: exe.as_ref().to_path_buf(),
        }
    }

    /// 构造子进程命令；若已初始化库搜索路径，则一并传给子进程。
    pub fn command(&self, job: &ConversionJob) -> Command {
        let mut cmd = Command::new(self.exe.as_path());
        cmd.arg(job.source_path.as_os_str())
            .arg(job.dest_path.as_os_str())
            .arg(job.level.to_string());
        if let Some(search_path) = runtime::library_path_env() {
            cmd.env(runtime::LIBRARY_PATH_VAR, search_path);
        }
        cmd
    }

    /// 运行一次转换并等待结束，记录退出状态与耗时。
    ///
    /// 先删除上次留下的输出文件，否则无法判断这次是否真的写出了结果。
    pub fn convert(&self, job: &ConversionJob) -> JobReport {
        let start = Instant::now();
        log::info!("processing `{}` ...", job.source_path.display());
        if let Err(e) = remove_stale(job.dest_path.as_path()) {
            let outcome = Outcome::Failed(format!(
                "cannot remove stale `{}`: {e}",
                job.dest_path.display()
            ));
            return JobReport::since(job.name(), outcome, start);
        }
        let outcome = match self.command(job).status() {
            Ok(status) => judge(status, job.dest_path.as_path()),
            Err(e) => Outcome::Failed(format!(
                "cannot start `{}`: {e}",
                self.exe.display()
            )),
        };
        JobReport::since(job.name(), outcome, start)
    }
}

fn remove_stale(dest: &Path) -> std::io::Result<()> {
    match fs::remove_file(dest) {
        Ok(()) => {
            log::debug!("removed stale `{}`", dest.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn judge(status: ExitStatus, dest: &Path) -> Outcome {
    match status.code() {
        Some(0) if dest.is_file() => Outcome::Succeeded(format!("wrote `{}`", dest.display())),
        Some(0) => Outcome::Failed(format!(
            "converter exited successfully but `{}` was not written",
            dest.display()
        )),
        Some(code) => Outcome::Failed(format!("converter exited with code {code}")),
        None => Outcome::Failed("converter was terminated by a signal".to_owned()),
    }
}
