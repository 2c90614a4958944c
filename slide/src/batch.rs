//! 按标注裁剪蓝色ROI的批处理。单图模式与目录模式都只是生成不同的[`RoiJob`]列表。

use crate::annotation::{find_blue_rois, load_annotations};
use crate::error::SlideError;
use crate::extract::extract_region;
use crate::output::{roi_file_stem, save_region};
use crate::pool::{run_jobs, BatchJob};
use crate::reader::SlideOpener;
use crate::report::{BatchSummary, JobReport, Outcome};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// 一张切片及其标注文件。
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RoiJob {
    pub annotation_path: PathBuf,
    pub image_path: PathBuf,
    /// 输出文件名`{base_name}-roi{idx}`的前缀。
    pub base_name: String,
    /// 同一批次中已使用该前缀的切片；存在时本任务不写任何文件。
    pub claimed_by: Option<PathBuf>,
}

impl RoiJob {
    /// 单图模式：前缀为切片文件名去掉扩展名。
    pub fn single<P: Into<PathBuf>, Q: Into<PathBuf>>(annotation_path: P, image_path: Q) -> Self {
        let image_path = image_path.into();
        let base_name = image_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            annotation_path: annotation_path.into(),
            image_path,
            base_name,
            claimed_by: None,
        }
    }
}

impl BatchJob for RoiJob {
    fn name(&self) -> String {
        self.image_path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.image_path.display().to_string())
    }
}

struct Context {
    svs_dir: PathBuf,
    png_dir: PathBuf,
    level: usize,
    opener: Arc<dyn SlideOpener>,
}

/// 裁剪结果写到`{out}/svs/`与`{out}/png/`下。
pub struct RoiBatch {
    svs_dir: PathBuf,
    png_dir: PathBuf,
    level: usize,
    workers: usize,
    opener: Arc<dyn SlideOpener>,
}

impl RoiBatch {
    /// 创建输出目录。
    pub fn new<P: AsRef<Path>>(out_dir: P, opener: Arc<dyn SlideOpener>) -> Result<Self, SlideError> {
        let out_dir = out_dir.as_ref();
        let svs_dir = out_dir.join("svs");
        let png_dir = out_dir.join("png");
        for dir in [svs_dir.as_path(), png_dir.as_path()] {
            fs::create_dir_all(dir).map_err(|e| SlideError::io(dir, e))?;
        }
        Ok(Self {
            svs_dir,
            png_dir,
            level: 0,
            workers: 1,
            opener,
        })
    }

    /// 读取的分辨率层，默认为0（最高分辨率）。
    #[inline]
    pub fn with_level(mut self, level: usize) -> Self {
        self.level = level;
        self
    }

    /// 并行处理的切片数，`0`表示逻辑CPU个数，默认为1。
    #[inline]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn run(&self, jobs: Vec<RoiJob>) -> BatchSummary {
        let start = Instant::now();
        log::info!("processing {} slide(s) ...", jobs.len());
        let ctx = Context {
            svs_dir: self.svs_dir.clone(),
            png_dir: self.png_dir.clone(),
            level: self.level,
            opener: Arc::clone(&self.opener),
        };
        let reports = run_jobs(jobs, self.workers, move |job| ctx.process(job));
        BatchSummary::new(reports, start.elapsed())
    }
}

impl Context {
    fn process(&self, job: RoiJob) -> JobReport {
        let start = Instant::now();
        let name = job.name();
        if let Some(first) = job.claimed_by.as_deref() {
            return JobReport::since(
                name,
                Outcome::Failed(format!(
                    "output name `{}` is already used by `{}`",
                    job.base_name,
                    first.display()
                )),
                start,
            );
        }
        if !job.annotation_path.is_file() {
            return JobReport::since(
                name,
                Outcome::Skipped(format!(
                    "annotation file not found, expected path: `{}`",
                    job.annotation_path.display()
                )),
                start,
            );
        }
        let outcome = match self.extract_all(&job) {
            Ok(outcome) => outcome,
            Err(e) => Outcome::Failed(error_chain(&e)),
        };
        JobReport::since(name, outcome, start)
    }

    fn extract_all(&self, job: &RoiJob) -> Result<Outcome, SlideError> {
        let annotations = load_annotations(job.annotation_path.as_path())?;
        let rois = find_blue_rois(&annotations);
        log::debug!("detected blue ROIs in `{}`: {rois:?}", job.name());
        if rois.is_empty() {
            return Ok(Outcome::Skipped(
                "no blue regions found in the annotations".to_owned(),
            ));
        }
        log::info!("processing `{}`, {} blue ROI(s)", job.name(), rois.len());

        let mut slide = self.opener.open(job.image_path.as_path())?;
        let mut failures = Vec::new();
        for (idx, roi) in rois.iter().enumerate() {
            let idx = idx + 1;
            let result = extract_region(slide.as_mut(), roi, self.level).and_then(|img| {
                save_region(
                    &img,
                    self.png_dir.as_path(),
                    self.svs_dir.as_path(),
                    roi_file_stem(&job.base_name, idx).as_str(),
                )
            });
            if let Err(e) = result {
                log::warn!("`{}` ROI {idx}: {}", job.name(), error_chain(&e));
                failures.push(format!("roi{idx}: {}", error_chain(&e)));
            }
        }

        Ok(if failures.is_empty() {
            Outcome::Succeeded(format!("{} ROI(s) written", rois.len()))
        } else {
            Outcome::Failed(format!(
                "{}/{} ROI(s) failed; {}",
                failures.len(),
                rois.len(),
                failures.join("; ")
            ))
        })
    }
}

fn error_chain(e: &dyn std::error::Error) -> String {
    let mut s = e.to_string();
    let mut cur = e.source();
    while let Some(inner) = cur {
        s.push_str(": ");
        s.push_str(&inner.to_string());
        cur = inner.source();
    }
    s
}
