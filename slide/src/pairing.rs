//! 目录模式下切片与标注文件的配对规则。

use crate::batch::RoiJob;
use crate::error::SlideError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 切片`Sample.svs`的标注位于`{root}/sample_kfb/Annotations/1.json`。
pub fn annotation_path_for(annotation_root: &Path, stem: &str) -> PathBuf {
    let mut p = annotation_root.join(format!("{}_kfb", stem.to_lowercase()));
    p.extend(["Annotations", "1.json"]);
    p
}

/// 扩展名比较不区分大小写，且不带`.`。
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// 为`image_dir`下（不递归）每个符合扩展名的切片生成任务，按文件名排序。
///
/// 标注文件是否存在留到执行时检查，缺失的切片在报告中记为跳过。
/// 前缀相同（如`Case.svs`与`case.tif`）时只有第一张切片写出结果，
/// 之后的任务记下占用者，执行时记为失败。
pub fn pair_folder(
    annotation_root: &Path,
    image_dir: &Path,
    extensions: &[String],
) -> Result<Vec<RoiJob>, SlideError> {
    let mut jobs = Vec::new();
    let mut owners: HashMap<String, PathBuf> = HashMap::new();
    for entry in WalkDir::new(image_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(image_dir).to_path_buf();
            SlideError::io(path, e.into())
        })?;
        let path = entry.path();
        if !path.is_file() || !has_extension(path, extensions) {
            continue;
        }
        let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().to_lowercase()) else {
            continue;
        };
        let claimed_by = owners.get(&stem).cloned();
        if claimed_by.is_none() {
            owners.insert(stem.clone(), path.to_path_buf());
        }
        jobs.push(RoiJob {
            annotation_path: annotation_path_for(annotation_root, &stem),
            image_path: path.to_path_buf(),
            base_name: stem,
            claimed_by,
        });
    }
    Ok(jobs)
}
