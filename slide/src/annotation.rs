//! 读取切片标注文件。
//!
//! 标注文件是一个JSON数组，每一项形如
//! `{"color": int, "region": {"x": int, "y": int, "width": int, "height": int}}`。

use crate::error::SlideError;
use crate::geom::{Argb, Region, Roi};
use json::JsonValue;
use std::fs;
use std::path::Path;

/// 一个带颜色的矩形标注。
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Annotation {
    pub color: Argb,
    pub region: Region,
}

pub fn load_annotations<P: AsRef<Path>>(path: P) -> Result<Vec<Annotation>, SlideError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| SlideError::io(path, e))?;
    parse_annotations(&text, path)
}

/// 解析标注文本；`path`只用于错误信息。
pub fn parse_annotations(text: &str, path: &Path) -> Result<Vec<Annotation>, SlideError> {
    let root = json::parse(text).map_err(|source| SlideError::AnnotationSyntax {
        path: path.to_path_buf(),
        source,
    })?;
    if !root.is_array() {
        return Err(SlideError::AnnotationSchema {
            path: path.to_path_buf(),
            index: 0,
            reason: "top level value is not an array".to_owned(),
        });
    }

    root.members()
        .enumerate()
        .map(|(index, item)| {
            parse_item(item).map_err(|reason| SlideError::AnnotationSchema {
                path: path.to_path_buf(),
                index,
                reason,
            })
        })
        .collect()
}

fn parse_item(item: &JsonValue) -> Result<Annotation, String> {
    let color = &item["color"];
    let color = color
        .as_i64()
        .or_else(|| color.as_f64().filter(|v| v.is_finite()).map(|v| v as i64))
        .ok_or_else(|| format!("`color` must be an integer, got `{}`", color.dump()))?;

    let region = &item["region"];
    if !region.is_object() {
        return Err("`region` must be an object".to_owned());
    }
    Ok(Annotation {
        color: Argb::from(color),
        region: Region::new(
            int_field(region, "x")?,
            int_field(region, "y")?,
            int_field(region, "width")?,
            int_field(region, "height")?,
        ),
    })
}

// 坐标可能以浮点数写出，按整数转换的规则向零截断。
fn int_field(region: &JsonValue, key: &str) -> Result<i64, String> {
    let v = &region[key];
    if let Some(i) = v.as_i64() {
        return Ok(i);
    }
    match v.as_f64() {
        Some(f) if f.is_finite() => Ok(f.trunc() as i64),
        _ => Err(format!("`region.{key}` must be a number, got `{}`", v.dump())),
    }
}

/// 按顺序取出所有蓝色标注，并归一化为ROI。
pub fn find_blue_rois(annotations: &[Annotation]) -> Vec<Roi> {
    annotations
        .iter()
        .filter(|a| a.color.is_blue())
        .map(|a| a.region.normalize())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{find_blue_rois, load_annotations, parse_annotations};
    use crate::error::SlideError;
    use crate::geom::{Argb, Region, Roi};
    use std::path::Path;

    const SAMPLE: &str = r#"[
        {"color": -16776961, "region": {"x": 100, "y": 100, "width": -50, "height": 30}},
        {"color": 4294901760, "region": {"x": 0, "y": 0, "width": 10, "height": 10}},
        {"color": 4278190335, "region": {"x": 100.9, "y": 100, "width": -50, "height": -40}}
    ]"#;

    #[test]
    fn test_parse_sample() {
        let list = parse_annotations(SAMPLE, Path::new("1.json")).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list[0].color, Argb(0xFF0000FF));
        assert_eq!(list[1].color, Argb(0xFFFF0000));
        assert_eq!(list[2].region, Region::new(100, 100, -50, -40));
    }

    #[test]
    fn test_find_blue_rois() {
        let list = parse_annotations(SAMPLE, Path::new("1.json")).unwrap();
        assert_eq!(
            find_blue_rois(&list),
            vec![Roi::new(50, 100, 50, 30), Roi::new(50, 60, 50, 40)]
        );
    }

    #[test]
    fn test_empty_list() {
        let list = parse_annotations("[]", Path::new("1.json")).unwrap();
        assert!(list.is_empty());
        assert!(find_blue_rois(&list).is_empty());
    }

    #[test]
    fn test_schema_errors() {
        let path = Path::new("1.json");
        assert!(matches!(
            parse_annotations("{}", path),
            Err(SlideError::AnnotationSchema { .. })
        ));
        assert!(matches!(
            parse_annotations(r#"[{"region": {"x": 1, "y": 1, "width": 1, "height": 1}}]"#, path),
            Err(SlideError::AnnotationSchema { index: 0, .. })
        ));
        assert!(matches!(
            parse_annotations(
                r#"[{"color": 1, "region": {"x": 1, "y": 1, "width": 1, "height": 1}},
                    {"color": 1, "region": {"x": 1, "y": "a", "width": 1, "height": 1}}]"#,
                path
            ),
            Err(SlideError::AnnotationSchema { index: 1, .. })
        ));
        assert!(matches!(
            parse_annotations("[", path),
            Err(SlideError::AnnotationSyntax { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_annotations(dir.path().join("nope.json")),
            Err(SlideError::Io { .. })
        ));
    }
}
