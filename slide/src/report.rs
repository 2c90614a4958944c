//! 每个任务的结果与整批任务的汇总。

use crate::error::SlideError;
use json::JsonValue;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

/// 单个任务的结局。
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// 任务完成，附带简短说明。
    Succeeded(String),
    /// 任务没有可做的事情（例如没有对应的标注），不视为错误。
    Skipped(String),
    /// 任务失败及原因。
    Failed(String),
}

impl Outcome {
    #[inline]
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    #[inline]
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Succeeded(_) => "succeeded",
            Outcome::Skipped(_) => "skipped",
            Outcome::Failed(_) => "failed",
        }
    }

    #[inline]
    pub fn message(&self) -> &str {
        match self {
            Outcome::Succeeded(s) | Outcome::Skipped(s) | Outcome::Failed(s) => s.as_str(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct JobReport {
    pub name: String,
    pub outcome: Outcome,
    pub elapsed: Duration,
}

impl JobReport {
    #[inline]
    pub fn new(name: impl Into<String>, outcome: Outcome, elapsed: Duration) -> Self {
        Self {
            name: name.into(),
            outcome,
            elapsed,
        }
    }

    /// 以`since`为起点计时，构造一份报告。
    #[inline]
    pub fn since(name: impl Into<String>, outcome: Outcome, since: Instant) -> Self {
        Self::new(name, outcome, since.elapsed())
    }

    /// 按结局的严重程度写日志。
    pub fn log(&self) {
        let secs = self.elapsed.as_secs_f64();
        match &self.outcome {
            Outcome::Succeeded(m) => log::info!("finished `{}` in {secs:.2}s: {m}", self.name),
            Outcome::Skipped(m) => log::warn!("skipped `{}`: {m}", self.name),
            Outcome::Failed(m) => log::error!("failed `{}` after {secs:.2}s: {m}", self.name),
        }
    }

    fn to_json(&self) -> JsonValue {
        json::object! {
            name: self.name.as_str(),
            outcome: self.outcome.kind(),
            message: self.outcome.message(),
            elapsed_secs: self.elapsed.as_secs_f64(),
        }
    }
}

/// 一批任务的报告，保持任务的输入顺序。
#[derive(Clone, Debug, Default)]
pub struct BatchSummary {
    reports: Vec<JobReport>,
    elapsed: Duration,
}

impl BatchSummary {
    #[inline]
    pub fn new(reports: Vec<JobReport>, elapsed: Duration) -> Self {
        Self { reports, elapsed }
    }

    #[inline]
    pub fn reports(&self) -> &[JobReport] {
        self.reports.as_slice()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    fn count(&self, f: impl Fn(&Outcome) -> bool) -> usize {
        self.reports.iter().filter(|r| f(&r.outcome)).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Succeeded(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(Outcome::is_failed)
    }

    #[inline]
    pub fn has_failures(&self) -> bool {
        self.reports.iter().any(|r| r.outcome.is_failed())
    }

    /// 写出汇总行，并逐条列出失败的任务。
    pub fn log(&self) {
        log::info!("{self}");
        for r in self.reports.iter().filter(|r| r.outcome.is_failed()) {
            log::error!("  {}: {}", r.name, r.outcome.message());
        }
    }

    pub fn to_json(&self) -> JsonValue {
        json::object! {
            total: self.len(),
            succeeded: self.succeeded(),
            skipped: self.skipped(),
            failed: self.failed(),
            elapsed_secs: self.elapsed.as_secs_f64(),
            jobs: self.reports.iter().map(JobReport::to_json).collect::<Vec<_>>(),
        }
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), SlideError> {
        let path = path.as_ref();
        fs::write(path, self.to_json().pretty(2)).map_err(|e| SlideError::io(path, e))
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} job(s) in {:.2}s: {} succeeded, {} skipped, {} failed",
            self.len(),
            self.elapsed.as_secs_f64(),
            self.succeeded(),
            self.skipped(),
            self.failed()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{BatchSummary, JobReport, Outcome};
    use std::time::Duration;

    fn sample() -> BatchSummary {
        let ms = Duration::from_millis;
        BatchSummary::new(
            vec![
                JobReport::new("a", Outcome::Succeeded("2 ROI(s)".into()), ms(10)),
                JobReport::new("b", Outcome::Skipped("no annotation".into()), ms(0)),
                JobReport::new("c", Outcome::Failed("exit code 3".into()), ms(5)),
                JobReport::new("d", Outcome::Succeeded("done".into()), ms(7)),
            ],
            ms(30),
        )
    }

    #[test]
    fn test_counts() {
        let s = sample();
        assert_eq!((s.succeeded(), s.skipped(), s.failed()), (2, 1, 1));
        assert!(s.has_failures());
        assert!(!BatchSummary::default().has_failures());
        assert_eq!(
            s.to_string(),
            "4 job(s) in 0.03s: 2 succeeded, 1 skipped, 1 failed"
        );
    }

    #[test]
    fn test_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        sample().write_json(&path).unwrap();

        let j = json::parse(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(j["total"], 4);
        assert_eq!(j["failed"], 1);
        assert_eq!(j["jobs"].len(), 4);
        assert_eq!(j["jobs"][2]["name"], "c");
        assert_eq!(j["jobs"][2]["outcome"], "failed");
        assert_eq!(j["jobs"][2]["message"], "exit code 3");
    }
}
