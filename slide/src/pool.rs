//! 顺序或者借助线程池执行一批互相独立的任务。

use crate::report::{JobReport, Outcome};
use std::sync::mpsc::channel;
use std::sync::Arc;
use std::time::Duration;
use threadpool::ThreadPool;

/// 一批任务中的一项。
pub trait BatchJob: Send + 'static {
    /// 出现在日志和报告中的名称。
    fn name(&self) -> String;
}

/// `0`表示使用全部逻辑CPU。
#[inline]
pub fn worker_count(requested: usize) -> usize {
    match requested {
        0 => num_cpus::get(),
        n => n,
    }
}

/// 执行全部任务并按输入顺序返回报告。
///
/// 只有一个工作线程时在当前线程中逐个执行；否则使用固定大小的线程池。
/// 某个任务panic时，以失败报告代替它的结果。
pub fn run_jobs<J, F>(jobs: Vec<J>, workers: usize, f: F) -> Vec<JobReport>
where
    J: BatchJob,
    F: Fn(J) -> JobReport + Send + Sync + 'static,
{
    let workers = worker_count(workers).min(jobs.len().max(1));
    if workers == 1 {
        return jobs
            .into_iter()
            .map(|job| {
                let report = f(job);
                report.log();
                report
            })
            .collect();
    }

    let names: Vec<String> = jobs.iter().map(BatchJob::name).collect();
    let f = Arc::new(f);
    let pool = ThreadPool::new(workers);
    let (tx, rx) = channel();
    for (seq, job) in jobs.into_iter().enumerate() {
        let tx = tx.clone();
        let f = Arc::clone(&f);
        pool.execute(move || {
            let report = f(job);
            report.log();
            // 接收端只会在所有发送端销毁后退出。
            let _ = tx.send((seq, report));
        });
    }
    drop(tx);

    let mut slots: Vec<Option<JobReport>> = vec![None; names.len()];
    for (seq, report) in rx.iter() {
        slots[seq] = Some(report);
    }
    pool.join();
    slots
        .into_iter()
        .zip(names)
        .map(|(slot, name)| {
            slot.unwrap_or_else(|| {
                let report = JobReport::new(
                    name,
                    Outcome::Failed("worker panicked".to_owned()),
                    Duration::ZERO,
                );
                report.log();
                report
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{run_jobs, worker_count, BatchJob};
    use crate::report::{JobReport, Outcome};
    use std::thread;
    use std::time::Duration;

    struct Sleepy(u64);

    impl BatchJob for Sleepy {
        fn name(&self) -> String {
            format!("job-{}", self.0)
        }
    }

    fn run(job: Sleepy) -> JobReport {
        // 让靠前的任务更晚结束。
        thread::sleep(Duration::from_millis(40 - job.0 * 10));
        if job.0 == 2 {
            panic!("boom");
        }
        JobReport::new(job.name(), Outcome::Succeeded(String::new()), Duration::ZERO)
    }

    #[test]
    fn test_worker_count() {
        assert_eq!(worker_count(3), 3);
        assert!(worker_count(0) >= 1);
    }

    #[test]
    fn test_pool_keeps_order() {
        let jobs = (0..4).map(Sleepy).collect();
        let reports = run_jobs(jobs, 4, run);
        let names: Vec<_> = reports.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["job-0", "job-1", "job-2", "job-3"]);
        assert!(!reports[0].outcome.is_failed());
        assert_eq!(reports[2].outcome, Outcome::Failed("worker panicked".into()));
    }

    #[test]
    fn test_sequential() {
        let jobs = vec![Sleepy(3), Sleepy(1)];
        let reports = run_jobs(jobs, 1, run);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].name, "job-3");
    }

    #[test]
    fn test_no_jobs() {
        assert!(run_jobs(Vec::<Sleepy>::new(), 0, run).is_empty());
    }
}
