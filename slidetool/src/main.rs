use clap::Parser;
use slidetool::Cli;
use std::process::ExitCode;

/// 有任务失败时的退出码。
const EXIT_JOB_FAILED: u8 = 2;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut cmd: Cli = Cli::parse();
    match cmd.run_program() {
        Ok(summary) if summary.has_failures() => ExitCode::from(EXIT_JOB_FAILED),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
