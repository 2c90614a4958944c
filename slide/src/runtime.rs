//! 外部程序所需动态库的进程级搜索路径。
//!
//! 加载时不做任何配置：入口处调用一次[`init`]，之后每个转换子进程都会在
//! 平台对应的动态库搜索变量前加上这些目录。

use crate::error::SlideError;
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::OnceLock;

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        pub const LIBRARY_PATH_VAR: &str = "PATH";
    } else if #[cfg(target_os = "macos")] {
        pub const LIBRARY_PATH_VAR: &str = "DYLD_LIBRARY_PATH";
    } else {
        pub const LIBRARY_PATH_VAR: &str = "LD_LIBRARY_PATH";
    }
}

static SEARCH_DIRS: OnceLock<Vec<PathBuf>> = OnceLock::new();

/// 记录动态库搜索目录，每个目录都必须存在。重复调用返回[`SlideError::AlreadyInitialized`]。
pub fn init<I>(dirs: I) -> Result<(), SlideError>
where
    I: IntoIterator<Item = PathBuf>,
{
    let dirs: Vec<PathBuf> = dirs.into_iter().collect();
    if let Some(missing) = dirs.iter().find(|d| !d.is_dir()) {
        return Err(SlideError::MissingSearchDir(missing.clone()));
    }
    for d in dirs.iter() {
        log::debug!("library search directory: `{}`", d.display());
    }
    SEARCH_DIRS
        .set(dirs)
        .map_err(|_| SlideError::AlreadyInitialized)
}

#[inline]
fn search_dirs() -> &'static [PathBuf] {
    SEARCH_DIRS.get().map(Vec::as_slice).unwrap_or_default()
}

/// 子进程中[`LIBRARY_PATH_VAR`]应取的值；未配置任何目录时为`None`。
pub fn library_path_env() -> Option<OsString> {
    compose_search_path(search_dirs(), env::var_os(LIBRARY_PATH_VAR))
}

fn compose_search_path(dirs: &[PathBuf], existing: Option<OsString>) -> Option<OsString> {
    if dirs.is_empty() {
        return None;
    }
    let inherited = existing
        .as_deref()
        .map(|v| env::split_paths(v).collect::<Vec<_>>())
        .unwrap_or_default();
    env::join_paths(dirs.iter().cloned().chain(inherited)).ok()
}
