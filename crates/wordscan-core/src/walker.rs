//! 容错目录遍历（SafeTreeWalker）
//!
//! - 深度优先、先序：每个目录先产出匹配的文件，再依次进入子目录；
//! - 目录无权限访问或已消失时视为空目录，整体遍历继续；
//! - 每次产出文件、每次进入子目录前检查取消信号，已取消则产出一次
//!   `ScanError::Canceled` 后结束（不会静默停止）。
use std::cmp::Ordering;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::cancel::CancelToken;
use crate::error::{Result, ScanError};

/// 默认文件匹配模式
pub const DEFAULT_PATTERN: &str = "*.txt";

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// 遍历范围：根目录 + 文件名模式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    pub root: PathBuf,
    pub pattern: String,
}

impl ScanTarget {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), pattern: DEFAULT_PATTERN.to_string() }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }
}

/// 惰性、可取消的文件路径序列（单消费者，只能向前，不可重启）
pub struct SafeTreeWalker {
    inner: walkdir::IntoIter,
    pattern: Pattern,
    cancel: CancelToken,
    root: PathBuf,
    resolved_root: PathBuf,
    /// 不参与遍历的路径（已解析为绝对规范路径）
    excluded: Vec<PathBuf>,
    done: bool,
}

impl SafeTreeWalker {
    pub fn new(target: &ScanTarget, cancel: CancelToken) -> Result<Self> {
        let pattern = Pattern::new(&target.pattern)
            .map_err(|e| ScanError::Pattern(format!("{}: {}", target.pattern, e)))?;
        // walkdir 内部即显式目录栈；排序保证同一目录内"文件在前、子目录在后"，各自按名称升序
        let inner = WalkDir::new(&target.root)
            .min_depth(1)
            .follow_links(false)
            .sort_by(files_first)
            .into_iter();
        Ok(Self {
            inner,
            pattern,
            cancel,
            root: target.root.clone(),
            resolved_root: resolve_path(&target.root),
            excluded: Vec::new(),
            done: false,
        })
    }

    /// 排除若干文件或目录（例如扫描自身的输出）；被排除的目录整体跳过
    pub fn excluding<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.excluded.extend(paths.into_iter().map(|p| resolve_path(p.as_ref())));
        self
    }

    fn is_excluded(&self, entry: &DirEntry) -> bool {
        if self.excluded.is_empty() {
            return false;
        }
        let full = match entry.path().strip_prefix(&self.root) {
            Ok(rel) => self.resolved_root.join(rel),
            Err(_) => resolve_path(entry.path()),
        };
        self.excluded.iter().any(|e| *e == full)
    }

    fn matches(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        self.pattern.matches_with(&name, MATCH_OPTIONS)
    }

    fn finish(&mut self, err: ScanError) -> Option<Result<PathBuf>> {
        self.done = true;
        Some(Err(err))
    }
}

impl Iterator for SafeTreeWalker {
    type Item = Result<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    if is_skippable(&err) {
                        debug!(path = ?err.path(), error = %err, "skipping inaccessible directory");
                        continue;
                    }
                    let path = err.path().map(|p| p.to_path_buf()).unwrap_or_default();
                    let source = err
                        .into_io_error()
                        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "directory walk failed"));
                    return self.finish(ScanError::io(path, source));
                }
            };

            let file_type = entry.file_type();
            if self.is_excluded(&entry) {
                if file_type.is_dir() {
                    self.inner.skip_current_dir();
                }
                continue;
            }
            if file_type.is_dir() {
                // 即将进入子目录
                if self.cancel.is_cancelled() {
                    return self.finish(ScanError::Canceled);
                }
                continue;
            }
            if !file_type.is_file() || !self.matches(&entry) {
                continue;
            }
            if self.cancel.is_cancelled() {
                return self.finish(ScanError::Canceled);
            }
            return Some(Ok(entry.into_path()));
        }
    }
}

impl std::iter::FusedIterator for SafeTreeWalker {}

/// 只吞掉"无权限"和"目录不存在"两类错误，其余一律向上传播
fn is_skippable(err: &walkdir::Error) -> bool {
    matches!(
        err.io_error().map(io::Error::kind),
        Some(io::ErrorKind::PermissionDenied) | Some(io::ErrorKind::NotFound)
    )
}

/// 解析为绝对规范路径；路径尚不存在时规范化最长的已存在前缀，再拼接剩余部分
fn resolve_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().map(|cwd| cwd.join(path)).unwrap_or_else(|_| path.to_path_buf())
    };
    let mut existing = absolute.as_path();
    let mut rest: Vec<&std::ffi::OsStr> = Vec::new();
    loop {
        if let Ok(canonical) = fs::canonicalize(existing) {
            return rest.iter().rev().fold(canonical, |acc, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name);
                existing = parent;
            }
            _ => return absolute,
        }
    }
}

fn files_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}
