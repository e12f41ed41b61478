//! 错误类型
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// 扫描开始前的输入校验错误（直接反馈给操作者，不做任何默认值兜底）
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("no words entered and no word source file selected")]
    NoWordSource,
    #[error("word list contains no words")]
    NoWords,
    #[error("no folder to analyze selected")]
    NoTargetDirectory,
    #[error("word source file {} is empty", .path.display())]
    SourceFileEmpty { path: PathBuf },
    #[error("cannot read word source file {}: {source}", .path.display())]
    SourceFileUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// 扫描过程中的错误
///
/// `Canceled` 只在各层之间传递；`Scanner::run` 会把它转换为
/// `ScanOutcome::Canceled`，不会作为失败返回给调用方。
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("scan canceled")]
    Canceled,
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot build word matcher: {0}")]
    Matcher(String),
    #[error("invalid file pattern: {0}")]
    Pattern(String),
    #[error("malformed report: {0}")]
    Report(String),
    #[error("cannot start worker pool: {0}")]
    ThreadPool(String),
}

impl ScanError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ScanError::Io { path: path.into(), source }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, ScanError::Canceled)
    }
}

pub type Result<T, E = ScanError> = std::result::Result<T, E>;
