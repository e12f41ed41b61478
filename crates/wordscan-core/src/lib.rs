//! 词频扫描与脱敏核心库
//!
//! 设计要点：
//! - 目录遍历为惰性、可取消的序列：无权限或已消失的目录视为空目录，不中断整体扫描。
//! - 单文件计数为纯函数：大小写不敏感、命中不重叠，结果顺序与词表一致。
//! - 协调器独占结果缓冲区，只追加；展示层通过事件通道订阅进度与命中记录。
//! - 取消信号显式传给每个阶段（包括输出写入），取消是一种正常结局而不是失败。
//! - 多线程时文件读取与计数并行，提交按发现顺序重排，结果与串行完全一致。

mod cancel;
mod error;
mod matcher;
mod options;
mod output;
mod progress;
mod scan;
mod types;
mod walker;
mod words;

pub use cancel::CancelToken;
pub use error::{Result, ScanError, ValidationError};
pub use matcher::{count_occurrences, WordMatcher};
pub use options::{
    load_config, ScanConfig, ScanOptions, WordSource, DEFAULT_CENSORED_FILE, DEFAULT_FOUND_DIR,
    DEFAULT_REPORT_FILE,
};
pub use output::{
    censor_words, copy_to_dir, parse_report, write_censored, write_json, write_report, write_report_to, ReportRow,
    REDACTION_TOKEN, REPORT_HEADER,
};
pub use progress::{
    EventSink, ProgressCounter, ScanEvent, FILE_STAGE_SHARE, PROGRESS_MAX, QUANTUM_CENSOR, QUANTUM_FILE,
    QUANTUM_REPORT, QUANTUM_STREAM_DONE, QUANTUM_WORDS,
};
pub use scan::{run_scan, ScanHandle, Scanner};
pub use types::{FileMatchResult, ScanOutcome, ScanStats, ScanSummary, WordCount};
pub use walker::{SafeTreeWalker, ScanTarget, DEFAULT_PATTERN};
pub use words::WordSet;
