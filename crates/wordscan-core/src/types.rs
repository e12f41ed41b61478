//! 公共类型（对外暴露）
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 单个词在文件中的出现次数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
}

impl WordCount {
    pub fn new(word: impl Into<String>, count: usize) -> Self {
        Self { word: word.into(), count }
    }
}

/// 单个命中文件的结果
///
/// `matches` 只包含次数大于 0 的词，顺序与词表一致。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMatchResult {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub matches: Vec<WordCount>,
}

impl FileMatchResult {
    /// 报告中 Words 列的渲染：`word: count`，以 `, ` 连接
    pub fn words_summary(&self) -> String {
        self.matches
            .iter()
            .map(|m| format!("{}: {}", m.word, m.count))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn count_of(&self, word: &str) -> Option<usize> {
        self.matches.iter().find(|m| m.word == word).map(|m| m.count)
    }
}

/// 扫描统计信息（便于 CLI 打印）
#[derive(Debug, Default, Clone)]
pub struct ScanStats {
    /// 遍历产出的候选文件数
    pub files_discovered: usize,
    /// 成功读取并完成计数的文件数
    pub files_scanned: usize,
    /// 因无权限读取而跳过的文件数
    pub files_skipped: usize,
    /// 复制到命中目录失败的次数（已记录并忽略）
    pub copy_failures: usize,
    pub elapsed: Duration,
}

/// 一次扫描的结果集合与统计
#[derive(Debug, Default, Clone)]
pub struct ScanSummary {
    /// 命中文件，按发现顺序排列
    pub results: Vec<FileMatchResult>,
    pub stats: ScanStats,
    /// 报告文件路径（未写报告时为 None）
    pub report_path: Option<PathBuf>,
}

/// 扫描结束的两种正常结局；取消不视为失败
#[derive(Debug, Clone)]
pub enum ScanOutcome {
    Completed(ScanSummary),
    Canceled(ScanSummary),
}

impl ScanOutcome {
    pub fn summary(&self) -> &ScanSummary {
        match self {
            ScanOutcome::Completed(s) | ScanOutcome::Canceled(s) => s,
        }
    }

    pub fn into_summary(self) -> ScanSummary {
        match self {
            ScanOutcome::Completed(s) | ScanOutcome::Canceled(s) => s,
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, ScanOutcome::Canceled(_))
    }
}
