//! 单文件词频统计（FileScanner）
//!
//! 规则：大小写不敏感的子串匹配，且命中不重叠。在位置 p 命中长度为 L
//! 的词后，下一次从 p + L 继续查找（而不是 p + 1），因此 "aaaa" 中 "aa"
//! 计为 2 次。
use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};

use crate::error::{Result, ScanError};
use crate::types::WordCount;
use crate::words::WordSet;

/// 预编译的词匹配器（每次扫描编译一次，可跨线程共享）
///
/// 每个不同的词单独构建一个自动机：多词共用一个自动机时，
/// 不同词之间的命中会相互占位，无法得到各自独立的计数。
pub struct WordMatcher {
    entries: Vec<Entry>,
}

struct Entry {
    word: String,
    searcher: AhoCorasick,
}

impl WordMatcher {
    pub fn new(words: &WordSet) -> Result<Self> {
        let mut entries: Vec<Entry> = Vec::with_capacity(words.len());
        for word in words.iter() {
            // 重复词只统计一次，结果中也只出现一次
            if entries.iter().any(|e| e.word == word) {
                continue;
            }
            let searcher = build_searcher(word)?;
            entries.push(Entry { word: word.to_string(), searcher });
        }
        Ok(Self { entries })
    }

    /// 统计内容中各词的出现次数（纯函数，不做 I/O）
    /// - 次数为 0 的词不出现在结果中
    /// - 结果顺序与词表顺序一致
    pub fn scan(&self, content: &str) -> Vec<WordCount> {
        if content.is_empty() {
            return Vec::new();
        }
        let folded = fold(content);
        self.entries
            .iter()
            .filter_map(|e| {
                let count = e.searcher.find_iter(&folded).count();
                (count > 0).then(|| WordCount::new(e.word.clone(), count))
            })
            .collect()
    }
}

/// 单词计数（便捷入口，内部同样使用不重叠规则）
pub fn count_occurrences(text: &str, word: &str) -> usize {
    if text.is_empty() || word.is_empty() {
        return 0;
    }
    match build_searcher(word) {
        Ok(searcher) => searcher.find_iter(&fold(text)).count(),
        Err(_) => 0,
    }
}

fn build_searcher(word: &str) -> Result<AhoCorasick> {
    // 两侧都做逐字符折叠；Standard 语义下 find_iter 本身即为不重叠迭代
    AhoCorasickBuilder::new()
        .match_kind(MatchKind::Standard)
        .build([fold(word)])
        .map_err(|e| ScanError::Matcher(format!("{word}: {e}")))
}

/// 逐字符小写折叠，不依赖上下文（`str::to_lowercase` 会把词尾的 Σ 变成 ς）
fn fold(s: &str) -> String {
    s.chars().flat_map(char::to_lowercase).collect()
}
