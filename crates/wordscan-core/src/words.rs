//! 目标词表（WordSet）
use std::fs;
use std::path::Path;

use crate::error::ValidationError;

/// 规范化后的目标词序列
///
/// 由原始文本按空白切分得到：去掉首尾空白，丢弃空串，保留原有顺序与重复项。
/// 创建后不可变。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordSet {
    words: Vec<String>,
}

impl WordSet {
    /// 从原始文本构建；没有任何词时返回 `NoWords`
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let words: Vec<String> = raw.split_whitespace().map(str::to_string).collect();
        if words.is_empty() {
            return Err(ValidationError::NoWords);
        }
        Ok(Self { words })
    }

    /// 从词表文件读取全部内容后构建
    pub fn from_file(path: &Path) -> Result<Self, ValidationError> {
        let raw = fs::read_to_string(path).map_err(|source| ValidationError::SourceFileUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        if raw.trim().is_empty() {
            return Err(ValidationError::SourceFileEmpty { path: path.to_path_buf() });
        }
        Self::parse(&raw)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.words
    }
}
