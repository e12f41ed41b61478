//! 扫描选项与配置文件（模块）
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::walker::DEFAULT_PATTERN;

/// 默认输出文件名（均相对于输出目录）
pub const DEFAULT_CENSORED_FILE: &str = "censoredCopy.txt";
pub const DEFAULT_REPORT_FILE: &str = "Report.txt";
pub const DEFAULT_FOUND_DIR: &str = "foundFiles";

/// 词表来源：直接输入的文本优先，文本为空时才读取备选文件
#[derive(Debug, Clone, Default)]
pub struct WordSource {
    pub text: String,
    pub file: Option<PathBuf>,
}

impl WordSource {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), file: None }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self { text: String::new(), file: Some(path.into()) }
    }
}

/// 扫描选项
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub words: WordSource,
    /// 待分析的根目录；为空表示未选择
    pub root: Option<PathBuf>,
    /// 文件名匹配模式（默认 *.txt）
    pub pattern: String,
    /// 输出目录；脱敏词表、报告与命中目录都放在其下
    pub out_dir: PathBuf,
    pub censored_file: String,
    pub report_file: String,
    pub found_dir: String,
    /// 最大文件大小（字节）；超过则跳过
    pub max_file_size: Option<u64>,
    /// 线程数：None 表示自动（等于 CPU 核数）；Some(1) 走串行
    pub threads: Option<usize>,
    /// 取消时仍把已收集的部分结果写入报告
    pub report_on_cancel: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            words: WordSource::default(),
            root: None,
            pattern: DEFAULT_PATTERN.to_string(),
            out_dir: PathBuf::from("."),
            censored_file: DEFAULT_CENSORED_FILE.to_string(),
            report_file: DEFAULT_REPORT_FILE.to_string(),
            found_dir: DEFAULT_FOUND_DIR.to_string(),
            max_file_size: None,
            threads: None,
            report_on_cancel: false,
        }
    }
}

impl ScanOptions {
    pub fn censored_path(&self) -> PathBuf {
        self.out_dir.join(&self.censored_file)
    }

    pub fn report_path(&self) -> PathBuf {
        self.out_dir.join(&self.report_file)
    }

    pub fn found_path(&self) -> PathBuf {
        self.out_dir.join(&self.found_dir)
    }

    /// 用配置文件中出现的字段覆盖默认值
    pub fn apply_config(&mut self, cfg: &ScanConfig) {
        if let Some(p) = &cfg.pattern { self.pattern = p.clone(); }
        if let Some(d) = &cfg.out_dir { self.out_dir = d.clone(); }
        if let Some(f) = &cfg.censored_file { self.censored_file = f.clone(); }
        if let Some(f) = &cfg.report_file { self.report_file = f.clone(); }
        if let Some(d) = &cfg.found_dir { self.found_dir = d.clone(); }
        if cfg.max_file_size.is_some() { self.max_file_size = cfg.max_file_size; }
        if let Some(t) = cfg.threads { self.threads = if t == 0 { None } else { Some(t) }; }
        if let Some(r) = cfg.report_on_cancel { self.report_on_cancel = r; }
    }
}

/// 配置文件结构（TOML）；所有字段可选，`threads = 0` 表示自动
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanConfig {
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub out_dir: Option<PathBuf>,
    #[serde(default)]
    pub censored_file: Option<String>,
    #[serde(default)]
    pub report_file: Option<String>,
    #[serde(default)]
    pub found_dir: Option<String>,
    #[serde(default)]
    pub max_file_size: Option<u64>,
    #[serde(default)]
    pub threads: Option<usize>,
    #[serde(default)]
    pub report_on_cancel: Option<bool>,
}

/// 读取并解析 TOML 配置文件
pub fn load_config(path: &Path) -> Result<ScanConfig> {
    let txt = std::fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let cfg: ScanConfig = toml::from_str(&txt).with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_fixed_names() {
        let opts = ScanOptions::default();
        assert_eq!(opts.pattern, "*.txt");
        assert_eq!(opts.report_path(), PathBuf::from("./Report.txt"));
        assert_eq!(opts.censored_path(), PathBuf::from("./censoredCopy.txt"));
        assert_eq!(opts.found_path(), PathBuf::from("./foundFiles"));
        assert_eq!(opts.threads, None);
    }

    #[test]
    fn config_overrides_only_present_fields() {
        let cfg: ScanConfig = toml::from_str(
            r#"
            pattern = "*.log"
            out_dir = "runs/1"
            threads = 0
            "#,
        )
        .unwrap();
        let mut opts = ScanOptions { threads: Some(2), ..ScanOptions::default() };
        opts.apply_config(&cfg);
        assert_eq!(opts.pattern, "*.log");
        assert_eq!(opts.report_path(), PathBuf::from("runs/1/Report.txt"));
        assert_eq!(opts.threads, None);
        assert_eq!(opts.report_file, DEFAULT_REPORT_FILE);
        assert!(!opts.report_on_cancel);
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        assert!(toml::from_str::<ScanConfig>("colour = \"red\"").is_err());
    }

    #[test]
    fn load_config_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wordscan.toml");
        std::fs::write(&path, "max_file_size = 1024\nreport_on_cancel = true\n").unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.max_file_size, Some(1024));
        assert_eq!(cfg.report_on_cancel, Some(true));
    }
}
