//! 输出：脱敏词表、TSV 报告、命中文件复制、JSON 结果流
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::cancel::CancelToken;
use crate::error::{Result, ScanError};
use crate::types::{FileMatchResult, WordCount};
use crate::words::WordSet;

/// 脱敏占位符（固定 7 个星号，与原词长度无关）
pub const REDACTION_TOKEN: &str = "*******";
/// 报告表头
pub const REPORT_HEADER: &str = "Path\tSize\tWords";

/// 每个词替换为占位符，单空格连接
pub fn censor_words(words: &WordSet) -> String {
    vec![REDACTION_TOKEN; words.len()].join(" ")
}

/// 写出脱敏词表（整体覆盖写）
pub fn write_censored(words: &WordSet, path: &Path, cancel: &CancelToken) -> Result<()> {
    cancel.check()?;
    ensure_parent(path)?;
    fs::write(path, censor_words(words)).map_err(|e| ScanError::io(path, e))
}

/// 写出 TSV 报告到文件
///
/// 不做原子替换：中途取消时已写出的部分保留在磁盘上。
pub fn write_report(results: &[FileMatchResult], path: &Path, cancel: &CancelToken) -> Result<()> {
    cancel.check()?;
    ensure_parent(path)?;
    let file = File::create(path).map_err(|e| ScanError::io(path, e))?;
    let mut out = BufWriter::new(file);
    write_report_to(results, &mut out, cancel).map_err(|e| with_path(e, path))?;
    out.flush().map_err(|e| ScanError::io(path, e))
}

/// 写出 TSV 报告到任意 writer；每行前后各检查一次取消信号，取消向上传播
pub fn write_report_to(results: &[FileMatchResult], out: &mut dyn Write, cancel: &CancelToken) -> Result<()> {
    cancel.check()?;
    writeln!(out, "{REPORT_HEADER}").map_err(report_io)?;
    for r in results {
        cancel.check()?;
        writeln!(out, "{}\t{}\t{}", r.path.display(), r.size_bytes, r.words_summary()).map_err(report_io)?;
        cancel.check()?;
    }
    Ok(())
}

/// 报告中解析出的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub path: String,
    pub size_bytes: u64,
    pub matches: Vec<WordCount>,
}

/// 解析 `write_report_to` 写出的报告
pub fn parse_report(text: &str) -> Result<Vec<ReportRow>> {
    let mut lines = text.lines();
    match lines.next() {
        Some(REPORT_HEADER) => {}
        other => return Err(ScanError::Report(format!("unexpected header: {:?}", other))),
    }

    let mut rows = Vec::new();
    for (idx, line) in lines.enumerate() {
        if line.is_empty() {
            continue;
        }
        let line_no = idx + 2;
        // 路径本身可能含制表符，因此从右侧切分
        let mut cols = line.rsplitn(3, '\t');
        let (words, size, path) = match (cols.next(), cols.next(), cols.next()) {
            (Some(w), Some(s), Some(p)) => (w, s, p),
            _ => return Err(ScanError::Report(format!("line {line_no}: expected 3 columns"))),
        };
        let size_bytes = size
            .parse::<u64>()
            .map_err(|e| ScanError::Report(format!("line {line_no}: bad size {size:?}: {e}")))?;
        let mut matches = Vec::new();
        for pair in words.split(", ").filter(|p| !p.is_empty()) {
            let (word, count) = pair
                .rsplit_once(": ")
                .ok_or_else(|| ScanError::Report(format!("line {line_no}: bad word entry {pair:?}")))?;
            let count = count
                .parse::<usize>()
                .map_err(|e| ScanError::Report(format!("line {line_no}: bad count {count:?}: {e}")))?;
            matches.push(WordCount::new(word, count));
        }
        rows.push(ReportRow { path: path.to_string(), size_bytes, matches });
    }
    Ok(rows)
}

/// 将命中文件复制到目标目录（保留原文件名，存在则覆盖），返回目标路径
pub fn copy_to_dir(file: &Path, dir: &Path) -> Result<PathBuf> {
    let name = file
        .file_name()
        .ok_or_else(|| ScanError::io(file, io::Error::new(io::ErrorKind::InvalidInput, "path has no file name")))?;
    fs::create_dir_all(dir).map_err(|e| ScanError::io(dir, e))?;
    let dest = dir.join(name);
    // 源与目标是同一文件时 fs::copy 会先截断目标，导致源文件被清空
    if same_file(file, &dest) {
        return Err(ScanError::io(
            file,
            io::Error::new(io::ErrorKind::AlreadyExists, "source and destination are the same file"),
        ));
    }
    fs::copy(file, &dest).map_err(|e| ScanError::io(file, e))?;
    Ok(dest)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// 以 JSON 数组流式写出结果（逐条序列化，不在内存中拼接整个数组）
pub fn write_json(results: &[FileMatchResult], out: &mut dyn Write) -> anyhow::Result<()> {
    write!(out, "[")?;
    let mut first = true;
    for r in results {
        if !first { write!(out, ",")?; } else { first = false; }
        let item = serde_json::json!({
            "path": r.path.display().to_string(),
            "size": r.size_bytes,
            "words": r.matches,
        });
        serde_json::to_writer(&mut *out, &item)?;
    }
    write!(out, "]")?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| ScanError::io(parent, e))
        }
        _ => Ok(()),
    }
}

fn report_io(e: io::Error) -> ScanError {
    ScanError::io(PathBuf::new(), e)
}

fn with_path(err: ScanError, path: &Path) -> ScanError {
    match err {
        ScanError::Io { source, .. } => ScanError::io(path, source),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<FileMatchResult> {
        vec![
            FileMatchResult {
                path: PathBuf::from("/data/a.txt"),
                size_bytes: 11,
                matches: vec![WordCount::new("cat", 2), WordCount::new("dog", 1)],
            },
            FileMatchResult {
                path: PathBuf::from("/data/sub/b.txt"),
                size_bytes: 3,
                matches: vec![WordCount::new("dog", 1)],
            },
        ]
    }

    #[test]
    fn censor_emits_one_token_per_word() {
        let words = WordSet::parse("a bb  supercalifragilistic a").unwrap();
        let censored = censor_words(&words);
        assert_eq!(censored, "******* ******* ******* *******");
        assert_eq!(censored.split(' ').count(), words.len());
    }

    #[test]
    fn censored_file_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/censoredCopy.txt");
        let words = WordSet::parse("secret word").unwrap();
        write_censored(&words, &path, &CancelToken::new()).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "******* *******");
    }

    #[test]
    fn report_layout() {
        let mut buf = Vec::new();
        write_report_to(&sample(), &mut buf, &CancelToken::new()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Path\tSize\tWords");
        assert_eq!(lines[1], "/data/a.txt\t11\tcat: 2, dog: 1");
        assert_eq!(lines[2], "/data/sub/b.txt\t3\tdog: 1");
    }

    #[test]
    fn report_parses_back() {
        let results = sample();
        let mut buf = Vec::new();
        write_report_to(&results, &mut buf, &CancelToken::new()).unwrap();
        let rows = parse_report(&String::from_utf8(buf).unwrap()).unwrap();

        assert_eq!(rows.len(), results.len());
        for (row, r) in rows.iter().zip(&results) {
            assert_eq!(row.path, r.path.display().to_string());
            assert_eq!(row.size_bytes, r.size_bytes);
            assert_eq!(row.matches, r.matches);
        }
    }

    #[test]
    fn empty_results_give_header_only() {
        let mut buf = Vec::new();
        write_report_to(&[], &mut buf, &CancelToken::new()).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "Path\tSize\tWords\n");
    }

    #[test]
    fn canceled_report_keeps_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Report.txt");
        let cancel = CancelToken::new();

        cancel.cancel();
        let err = write_report(&sample(), &path, &cancel).unwrap_err();
        assert!(err.is_canceled());
        assert!(!path.exists());

        // 写到一半取消：表头已落盘
        struct CancelAfterHeader<'a> {
            inner: Vec<u8>,
            cancel: &'a CancelToken,
        }
        impl Write for CancelAfterHeader<'_> {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.cancel.cancel();
                self.inner.write(buf)
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        let cancel = CancelToken::new();
        let mut out = CancelAfterHeader { inner: Vec::new(), cancel: &cancel };
        let err = write_report_to(&sample(), &mut out, &cancel).unwrap_err();
        assert!(err.is_canceled());
        assert_eq!(String::from_utf8(out.inner).unwrap(), "Path\tSize\tWords\n");
    }

    #[test]
    fn parse_rejects_bad_header() {
        assert!(matches!(parse_report("nope\n"), Err(ScanError::Report(_))));
    }

    #[test]
    fn copy_overwrites_existing() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.txt");
        fs::write(&src, "new").unwrap();
        let found = dir.path().join("foundFiles");
        fs::create_dir_all(&found).unwrap();
        fs::write(found.join("a.txt"), "old").unwrap();

        let dest = copy_to_dir(&src, &found).unwrap();
        assert_eq!(dest, found.join("a.txt"));
        assert_eq!(fs::read_to_string(dest).unwrap(), "new");
    }

    #[test]
    fn copy_onto_itself_fails_and_keeps_content() {
        let dir = tempfile::tempdir().unwrap();
        let found = dir.path().join("foundFiles");
        fs::create_dir_all(&found).unwrap();
        let file = found.join("a.txt");
        fs::write(&file, "cat dog").unwrap();

        let err = copy_to_dir(&file, &found).unwrap_err();
        assert!(matches!(err, ScanError::Io { .. }));
        assert_eq!(fs::read_to_string(&file).unwrap(), "cat dog");
    }

    #[test]
    fn json_output_is_an_array() {
        let mut buf = Vec::new();
        write_json(&sample(), &mut buf).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(v.as_array().unwrap().len(), 2);
        assert_eq!(v[0]["words"][0]["word"], "cat");
        assert_eq!(v[0]["words"][0]["count"], 2);
        assert_eq!(v[1]["size"], 3);
    }
}
