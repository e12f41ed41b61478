//! 扫描主流程与并行调度（ScanCoordinator）
//!
//! 阶段：规范化词表 → 写出脱敏词表 → 流式遍历并逐文件计数 → 写出报告。
//! 每个阶段之间、每个文件前后都检查取消信号；取消时保留已收集的结果，
//! 进度归零，以 `ScanOutcome::Canceled` 返回（不是错误）。
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::error::{Result, ScanError, ValidationError};
use crate::matcher::WordMatcher;
use crate::options::ScanOptions;
use crate::output::{copy_to_dir, write_censored, write_report};
use crate::progress::{
    EventSink, ProgressCounter, ScanEvent, FILE_STAGE_SHARE, PROGRESS_MAX, QUANTUM_CENSOR, QUANTUM_FILE,
    QUANTUM_REPORT, QUANTUM_STREAM_DONE, QUANTUM_WORDS,
};
use crate::types::{FileMatchResult, ScanOutcome, ScanStats, ScanSummary};
use crate::walker::{SafeTreeWalker, ScanTarget};
use crate::words::WordSet;

/// 单个文件的处理结论
#[derive(Debug)]
enum FileOutcome {
    Matched(FileMatchResult),
    NoMatch,
    /// 无权限读取或超过大小上限，跳过
    Skipped,
}

/// 扫描协调器
#[derive(Debug, Clone)]
pub struct Scanner {
    opts: ScanOptions,
}

impl Scanner {
    pub fn new(opts: ScanOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &ScanOptions {
        &self.opts
    }

    /// 输入校验并得到词表与遍历范围；任何输出文件都在此之后才会创建
    pub fn prepare(&self) -> Result<(WordSet, ScanTarget)> {
        let source = &self.opts.words;
        let has_text = !source.text.trim().is_empty();
        if !has_text && source.file.is_none() {
            return Err(ValidationError::NoWordSource.into());
        }
        let root = match &self.opts.root {
            Some(r) if !r.as_os_str().is_empty() => r.clone(),
            _ => return Err(ValidationError::NoTargetDirectory.into()),
        };
        let words = match (&source.file, has_text) {
            (_, true) => WordSet::parse(&source.text)?,
            (Some(file), false) => WordSet::from_file(file)?,
            (None, false) => return Err(ValidationError::NoWordSource.into()),
        };
        Ok((words, ScanTarget::new(root).with_pattern(self.opts.pattern.clone())))
    }

    /// 在当前线程执行一次完整扫描
    pub fn run(&self, cancel: &CancelToken, sink: EventSink) -> Result<ScanOutcome> {
        let (words, target) = self.prepare()?;
        self.execute(&words, &target, cancel, sink)
    }

    /// 在后台线程执行扫描，调用方保持响应并可随时停止
    ///
    /// 输入校验在当前线程同步完成，校验失败时不会启动线程；
    /// 后台线程直接使用校验得到的词表，不再重新读取词表文件。
    pub fn spawn(self, sink: EventSink) -> Result<ScanHandle> {
        let (words, target) = self.prepare()?;
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let handle = thread::spawn(move || self.execute(&words, &target, &token, sink));
        Ok(ScanHandle { cancel, handle })
    }

    fn execute(
        &self,
        words: &WordSet,
        target: &ScanTarget,
        cancel: &CancelToken,
        sink: EventSink,
    ) -> Result<ScanOutcome> {
        let started = Instant::now();
        let matcher = WordMatcher::new(words)?;
        info!(root = ?target.root, pattern = %target.pattern, words = words.len(), "starting scan");

        let mut progress = ProgressCounter::new(PROGRESS_MAX, sink);
        let mut summary = ScanSummary::default();
        let res = self.drive(words, &matcher, target, cancel, &mut progress, &mut summary);
        summary.stats.elapsed = started.elapsed();

        match res {
            Ok(()) => {
                info!(
                    matched = summary.results.len(),
                    files_scanned = summary.stats.files_scanned,
                    files_skipped = summary.stats.files_skipped,
                    "scan finished"
                );
                Ok(ScanOutcome::Completed(summary))
            }
            Err(ScanError::Canceled) => {
                progress.reset();
                info!(matched = summary.results.len(), "scan canceled");
                if self.opts.report_on_cancel {
                    let path = self.opts.report_path();
                    write_report(&summary.results, &path, &CancelToken::new())?;
                    summary.report_path = Some(path);
                }
                Ok(ScanOutcome::Canceled(summary))
            }
            Err(e) => Err(e),
        }
    }

    fn drive(
        &self,
        words: &WordSet,
        matcher: &WordMatcher,
        target: &ScanTarget,
        cancel: &CancelToken,
        progress: &mut ProgressCounter,
        summary: &mut ScanSummary,
    ) -> Result<()> {
        // halt：用户取消或内部中止时都会置位，用于叫停遍历与并行工作线程
        let halt = cancel.child();
        // 输出目录位于扫描根目录之下时，不能把本次扫描自己的产物当作输入
        let walker = SafeTreeWalker::new(target, halt.clone())?.excluding([
            self.opts.censored_path(),
            self.opts.report_path(),
            self.opts.found_path(),
        ]);

        cancel.check()?;
        progress.advance(QUANTUM_WORDS);

        write_censored(words, &self.opts.censored_path(), cancel)?;
        progress.advance(QUANTUM_CENSOR);
        cancel.check()?;

        let threads = self.opts.threads.unwrap_or_else(num_cpus::get).max(1);
        let files_ceiling = progress.value() + FILE_STAGE_SHARE;
        let mut ctx = CommitCtx {
            found_dir: self.opts.found_path(),
            results: &mut summary.results,
            stats: &mut summary.stats,
            progress: &mut *progress,
            progress_ceiling: files_ceiling,
        };
        if threads > 1 {
            scan_files_parallel(walker, matcher, self.opts.max_file_size, threads, cancel, &halt, &mut ctx)?;
        } else {
            scan_files_serial(walker, matcher, self.opts.max_file_size, cancel, &mut ctx)?;
        }
        cancel.check()?;
        progress.advance_to(files_ceiling + QUANTUM_STREAM_DONE);

        let report_path = self.opts.report_path();
        write_report(&summary.results, &report_path, cancel)?;
        summary.report_path = Some(report_path);
        progress.advance(QUANTUM_REPORT);
        Ok(())
    }
}

/// 扫描的便捷入口
pub fn run_scan(opts: ScanOptions, cancel: &CancelToken, sink: EventSink) -> Result<ScanOutcome> {
    Scanner::new(opts).run(cancel, sink)
}

/// 后台扫描句柄
pub struct ScanHandle {
    cancel: CancelToken,
    handle: JoinHandle<Result<ScanOutcome>>,
}

impl ScanHandle {
    /// 请求停止；可重复调用，扫描结束后调用也无副作用
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn join(self) -> Result<ScanOutcome> {
        match self.handle.join() {
            Ok(res) => res,
            Err(_) => Err(ScanError::ThreadPool("scan thread panicked".to_string())),
        }
    }
}

/// 结果提交所需的可变状态（只由协调线程持有）
struct CommitCtx<'a> {
    found_dir: PathBuf,
    results: &'a mut Vec<FileMatchResult>,
    stats: &'a mut ScanStats,
    progress: &'a mut ProgressCounter,
    /// 逐文件进度推进的上限
    progress_ceiling: u32,
}

impl CommitCtx<'_> {
    fn commit(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Matched(found) => {
                self.stats.files_scanned += 1;
                debug!(path = ?found.path, words = %found.words_summary(), "file matched");
                self.results.push(found.clone());
                if let Err(e) = copy_to_dir(&found.path, &self.found_dir) {
                    self.stats.copy_failures += 1;
                    warn!(path = ?found.path, error = %e, "copy to found files failed");
                }
                self.progress.sink().emit(ScanEvent::Matched(found));
            }
            FileOutcome::NoMatch => self.stats.files_scanned += 1,
            FileOutcome::Skipped => self.stats.files_skipped += 1,
        }
        self.progress.advance_capped(QUANTUM_FILE, self.progress_ceiling);
    }
}

/// 读取并统计单个文件
/// - 无权限读取：跳过
/// - 其他读取错误：向上传播，中止剩余扫描
fn examine(path: &Path, matcher: &WordMatcher, max_file_size: Option<u64>) -> Result<FileOutcome> {
    if let Some(max) = max_file_size {
        if let Ok(md) = fs::metadata(path) {
            if md.len() > max {
                debug!(?path, size = md.len(), "file exceeds size limit, skipped");
                return Ok(FileOutcome::Skipped);
            }
        }
    }
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            warn!(?path, error = %e, "file not readable, skipped");
            return Ok(FileOutcome::Skipped);
        }
        Err(e) => return Err(ScanError::io(path, e)),
    };
    // 非 UTF-8 内容按有损方式解码，保证仍可计数
    let content = String::from_utf8_lossy(&bytes);
    let matches = matcher.scan(&content);
    if matches.is_empty() {
        return Ok(FileOutcome::NoMatch);
    }
    Ok(FileOutcome::Matched(FileMatchResult {
        path: path.to_path_buf(),
        size_bytes: bytes.len() as u64,
        matches,
    }))
}

/// 串行路径：逐个拉取路径、读取、计数、提交
fn scan_files_serial<I>(
    walker: I,
    matcher: &WordMatcher,
    max_file_size: Option<u64>,
    cancel: &CancelToken,
    ctx: &mut CommitCtx<'_>,
) -> Result<()>
where
    I: Iterator<Item = Result<PathBuf>>,
{
    for item in walker {
        let path = item?;
        cancel.check()?;
        ctx.stats.files_discovered += 1;
        let outcome = examine(&path, matcher, max_file_size)?;
        cancel.check()?;
        ctx.commit(outcome);
    }
    Ok(())
}

/// 并行调度：
/// - 遍历线程按发现顺序编号，经有界通道惰性投喂
/// - Rayon 线程池并行读取与计数
/// - 当前线程按编号重排后提交，保证结果顺序与串行一致；
///   每次提交前检查取消信号，因此结果集恰为取消前已提交的文件
fn scan_files_parallel<I>(
    walker: I,
    matcher: &WordMatcher,
    max_file_size: Option<u64>,
    threads: usize,
    cancel: &CancelToken,
    halt: &CancelToken,
    ctx: &mut CommitCtx<'_>,
) -> Result<()>
where
    I: Iterator<Item = Result<PathBuf>> + Send,
{
    use crossbeam_channel as channel;
    use rayon::iter::{ParallelBridge, ParallelIterator};

    type Job = (usize /*idx*/, PathBuf);
    type Done = (usize /*idx*/, Result<FileOutcome>);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| ScanError::ThreadPool(e.to_string()))?;
    let (job_tx, job_rx) = channel::bounded::<Job>(job_queue_capacity(threads));
    let (done_tx, done_rx) = channel::unbounded::<Done>();

    thread::scope(|s| {
        let producer = s.spawn(move || -> Result<usize> {
            let mut produced = 0usize;
            for item in walker {
                let path = item?;
                if job_tx.send((produced, path)).is_err() {
                    break;
                }
                produced += 1;
            }
            Ok(produced)
        });

        let worker_halt = halt.clone();
        s.spawn(move || {
            pool.install(|| {
                job_rx.into_iter().par_bridge().for_each(|(idx, path)| {
                    let res = worker_halt.check().and_then(|_| examine(&path, matcher, max_file_size));
                    let _ = done_tx.send((idx, res));
                });
            });
        });

        // Writer：维护 next_idx 与缓存，按序提交
        let committed = (|| -> Result<()> {
            let mut next_idx = 0usize;
            let mut buffer: BTreeMap<usize, Result<FileOutcome>> = BTreeMap::new();
            for (idx, res) in done_rx.iter() {
                buffer.insert(idx, res);
                while let Some(res) = buffer.remove(&next_idx) {
                    cancel.check()?;
                    ctx.stats.files_discovered += 1;
                    let outcome = res?;
                    ctx.commit(outcome);
                    next_idx += 1;
                }
            }
            Ok(())
        })();
        if committed.is_err() {
            halt.cancel();
        }

        let produced = producer
            .join()
            .unwrap_or_else(|_| Err(ScanError::ThreadPool("walker thread panicked".to_string())));
        committed?;
        let produced = produced?;
        debug!(files = produced, "walker finished");
        Ok(())
    })
}

/// 任务通道容量：每个工作线程预取 4 个，总量封顶
fn job_queue_capacity(threads: usize) -> usize {
    threads.saturating_mul(4).min(1024)
}
