use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use tracing::{debug, error, info, warn};
use wordscan_core::{
    load_config, write_json, EventSink, ScanError, ScanEvent, ScanOptions, ScanOutcome, ScanSummary, Scanner,
    WordSource,
};

/// 命令行入口（基于 clap）
#[derive(Parser, Debug)]
#[command(name = "wordscan", version, about = "Count and censor words across a directory of text files")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 扫描目录，统计词频并生成报告（运行中按 Enter 停止）
    Scan {
        /// 待分析目录
        #[arg(long)]
        root: Option<PathBuf>,

        /// 目标词（空格分隔）
        #[arg(long, default_value = "")]
        words: String,

        /// 词表文件；--words 为空时读取
        #[arg(long)]
        words_file: Option<PathBuf>,

        /// 文件名匹配模式
        #[arg(long)]
        pattern: Option<String>,

        /// 输出目录（脱敏词表、报告、命中文件目录）
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// 线程数（"auto"=CPU 核心数；1 为串行）；未给出时取配置文件，否则为 auto
        #[arg(long, value_name = "N|auto")]
        threads: Option<String>,

        /// 最大扫描文件大小（单位字节）
        #[arg(long)]
        max_file_size: Option<u64>,

        /// 配置文件路径（TOML）
        #[arg(long)]
        config: Option<PathBuf>,

        /// 取消时仍写出部分报告
        #[arg(long)]
        report_on_cancel: bool,

        /// 结果输出格式（stdout）
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

const EXIT_CANCELED: u8 = 130;
const EXIT_INVALID: u8 = 2;

fn main() -> ExitCode {
    // 初始化日志（支持通过 RUST_LOG 控制等级，例如 info、debug）
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            let invalid = err
                .downcast_ref::<ScanError>()
                .map_or(false, |e| matches!(e, ScanError::Validation(_)));
            error!("{err:#}");
            if invalid { ExitCode::from(EXIT_INVALID) } else { ExitCode::FAILURE }
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Scan {
            root,
            words,
            words_file,
            pattern,
            out_dir,
            threads,
            max_file_size,
            config,
            report_on_cancel,
            format,
        } => {
            // 配置文件提供默认值，命令行参数覆盖
            let mut opts = ScanOptions::default();
            if let Some(path) = &config {
                let cfg = load_config(path).context("load config")?;
                opts.apply_config(&cfg);
            }
            opts.words = WordSource { text: words, file: words_file };
            opts.root = root;
            if let Some(p) = pattern { opts.pattern = p; }
            if let Some(d) = out_dir { opts.out_dir = d; }
            if let Some(t) = threads { opts.threads = parse_threads(&t); }
            if max_file_size.is_some() { opts.max_file_size = max_file_size; }
            opts.report_on_cancel |= report_on_cancel;

            info!(root = ?opts.root, out_dir = ?opts.out_dir, "starting scan");
            // spawn 在启动后台扫描前同步完成校验，错误立即反馈
            let (sink, events) = EventSink::channel();
            let handle = Scanner::new(opts).spawn(sink)?;

            // 交互式终端下按 Enter 请求停止；非终端输入不触发停止
            if io::stdin().is_terminal() {
                let cancel = handle.cancel_token();
                thread::spawn(move || {
                    let mut line = String::new();
                    if io::stdin().lock().read_line(&mut line).map_or(false, |n| n > 0) {
                        cancel.cancel();
                    }
                });
            }

            for event in events.iter() {
                match event {
                    ScanEvent::Progress { value, max } => debug!(value, max, "progress"),
                    ScanEvent::ProgressReset => debug!("progress reset"),
                    ScanEvent::Matched(r) => info!(path = ?r.path, words = %r.words_summary(), "match"),
                }
            }

            let outcome = handle.join().context("scan failed")?;
            print_summary(outcome.summary(), format)?;
            Ok(match outcome {
                ScanOutcome::Completed(s) => {
                    info!(
                        matched = s.results.len(),
                        files_scanned = s.stats.files_scanned,
                        elapsed_ms = s.stats.elapsed.as_millis() as u64,
                        report = ?s.report_path,
                        "scan finished"
                    );
                    ExitCode::SUCCESS
                }
                ScanOutcome::Canceled(s) => {
                    warn!(matched = s.results.len(), "operation was canceled");
                    ExitCode::from(EXIT_CANCELED)
                }
            })
        }
    }
}

fn print_summary(summary: &ScanSummary, format: Format) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        Format::Json => {
            write_json(&summary.results, &mut out).context("write json")?;
            writeln!(out)?;
        }
        Format::Text => {
            for r in &summary.results {
                writeln!(out, "{}\t{}\t{}", r.path.display(), r.size_bytes, r.words_summary())?;
            }
        }
    }
    out.flush().ok();
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    // 支持通过环境变量 RUST_LOG 控制日志等级，如：RUST_LOG=debug；日志写 stderr，stdout 留给结果
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// 解析线程参数："auto" 返回 None
fn parse_threads(s: &str) -> Option<usize> {
    if s.eq_ignore_ascii_case("auto") { return None; }
    match s.parse::<usize>() {
        Ok(n) if n >= 1 => Some(n),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threads_argument() {
        assert_eq!(parse_threads("auto"), None);
        assert_eq!(parse_threads("AUTO"), None);
        assert_eq!(parse_threads("1"), Some(1));
        assert_eq!(parse_threads("8"), Some(8));
        assert_eq!(parse_threads("0"), None);
        assert_eq!(parse_threads("many"), None);
    }

    #[test]
    fn cli_parses_scan_flags() {
        let cli = Cli::try_parse_from([
            "wordscan", "scan", "--root", "data", "--words", "cat dog", "--threads", "2", "--format", "json",
        ])
        .unwrap();
        let Commands::Scan { root, words, threads, format, .. } = cli.command;
        assert_eq!(root, Some(PathBuf::from("data")));
        assert_eq!(words, "cat dog");
        assert_eq!(threads.as_deref(), Some("2"));
        assert_eq!(format, Format::Json);
    }
}
