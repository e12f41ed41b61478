//! 进度计数与扫描事件通道
//!
//! 进度是旁路通知：扫描线程只管发送，不等待送达，也不关心接收端是否还在。
use crossbeam_channel::{Receiver, Sender};

use crate::types::FileMatchResult;

/// 进度上限
pub const PROGRESS_MAX: u32 = 100;
/// 词表规范化完成后的进度量
pub const QUANTUM_WORDS: u32 = 30;
/// 写出脱敏词表后的进度量
pub const QUANTUM_CENSOR: u32 = 10;
/// 每处理一个文件的进度量
pub const QUANTUM_FILE: u32 = 1;
/// 逐文件进度最多占用的份额，文件再多也不会挤掉后续阶段
pub const FILE_STAGE_SHARE: u32 = 20;
/// 文件流结束后的进度量（从文件阶段份额的末端算起）
pub const QUANTUM_STREAM_DONE: u32 = 20;
/// 报告写出后的进度量
pub const QUANTUM_REPORT: u32 = 20;

/// 扫描过程中推送给展示层的事件
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    /// 进度推进（单调递增，封顶于 max）
    Progress { value: u32, max: u32 },
    /// 取消后进度归零
    ProgressReset,
    /// 新增一个命中文件（与结果集中追加的记录一致）
    Matched(FileMatchResult),
}

/// 事件发送端；未订阅时所有事件直接丢弃
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<Sender<ScanEvent>>,
}

impl EventSink {
    /// 创建无界通道，返回发送端与接收端
    pub fn channel() -> (Self, Receiver<ScanEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn from_sender(tx: Sender<ScanEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn discard() -> Self {
        Self::default()
    }

    pub(crate) fn emit(&self, event: ScanEvent) {
        if let Some(tx) = &self.tx {
            // 接收端已关闭也无所谓
            let _ = tx.send(event);
        }
    }
}

/// 有界进度计数器：按固定量推进，饱和于上限
#[derive(Debug)]
pub struct ProgressCounter {
    value: u32,
    max: u32,
    sink: EventSink,
}

impl ProgressCounter {
    pub fn new(max: u32, sink: EventSink) -> Self {
        Self { value: 0, max, sink }
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    /// 推进 `quantum`；已到上限时不再发送事件
    pub fn advance(&mut self, quantum: u32) {
        let next = self.value.saturating_add(quantum).min(self.max);
        if next == self.value {
            return;
        }
        self.value = next;
        self.sink.emit(ScanEvent::Progress { value: self.value, max: self.max });
    }

    /// 推进 `quantum`，但不超过 `ceiling`
    pub fn advance_capped(&mut self, quantum: u32, ceiling: u32) {
        let room = ceiling.min(self.max).saturating_sub(self.value);
        self.advance(quantum.min(room));
    }

    /// 推进到 `target`；不会后退
    pub fn advance_to(&mut self, target: u32) {
        self.advance(target.saturating_sub(self.value));
    }

    pub fn reset(&mut self) {
        self.value = 0;
        self.sink.emit(ScanEvent::ProgressReset);
    }

    pub(crate) fn sink(&self) -> &EventSink {
        &self.sink
    }
}
