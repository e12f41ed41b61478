//! 协作式取消信号
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Result, ScanError};

/// 一次扫描共享的取消信号
///
/// - 由外部的"停止"动作置位，各阶段主动轮询，不存在强制中断；
/// - `cancel()` 幂等，重复调用或在扫描结束后调用都是安全的；
/// - 置位后不可复位，新的扫描需要新建一个信号。
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    flag: AtomicBool,
    parent: Option<CancelToken>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// 派生子信号：自身或父信号任一被置位即视为已取消
    pub fn child(&self) -> Self {
        Self {
            inner: Arc::new(Inner { flag: AtomicBool::new(false), parent: Some(self.clone()) }),
        }
    }

    pub fn cancel(&self) {
        self.inner.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.inner.flag.load(Ordering::SeqCst) {
            return true;
        }
        match &self.inner.parent {
            Some(p) => p.is_cancelled(),
            None => false,
        }
    }

    /// 已取消时返回 `ScanError::Canceled`，便于用 `?` 向上传播
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(ScanError::Canceled)
        } else {
            Ok(())
        }
    }
}
