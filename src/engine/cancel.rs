// ==========================================
// 考场编排系统 - 协作式取消标志
// ==========================================
// 编排在两个考生之间检查，取消后剩余考生记为未安排
// ==========================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 取消令牌（可克隆，共享同一标志）
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_flag() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }
}
