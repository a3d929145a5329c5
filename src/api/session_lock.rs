// ==========================================
// 考场编排系统 - 场次锁
// ==========================================
// 职责: 同一场次的编排/监考分配互斥，不同场次可并行
// 日期锁: 监考冲突按时间区间判断，同一考试日的监考写入串行
// 加锁顺序: 先场次锁（非阻塞）后日期锁（阻塞），不会反向等待
// 释放: 守卫 Drop 时自动释放并唤醒等待者
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::session::SessionKey;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::{Condvar, Mutex};
use tracing::debug;

/// 按键互斥的锁表
#[derive(Debug)]
struct KeyedLocks<K> {
    held: Mutex<HashSet<K>>,
    released: Condvar,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            held: Mutex::new(HashSet::new()),
            released: Condvar::new(),
        }
    }
}

impl<K: Copy + Eq + Hash + Display> KeyedLocks<K> {
    fn try_insert(&self, key: K) -> ApiResult<bool> {
        let mut held = self
            .held
            .lock()
            .map_err(|e| ApiError::InternalError(format!("锁获取失败: {}", e)))?;
        Ok(held.insert(key))
    }

    fn wait_insert(&self, key: K) -> ApiResult<()> {
        let mut held = self
            .held
            .lock()
            .map_err(|e| ApiError::InternalError(format!("锁获取失败: {}", e)))?;

        while held.contains(&key) {
            held = self
                .released
                .wait(held)
                .map_err(|e| ApiError::InternalError(format!("锁等待失败: {}", e)))?;
        }
        held.insert(key);
        Ok(())
    }

    fn contains(&self, key: &K) -> bool {
        self.held.lock().map(|h| h.contains(key)).unwrap_or(false)
    }

    fn release(&self, key: &K) {
        // 锁中毒时仍需移除，否则该键永久不可用
        let mut held = match self.held.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        held.remove(key);
        drop(held);
        self.released.notify_all();
        debug!(key = %key, "释放锁");
    }
}

#[derive(Debug, Default)]
pub struct SessionLockRegistry {
    sessions: KeyedLocks<SessionKey>,
    dates: KeyedLocks<NaiveDate>,
}

impl SessionLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 非阻塞获取场次锁
    ///
    /// # 返回
    /// - `Err(SessionBusy)`: 该场次已有操作在进行
    pub fn try_acquire(&self, key: SessionKey) -> ApiResult<SessionGuard<'_>> {
        if !self.sessions.try_insert(key)? {
            return Err(ApiError::SessionBusy(format!("场次 {} 正在编排中", key)));
        }
        debug!(session = %key, "获取场次锁");
        Ok(KeyGuard { locks: &self.sessions, key })
    }

    /// 阻塞获取场次锁，直到前一个持有者释放
    pub fn acquire(&self, key: SessionKey) -> ApiResult<SessionGuard<'_>> {
        self.sessions.wait_insert(key)?;
        debug!(session = %key, "获取场次锁（等待后）");
        Ok(KeyGuard { locks: &self.sessions, key })
    }

    /// 阻塞获取考试日锁（监考安排的读-判-写在此锁内完成）
    pub fn acquire_date(&self, date: NaiveDate) -> ApiResult<DateGuard<'_>> {
        self.dates.wait_insert(date)?;
        debug!(exam_date = %date, "获取考试日锁");
        Ok(KeyGuard { locks: &self.dates, key: date })
    }

    pub fn is_held(&self, key: &SessionKey) -> bool {
        self.sessions.contains(key)
    }

    pub fn is_date_held(&self, date: &NaiveDate) -> bool {
        self.dates.contains(date)
    }
}

/// 锁守卫
#[derive(Debug)]
pub struct KeyGuard<'a, K: Copy + Eq + Hash + Display> {
    locks: &'a KeyedLocks<K>,
    key: K,
}

/// 场次锁守卫
pub type SessionGuard<'a> = KeyGuard<'a, SessionKey>;

/// 考试日锁守卫
pub type DateGuard<'a> = KeyGuard<'a, NaiveDate>;

impl<K: Copy + Eq + Hash + Display> KeyGuard<'_, K> {
    pub fn key(&self) -> K {
        self.key
    }
}

impl<K: Copy + Eq + Hash + Display> Drop for KeyGuard<'_, K> {
    fn drop(&mut self) {
        self.locks.release(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn key(time: &str) -> SessionKey {
        SessionKey::parse("2024-06-10", time).unwrap()
    }

    #[test]
    fn test_try_acquire_busy_then_released() {
        let registry = SessionLockRegistry::new();
        let guard = registry.try_acquire(key("09:00")).unwrap();

        assert!(matches!(registry.try_acquire(key("09:00")), Err(ApiError::SessionBusy(_))));
        // 其他场次不受影响
        let other = registry.try_acquire(key("14:00")).unwrap();
        drop(other);

        drop(guard);
        assert!(!registry.is_held(&key("09:00")));
        assert!(registry.try_acquire(key("09:00")).is_ok());
    }

    #[test]
    fn test_acquire_waits_for_release() {
        let registry = Arc::new(SessionLockRegistry::new());
        let guard = registry.try_acquire(key("09:00")).unwrap();

        let waiter = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let g = registry.acquire(key("09:00")).unwrap();
                g.key()
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!waiter.is_finished());
        drop(guard);

        assert_eq!(waiter.join().unwrap(), key("09:00"));
        assert!(!registry.is_held(&key("09:00")));
    }

    #[test]
    fn test_date_lock_serialises_overlapping_sessions() {
        let registry = Arc::new(SessionLockRegistry::new());
        let date = key("09:00").exam_date;

        // 不同场次各自持有场次锁，但共用考试日锁
        let _morning = registry.try_acquire(key("09:00")).unwrap();
        let day = registry.acquire_date(date).unwrap();
        assert!(registry.is_date_held(&date));

        let waiter = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let _late = registry.try_acquire(key("10:00")).unwrap();
                registry.acquire_date(key("10:00").exam_date).unwrap().key()
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!waiter.is_finished());
        drop(day);

        assert_eq!(waiter.join().unwrap(), date);
        assert!(!registry.is_date_held(&date));
    }
}
