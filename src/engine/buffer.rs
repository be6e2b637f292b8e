use std::collections::VecDeque;
use std::time::Duration;

use crate::database::models::location::Fix;

/// 单个用户的近期定位滑动窗口
///
/// 只保留相对最新定位不超过窗口时长的观测，用于平滑判定噪声。
/// 纯内存结构，无 I/O；冷启动回填和快照持久化由引擎负责。
#[derive(Debug, Clone, Default)]
pub struct RecentFixBuffer {
    fixes: VecDeque<Fix>,
    window_millis: i64,
}

impl RecentFixBuffer {
    pub fn new(window: Duration) -> Self {
        Self {
            fixes: VecDeque::new(),
            window_millis: window.as_millis() as i64,
        }
    }

    /// 用历史定位回填空窗口，过旧的条目在回填时即被丢弃
    pub fn seed(&mut self, fixes: Vec<Fix>) {
        for fix in fixes {
            self.append(fix);
        }
    }

    /// 追加一个定位，并驱逐窗口外的旧条目
    pub fn append(&mut self, fix: Fix) {
        while let Some(oldest) = self.fixes.front() {
            if fix.timestamp_millis - oldest.timestamp_millis > self.window_millis {
                self.fixes.pop_front();
            } else {
                break;
            }
        }
        self.fixes.push_back(fix);
    }

    pub fn latest(&self) -> Option<&Fix> {
        self.fixes.back()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    /// 当前窗口内容，按时间升序
    pub fn snapshot(&self) -> Vec<Fix> {
        self.fixes.iter().cloned().collect()
    }

    /// 从缓存快照恢复窗口
    pub fn from_snapshot(window: Duration, fixes: Vec<Fix>) -> Self {
        let mut buffer = Self::new(window);
        buffer.seed(fixes);
        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix_at(ts: i64) -> Fix {
        Fix {
            user_id: "u1".to_string(),
            latitude: 23.0,
            longitude: 113.0,
            timestamp_millis: ts,
        }
    }

    const WINDOW: Duration = Duration::from_secs(300);

    #[test]
    fn keeps_fixes_inside_window() {
        let mut buffer = RecentFixBuffer::new(WINDOW);
        buffer.append(fix_at(0));
        buffer.append(fix_at(60_000));
        buffer.append(fix_at(120_000));
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.latest().unwrap().timestamp_millis, 120_000);
    }

    #[test]
    fn evicts_entries_older_than_window() {
        let mut buffer = RecentFixBuffer::new(WINDOW);
        buffer.append(fix_at(0));
        buffer.append(fix_at(60_000));
        buffer.append(fix_at(400_000));
        // 0 和 60_000 相对 400_000 都已超出五分钟窗口
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.latest().unwrap().timestamp_millis, 400_000);
    }

    #[test]
    fn never_holds_entries_outside_window_of_latest() {
        let mut buffer = RecentFixBuffer::new(WINDOW);
        for i in 0..100 {
            buffer.append(fix_at(i * 30_000));
        }
        let latest = buffer.latest().unwrap().timestamp_millis;
        for fix in buffer.snapshot() {
            assert!(latest - fix.timestamp_millis <= 300_000);
        }
    }

    #[test]
    fn boundary_fix_exactly_at_window_edge_is_kept() {
        let mut buffer = RecentFixBuffer::new(WINDOW);
        buffer.append(fix_at(0));
        buffer.append(fix_at(300_000));
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn seed_discards_stale_history() {
        let mut buffer = RecentFixBuffer::new(WINDOW);
        buffer.seed(vec![fix_at(0), fix_at(100_000), fix_at(500_000)]);
        assert_eq!(buffer.len(), 1);
    }
}
