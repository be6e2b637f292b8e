use serde::{Deserialize, Serialize};

use crate::database::models::journey::Journey;
use crate::database::models::location::Fix;

/// 单个用户的行程状态快照
///
/// 与持久化存储相比不具权威性：任何字段都可以随时从
/// JourneyStore 重建，丢失缓存只会带来一次额外的读放大。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CachedJourneyState {
    pub last_steady_journey: Option<Journey>,
    pub last_moving_journey: Option<Journey>,
    pub last_journey: Option<Journey>,
    /// 近期定位窗口快照，按时间升序
    pub recent_fixes: Vec<Fix>,
    /// 最近一次成功处理的定位，用于去重和时序校验
    pub last_processed: Option<Fix>,
}
