// 引擎协作方接口
// 行程存储、定位历史和状态缓存的抽象，引擎通过 Arc<dyn _> 持有；
// Postgres / Redis 适配器实现于 database、cache 模块，测试用内存实现

use async_trait::async_trait;

use crate::cache::models::location::CachedJourneyState;
use crate::database::models::journey::Journey;
use crate::database::models::location::Fix;
use crate::error::EngineError;
use crate::geo::MotionState;

/// 行程持久化存储，按用户维度查询"最近一条"
///
/// 这是行程状态的唯一权威来源，缓存丢失后从这里重建。
#[async_trait]
pub trait JourneyStore: Send + Sync {
    /// 最近一条静止行程，没有则返回 None
    async fn last_steady_journey(&self, user_id: &str) -> Result<Option<Journey>, EngineError>;

    /// 最近一条移动行程，没有则返回 None
    async fn last_moving_journey(&self, user_id: &str) -> Result<Option<Journey>, EngineError>;

    /// 最近一条行程（不区分类型），没有则返回 None
    async fn last_journey(&self, user_id: &str) -> Result<Option<Journey>, EngineError>;

    /// 写入一条新行程
    async fn save_journey(&self, journey: &Journey) -> Result<(), EngineError>;

    /// 更新（延伸）一条已有行程
    async fn update_journey(&self, journey: &Journey) -> Result<(), EngineError>;

    /// 关闭一条行程并开启下一条，两个写入必须原子提交
    async fn transition(&self, closing: &Journey, opening: &Journey) -> Result<(), EngineError>;
}

/// 外部定位历史服务
#[async_trait]
pub trait LocationHistory: Send + Sync {
    /// 用户近五分钟的定位，按时间升序，用于冷启动回填窗口
    async fn last_five_minute_fixes(&self, user_id: &str) -> Result<Vec<Fix>, EngineError>;

    /// 用户最近一次上报的定位
    async fn current_location(&self, user_id: &str) -> Result<Option<Fix>, EngineError>;

    /// 上报当前定位及运动状态
    async fn save_current_location(&self, fix: &Fix, state: MotionState)
    -> Result<(), EngineError>;
}

/// 用户行程状态缓存
///
/// 只为摊薄高频定位下对 JourneyStore 的重复读，不承载正确性；
/// 仅由持有该用户队列的唯一 worker 写入。
#[async_trait]
pub trait StateCache: Send + Sync {
    /// 读取用户状态快照，未命中返回 None
    async fn state(&self, user_id: &str) -> Result<Option<CachedJourneyState>, EngineError>;

    /// 写回用户状态快照
    async fn put_state(&self, user_id: &str, state: &CachedJourneyState)
    -> Result<(), EngineError>;

    /// 作废用户状态快照，下次读取时从存储重建
    async fn invalidate(&self, user_id: &str) -> Result<(), EngineError>;
}
