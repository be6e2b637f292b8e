// 行程引擎模块
// 将连续的原始定位流归并为静止/移动行程历史

pub mod buffer;
#[cfg(test)]
pub mod memory;
pub mod rules;
pub mod traits;
pub mod worker;

use std::sync::Arc;

use chrono::Utc;

use crate::cache::models::location::CachedJourneyState;
use crate::config::JourneyPolicy;
use crate::database::models::location::Fix;
use crate::error::EngineError;
use crate::geo::{self, MotionState};

use buffer::RecentFixBuffer;
use rules::{Decision, RuleContext};
use traits::{JourneyStore, LocationHistory, StateCache};

/// 单个定位的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixOutcome {
    /// 已命中一条规则并提交
    Applied,
    /// 坐标非法或时间戳回退，丢弃且不重投
    DroppedInvalid,
    /// 与上一条已处理定位完全相同，幂等跳过
    DroppedDuplicate,
}

/// 行程引擎：每个进入的定位经过校验、状态判定和决策表，
/// 恰好产生一次原子的存储变更
///
/// 引擎本身无共享可变状态，同一用户的调用必须串行
/// （由 worker 模块的单用户队列保证），不同用户可以并行。
pub struct JourneyEngine {
    policy: JourneyPolicy,
    store: Arc<dyn JourneyStore>,
    history: Arc<dyn LocationHistory>,
    cache: Arc<dyn StateCache>,
}

impl JourneyEngine {
    pub fn new(
        policy: JourneyPolicy,
        store: Arc<dyn JourneyStore>,
        history: Arc<dyn LocationHistory>,
        cache: Arc<dyn StateCache>,
    ) -> Self {
        Self {
            policy,
            store,
            history,
            cache,
        }
    }

    /// 处理一个定位
    ///
    /// 返回 Err 仅限瞬时 I/O 失败，此时未发生任何行程写入，
    /// 上游可以安全重投；内容性问题一律丢弃并返回 Dropped。
    pub async fn process_fix(&self, fix: Fix) -> Result<FixOutcome, EngineError> {
        if !fix.has_valid_coordinates() {
            tracing::warn!(
                user_id = %fix.user_id,
                latitude = fix.latitude,
                longitude = fix.longitude,
                "丢弃坐标非法的定位"
            );
            return Ok(FixOutcome::DroppedInvalid);
        }

        let mut state = self.load_state(&fix.user_id).await?;

        if let Some(last) = &state.last_processed {
            if *last == fix {
                tracing::debug!(user_id = %fix.user_id, "重复投递的定位，幂等跳过");
                return Ok(FixOutcome::DroppedDuplicate);
            }
            if fix.timestamp_millis < last.timestamp_millis {
                // 重投批次里早于去重基准的定位也走到这里，
                // 窗口里有完全相同的记录就按重复处理而非时序异常
                if state.recent_fixes.contains(&fix) {
                    tracing::debug!(user_id = %fix.user_id, "重投批次中已处理过的定位，幂等跳过");
                    return Ok(FixOutcome::DroppedDuplicate);
                }
                tracing::warn!(
                    user_id = %fix.user_id,
                    fix_at = fix.timestamp_millis,
                    last_at = last.timestamp_millis,
                    "丢弃时间戳回退的定位"
                );
                return Ok(FixOutcome::DroppedInvalid);
            }
        }

        let mut recent =
            RecentFixBuffer::from_snapshot(self.policy.recent_window, state.recent_fixes.clone());
        if recent.is_empty() {
            recent.seed(self.history.last_five_minute_fixes(&fix.user_id).await?);
        }

        let last_known = match recent.latest() {
            Some(latest) => Some(latest.clone()),
            None => self.history.current_location(&fix.user_id).await?,
        };
        // 缓存丢失后没有去重基准：最后已知位置就是这条定位本身，
        // 说明它已经处理提交过一次，是重投
        if last_known.as_ref() == Some(&fix) {
            tracing::debug!(user_id = %fix.user_id, "重投的定位已有当前位置记录，幂等跳过");
            return Ok(FixOutcome::DroppedDuplicate);
        }
        let classification = last_known
            .as_ref()
            .filter(|l| l.timestamp_millis < fix.timestamp_millis)
            .map(|l| geo::classify(&self.policy, l, &fix));

        recent.append(fix.clone());
        self.history
            .save_current_location(&fix, classification.unwrap_or(MotionState::Steady))
            .await?;

        // 终点缺失的移动行程无法延伸：当作已关闭，从头开始
        if let Some(journey) = &state.last_journey {
            if !journey.is_consistent() {
                tracing::error!(
                    user_id = %fix.user_id,
                    journey_id = %journey.id,
                    journey = ?journey,
                    "最近行程缺少终点坐标，作废缓存并重新落锚"
                );
                if let Err(e) = self.cache.invalidate(&fix.user_id).await {
                    tracing::warn!(user_id = %fix.user_id, error = %e, "作废行程状态缓存失败");
                }
                state.last_journey = None;
                state.last_moving_journey = None;
            }
        }

        let ctx = RuleContext {
            fix: &fix,
            now_millis: Utc::now().timestamp_millis(),
            classification,
            last_known: last_known.as_ref(),
            last_moving: state.last_moving_journey.as_ref(),
            last_journey: state.last_journey.as_ref(),
        };
        let decision = rules::decide(&self.policy, &ctx);

        let mut state = self.apply(&state, decision).await?;
        state.recent_fixes = recent.snapshot();
        state.last_processed = Some(fix.clone());
        if let Err(e) = self.cache.put_state(&fix.user_id, &state).await {
            // 缓存不承载正确性，写失败只损失一次读放大
            tracing::warn!(user_id = %fix.user_id, error = %e, "写回行程状态缓存失败");
        }

        Ok(FixOutcome::Applied)
    }

    /// 读取用户状态：缓存命中直接用，未命中从存储懒加载重建
    async fn load_state(&self, user_id: &str) -> Result<CachedJourneyState, EngineError> {
        match self.cache.state(user_id).await {
            Ok(Some(state)) => return Ok(state),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "读取行程状态缓存失败，回退到存储");
            }
        }

        Ok(CachedJourneyState {
            last_steady_journey: self.store.last_steady_journey(user_id).await?,
            last_moving_journey: self.store.last_moving_journey(user_id).await?,
            last_journey: self.store.last_journey(user_id).await?,
            recent_fixes: Vec::new(),
            last_processed: None,
        })
    }

    /// 提交决策对应的存储变更，返回提交后的状态快照
    ///
    /// 缓存只在存储写入成功后更新，中途崩溃由下次读取时的
    /// 懒加载重建自愈。
    async fn apply(
        &self,
        state: &CachedJourneyState,
        decision: Decision,
    ) -> Result<CachedJourneyState, EngineError> {
        let mut next = state.clone();
        match decision {
            Decision::FoldStaleMoving { journey } | Decision::SplitAtDayBoundary { journey } => {
                self.store.save_journey(&journey).await?;
                next.last_steady_journey = Some(journey.clone());
                next.last_journey = Some(journey);
            }
            Decision::ExtendSteady { journey } => {
                self.store.update_journey(&journey).await?;
                next.last_steady_journey = Some(journey.clone());
                next.last_journey = Some(journey);
            }
            Decision::ExtendMoving { journey } => {
                self.store.update_journey(&journey).await?;
                next.last_moving_journey = Some(journey.clone());
                next.last_journey = Some(journey);
            }
            Decision::BranchToSteady { closing, opening } => {
                match &closing {
                    Some(closing) => self.store.transition(closing, &opening).await?,
                    None => self.store.save_journey(&opening).await?,
                }
                next.last_steady_journey = Some(opening.clone());
                next.last_journey = Some(opening);
            }
            Decision::BranchToMoving { closing, opening } => {
                match &closing {
                    Some(closing) => {
                        self.store.transition(closing, &opening).await?;
                        next.last_steady_journey = Some(closing.clone());
                    }
                    None => self.store.save_journey(&opening).await?,
                }
                next.last_moving_journey = Some(opening.clone());
                next.last_journey = Some(opening);
            }
            Decision::StartFresh { journey } => {
                self.store.save_journey(&journey).await?;
                next.last_steady_journey = Some(journey.clone());
                next.last_journey = Some(journey);
            }
        }
        Ok(next)
    }
}
