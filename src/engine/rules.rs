// 行程归并规则
// 一张按优先级排列的决策表：折回、跨天拆分、静止/移动延伸或分支、兜底。
// 每个定位恰好命中一条规则；这里只做纯判定，不做任何 I/O

use chrono::{DateTime, NaiveDate};
use uuid::Uuid;

use crate::config::JourneyPolicy;
use crate::database::models::journey::{Journey, JourneyKind};
use crate::database::models::location::Fix;
use crate::geo::{self, MotionState};

/// 规则判定所需的全部输入
#[derive(Debug)]
pub struct RuleContext<'a> {
    pub fix: &'a Fix,
    /// 墙钟时间，Unix 毫秒，用于 recorded_at
    pub now_millis: i64,
    /// 无上一已知定位时为 None
    pub classification: Option<MotionState>,
    /// 判定本次状态所用的上一已知定位
    pub last_known: Option<&'a Fix>,
    pub last_moving: Option<&'a Journey>,
    pub last_journey: Option<&'a Journey>,
}

/// 决策表的输出：对存储的一次原子变更
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// 陈旧的移动行程折回为静止：补记一条静止行程，本定位不再延伸路径
    FoldStaleMoving { journey: Journey },
    /// 静止行程跨越日界：落一条关账行程，后续定位从新行程继续
    SplitAtDayBoundary { journey: Journey },
    /// 延伸已开静止行程的停留时长
    ExtendSteady { journey: Journey },
    /// 延伸已开移动行程的终点和路径距离
    ExtendMoving { journey: Journey },
    /// 关闭当前行程（如需），在当前定位新开静止行程
    BranchToSteady {
        closing: Option<Journey>,
        opening: Journey,
    },
    /// 关闭静止行程，从其锚点新开移动行程
    BranchToMoving {
        closing: Option<Journey>,
        opening: Journey,
    },
    /// 无任何历史或无法判定状态：直接从原始定位落一条静止行程
    StartFresh { journey: Journey },
}

/// 按优先级评估决策表，返回第一条命中的规则
pub fn decide(policy: &JourneyPolicy, ctx: &RuleContext<'_>) -> Decision {
    if let Some(decision) = fold_stale_moving(policy, ctx) {
        return decision;
    }
    if let Some(decision) = split_at_day_boundary(ctx) {
        return decision;
    }

    let (Some(last_journey), Some(classification)) = (ctx.last_journey, ctx.classification) else {
        return start_fresh(ctx);
    };

    match classification {
        MotionState::Steady => steady_branch(policy, ctx, last_journey),
        MotionState::Moving => moving_branch(ctx, last_journey),
    }
}

/// 规则：陈旧移动折回
///
/// 移动行程的末端离当前定位仍在静止阈值内，且自该行程开始已超过
/// 窗口时长，说明用户其实停在了路径末端：以最近一条行程的锚点补记
/// 停留时长。时长从 last_journey 的 created_at 起算（沿用来源系统的
/// 口径，二者不同时可能偏差，见 DESIGN.md）。
fn fold_stale_moving(policy: &JourneyPolicy, ctx: &RuleContext<'_>) -> Option<Decision> {
    let moving = ctx.last_moving?;
    let last_journey = ctx.last_journey?;

    let (lat, lon) = moving.last_point();
    let distance = geo::haversine_distance(lat, lon, ctx.fix.latitude, ctx.fix.longitude);
    let elapsed = ctx.fix.timestamp_millis - moving.created_at;

    if !(distance < policy.steady_distance_meters && elapsed > policy.recent_window_millis()) {
        return None;
    }

    Some(Decision::FoldStaleMoving {
        journey: new_steady(
            ctx,
            last_journey.from_latitude,
            last_journey.from_longitude,
            Some(ctx.fix.timestamp_millis - last_journey.created_at),
        ),
    })
}

/// 规则：跨天拆分
///
/// 静止行程不允许跨越日界，保证按天查询历史时边界精确。
fn split_at_day_boundary(ctx: &RuleContext<'_>) -> Option<Decision> {
    let last_journey = ctx.last_journey?;
    if !last_journey.is_steady() {
        return None;
    }
    if utc_day(last_journey.created_at) == utc_day(ctx.fix.timestamp_millis) {
        return None;
    }

    Some(Decision::SplitAtDayBoundary {
        journey: new_steady(
            ctx,
            last_journey.from_latitude,
            last_journey.from_longitude,
            Some(ctx.fix.timestamp_millis - last_journey.created_at),
        ),
    })
}

/// 规则：静止状态下的延伸或分支
fn steady_branch(policy: &JourneyPolicy, ctx: &RuleContext<'_>, last_journey: &Journey) -> Decision {
    if last_journey.is_steady() {
        let distance = geo::haversine_distance(
            last_journey.from_latitude,
            last_journey.from_longitude,
            ctx.fix.latitude,
            ctx.fix.longitude,
        );
        if distance < policy.steady_distance_meters {
            let mut journey = last_journey.clone();
            journey.duration_millis = Some(ctx.fix.timestamp_millis - journey.created_at);
            journey.recorded_at = ctx.now_millis;
            return Decision::ExtendSteady { journey };
        }
    }

    // 当前开行程吸收不了这个定位：关闭它并在当前位置重新落锚
    let closing = close_journey(ctx, last_journey);
    Decision::BranchToSteady {
        closing,
        opening: new_steady_at_fix(ctx),
    }
}

/// 规则：移动状态下的延伸或分支
fn moving_branch(ctx: &RuleContext<'_>, last_journey: &Journey) -> Decision {
    if !last_journey.is_steady() {
        // 延伸已开移动行程：终点推进到当前定位，累加增量距离
        let previous = ctx
            .last_known
            .cloned()
            .unwrap_or_else(|| last_journey.last_point_fix());
        let increment = geo::distance_between(&previous, ctx.fix);

        let mut journey = last_journey.clone();
        journey.to_latitude = Some(ctx.fix.latitude);
        journey.to_longitude = Some(ctx.fix.longitude);
        journey.route_distance_meters =
            Some(journey.route_distance_meters.unwrap_or(0.0) + increment);
        journey.duration_millis = Some(ctx.fix.timestamp_millis - journey.created_at);
        journey.recorded_at = ctx.now_millis;
        return Decision::ExtendMoving { journey };
    }

    // 静止转移动：关闭停留段，从其锚点开出一条移动行程
    let closing = close_journey(ctx, last_journey);
    let route = geo::haversine_distance(
        last_journey.from_latitude,
        last_journey.from_longitude,
        ctx.fix.latitude,
        ctx.fix.longitude,
    );
    let opening = Journey {
        id: Uuid::new_v4().to_string(),
        user_id: ctx.fix.user_id.clone(),
        kind: JourneyKind::Moving,
        from_latitude: last_journey.from_latitude,
        from_longitude: last_journey.from_longitude,
        to_latitude: Some(ctx.fix.latitude),
        to_longitude: Some(ctx.fix.longitude),
        created_at: ctx.fix.timestamp_millis,
        recorded_at: ctx.now_millis,
        duration_millis: None,
        route_distance_meters: Some(route),
    };
    Decision::BranchToMoving { closing, opening }
}

fn start_fresh(ctx: &RuleContext<'_>) -> Decision {
    Decision::StartFresh {
        journey: new_steady_at_fix(ctx),
    }
}

/// 关账：静止行程补记最终停留时长后随新行程一并提交；
/// 移动行程的终点和距离在上次延伸时已就位，无需再写
fn close_journey(ctx: &RuleContext<'_>, journey: &Journey) -> Option<Journey> {
    if !journey.is_steady() {
        return None;
    }
    let mut closing = journey.clone();
    closing.duration_millis = Some(ctx.fix.timestamp_millis - closing.created_at);
    closing.recorded_at = ctx.now_millis;
    Some(closing)
}

fn new_steady_at_fix(ctx: &RuleContext<'_>) -> Journey {
    new_steady(ctx, ctx.fix.latitude, ctx.fix.longitude, None)
}

fn new_steady(
    ctx: &RuleContext<'_>,
    latitude: f64,
    longitude: f64,
    duration_millis: Option<i64>,
) -> Journey {
    Journey {
        id: Uuid::new_v4().to_string(),
        user_id: ctx.fix.user_id.clone(),
        kind: JourneyKind::Steady,
        from_latitude: latitude,
        from_longitude: longitude,
        to_latitude: None,
        to_longitude: None,
        created_at: ctx.fix.timestamp_millis,
        recorded_at: ctx.now_millis,
        duration_millis,
        route_distance_meters: None,
    }
}

/// 时间戳所在的 UTC 日历日
fn utc_day(timestamp_millis: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(timestamp_millis).map(|dt| dt.date_naive())
}
