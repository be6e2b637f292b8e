use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::models::location::Fix;

/// 行程类型：静止停留或移动路径
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i32)]
pub enum JourneyKind {
    Steady = 0,
    Moving = 1,
}

/// 行程实体：一段静止停留（点）或一段移动路径（起点到终点）
///
/// 同一用户的行程按 created_at 全序排列，任一时刻最多有一条
/// 处于"延伸中"的行程（即该用户 created_at 最大的那条）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Journey {
    pub id: String,
    pub user_id: String,
    pub kind: JourneyKind,
    pub from_latitude: f64,
    pub from_longitude: f64,
    /// 仅移动行程有终点坐标，静止行程表示一个点
    pub to_latitude: Option<f64>,
    pub to_longitude: Option<f64>,
    /// 行程开始时间，Unix 毫秒
    pub created_at: i64,
    /// 最近一次延伸时间，Unix 毫秒
    pub recorded_at: i64,
    /// 静止行程关闭或延伸时填充，毫秒
    pub duration_millis: Option<i64>,
    /// 移动行程累计的路径距离，米
    pub route_distance_meters: Option<f64>,
}

impl Journey {
    pub fn is_steady(&self) -> bool {
        self.kind == JourneyKind::Steady
    }

    /// 行程最后记录到的位置：移动行程取终点，静止行程取锚点
    pub fn last_point(&self) -> (f64, f64) {
        match (self.to_latitude, self.to_longitude) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => (self.from_latitude, self.from_longitude),
        }
    }

    /// 终点坐标缺失的移动行程无法继续延伸，视为状态损坏
    pub fn is_consistent(&self) -> bool {
        self.kind == JourneyKind::Steady
            || (self.to_latitude.is_some() && self.to_longitude.is_some())
    }

    /// 以行程最后位置构造一个定位点，用于增量距离计算
    pub fn last_point_fix(&self) -> Fix {
        let (latitude, longitude) = self.last_point();
        Fix {
            user_id: self.user_id.clone(),
            latitude,
            longitude,
            timestamp_millis: self.recorded_at,
        }
    }
}
