// 地理计算模块
// 包含球面距离计算和运动状态判定，纯函数，无 I/O

use serde::{Deserialize, Serialize};

use crate::config::JourneyPolicy;
use crate::database::models::location::Fix;

/// 地球平均半径（米）
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// 用户运动状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionState {
    Steady,
    Moving,
}

impl MotionState {
    /// 持久化用的整数编码
    pub fn value(self) -> i32 {
        match self {
            MotionState::Steady => 0,
            MotionState::Moving => 1,
        }
    }
}

/// 计算两点间的大圆距离（haversine，单位米）
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// 两个定位点之间的距离（米）
pub fn distance_between(a: &Fix, b: &Fix) -> f64 {
    haversine_distance(a.latitude, a.longitude, b.latitude, b.longitude)
}

/// 根据上一已知定位点判定当前运动状态
pub fn classify(policy: &JourneyPolicy, last_known: &Fix, current: &Fix) -> MotionState {
    if distance_between(last_known, current) < policy.steady_distance_meters {
        MotionState::Steady
    } else {
        MotionState::Moving
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn policy() -> JourneyPolicy {
        JourneyPolicy {
            steady_distance_meters: 100.0,
            recent_window: Duration::from_secs(300),
        }
    }

    fn fix(lat: f64, lon: f64) -> Fix {
        Fix {
            user_id: "u1".to_string(),
            latitude: lat,
            longitude: lon,
            timestamp_millis: 0,
        }
    }

    #[test]
    fn zero_distance_for_same_point() {
        assert_eq!(haversine_distance(23.1291, 113.2644, 23.1291, 113.2644), 0.0);
    }

    #[test]
    fn known_city_pair_distance() {
        // 广州 -> 深圳 约 105 公里
        let d = haversine_distance(23.1291, 113.2644, 22.5431, 114.0579);
        assert!((d - 105_000.0).abs() < 5_000.0, "distance was {d}");
    }

    #[test]
    fn one_degree_latitude_is_about_111_km() {
        let d = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_195.0).abs() < 100.0, "distance was {d}");
    }

    #[test]
    fn classify_within_threshold_is_steady() {
        // 约 55 米的纬度偏移
        let state = classify(&policy(), &fix(23.0, 113.0), &fix(23.0005, 113.0));
        assert_eq!(state, MotionState::Steady);
    }

    #[test]
    fn classify_beyond_threshold_is_moving() {
        // 约 555 米的纬度偏移
        let state = classify(&policy(), &fix(23.0, 113.0), &fix(23.005, 113.0));
        assert_eq!(state, MotionState::Moving);
    }

    #[test]
    fn classify_respects_configured_threshold() {
        let mut p = policy();
        p.steady_distance_meters = 1_000.0;
        let state = classify(&p, &fix(23.0, 113.0), &fix(23.005, 113.0));
        assert_eq!(state, MotionState::Steady);
    }
}
