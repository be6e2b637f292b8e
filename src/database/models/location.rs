use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 一条原始定位观测
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Fix {
    pub user_id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Unix 毫秒时间戳
    pub timestamp_millis: i64,
}

impl Fix {
    /// 坐标是否为合法的经纬度
    pub fn has_valid_coordinates(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}
