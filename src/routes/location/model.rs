use serde::{Deserialize, Serialize};

/// 定位上报请求，locations 按时间升序
#[derive(Debug, Deserialize)]
pub struct LocationUpdateRequest {
    pub locations: Vec<RawLocation>,
}

/// 外部定位服务回调中的单个原始观测
#[derive(Debug, Deserialize)]
pub struct RawLocation {
    pub latitude: f64,
    pub longitude: f64,
    /// Unix 毫秒时间戳
    pub timestamp: i64,
}

/// 定位上报响应
#[derive(Debug, Serialize)]
pub struct LocationUpdateResponse {
    /// 已提交行程变更的定位数
    pub accepted: usize,
    /// 因非法或重复被丢弃的定位数
    pub dropped: usize,
}
