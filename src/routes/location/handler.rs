use axum::{Extension, Json, extract::State};
use futures_util::future::join_all;

use crate::{
    AppState,
    database::models::location::Fix,
    engine::FixOutcome,
    routes::location::model::{LocationUpdateRequest, LocationUpdateResponse},
    utils::{ApiResponse, error_codes, error_to_api_response, success_to_api_response},
};

// 定位上报API
//
// 按 payload 顺序入队后统一等待回执：入队顺序即同一用户内的
// 处理顺序。任一定位遇到瞬时失败则整批报错，由定位服务按
// 至少一次语义重投，引擎的幂等检查吞掉其中已处理过的部分。
pub async fn update_locations(
    State(state): State<AppState>,
    Extension(user_id): Extension<String>,
    Json(request): Json<LocationUpdateRequest>,
) -> Json<ApiResponse<LocationUpdateResponse>> {
    if request.locations.is_empty() {
        return error_to_api_response(error_codes::VALIDATION_ERROR, "locations 不能为空".into());
    }

    let mut receipts = Vec::with_capacity(request.locations.len());
    for location in request.locations {
        let fix = Fix {
            user_id: user_id.clone(),
            latitude: location.latitude,
            longitude: location.longitude,
            timestamp_millis: location.timestamp,
        };
        match state.dispatcher.enqueue(fix).await {
            Ok(receipt) => receipts.push(receipt),
            Err(err) => {
                tracing::error!(user_id = %user_id, error = %err, "定位入队失败");
                return error_to_api_response(error_codes::INTERNAL_ERROR, "保存定位失败".into());
            }
        }
    }

    let mut accepted = 0;
    let mut dropped = 0;
    for receipt in join_all(receipts).await {
        match receipt {
            Ok(Ok(FixOutcome::Applied)) => accepted += 1,
            Ok(Ok(FixOutcome::DroppedInvalid | FixOutcome::DroppedDuplicate)) => dropped += 1,
            Ok(Err(err)) => {
                tracing::error!(user_id = %user_id, error = %err, "处理定位失败");
                return error_to_api_response(error_codes::INTERNAL_ERROR, "保存定位失败".into());
            }
            Err(_) => {
                tracing::error!(user_id = %user_id, "定位 worker 未返回回执");
                return error_to_api_response(error_codes::INTERNAL_ERROR, "保存定位失败".into());
            }
        }
    }

    success_to_api_response(LocationUpdateResponse { accepted, dropped })
}
