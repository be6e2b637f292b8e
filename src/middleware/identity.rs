use axum::{
    body::Body,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::utils::{error_codes, error_to_api_response};

/// 身份提取中间件
///
/// 鉴权在上游网关完成，这里只信任网关写入的 `X-User-Id` 头，
/// 并将用户 ID 放进请求扩展供 handler 使用。
pub async fn identity_middleware(mut request: Request<Body>, next: Next) -> Response {
    let user_id = request
        .headers()
        .get("x-user-id")
        .and_then(|header| header.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    match user_id {
        Some(user_id) => {
            request.extensions_mut().insert(user_id);
            next.run(request).await
        }
        None => error_to_api_response::<()>(error_codes::AUTH_FAILED, "缺少用户身份".into())
            .into_response(),
    }
}
