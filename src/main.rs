use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use journey_backend::{
    AppState,
    cache::LocationCacheOperations,
    config::Config,
    database::{JourneyOperation, LocationOperation},
    engine::{JourneyEngine, worker::JourneyDispatcher},
    middleware::identity_middleware,
    routes,
    utils::success_to_api_response,
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    // 设置数据库连接池
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'journey_backend';")
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");
    let pool = Arc::new(pool);

    // 设置 Redis 客户端
    let redis_client =
        redis::Client::open(config.redis_url.clone()).expect("Failed to create Redis client");
    let redis = Arc::new(redis_client);

    // 组装行程引擎：Postgres 行程存储 + 定位历史 + Redis 状态缓存
    let store = Arc::new(JourneyOperation::new(pool.clone()));
    let history = Arc::new(LocationOperation::new(
        pool.clone(),
        config.recent_fix_window(),
    ));
    let state_cache = Arc::new(LocationCacheOperations::new(
        redis.clone(),
        config.cache_ttl(),
    ));
    let engine = Arc::new(JourneyEngine::new(
        config.journey_policy(),
        store,
        history,
        state_cache,
    ));
    let dispatcher = Arc::new(JourneyDispatcher::new(engine));

    // 设置应用状态
    let state = AppState {
        config: config.clone(),
        dispatcher,
    };

    // 身份中间件只覆盖定位上报路由，健康检查保持公开
    let protected_routes = Router::new()
        .route("/locations/update", post(routes::location::update_locations))
        .layer(axum::middleware::from_fn(identity_middleware));

    let router = Router::new()
        .route("/health", get(health))
        .merge(protected_routes);

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(CorsLayer::permissive())
    };

    // 添加应用状态
    let app = router.with_state(state.clone());

    // 启动服务器
    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app,
    )
    .await
    .expect("Failed to start server");
}

async fn health() -> axum::Json<journey_backend::utils::ApiResponse<&'static str>> {
    success_to_api_response("ok")
}
