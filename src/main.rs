use axum::{
    Router,
    Server,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
};
use diesel::{
    PgConnection,
    r2d2::{self, ConnectionManager as DbConnectionManager},
};
use std::sync::Arc;
use teampulse_backend::{
    AppState, config::Config, db::DbPool, init_tracing, middleware, routes,
    services::jira::client::JiraHttpClient,
};
use tower_http::cors::{Any, CorsLayer};

#[tokio::main]
async fn main() {
    let config = Config::from_env().expect("Invalid configuration");
    init_tracing(&config);

    let manager = DbConnectionManager::<PgConnection>::new(&config.database_url);
    let db: DbPool = r2d2::Pool::builder()
        .max_size(config.database_max_connections)
        .build(manager)
        .expect("Failed to create database connection pool");

    let tracker = Arc::new(JiraHttpClient::new(&config));
    let state = Arc::new(AppState::new(db, config, tracker));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public_routes = Router::new().route("/health", get(routes::health::health));

    let protected_routes = routes::create_router(state.clone()).layer(from_fn_with_state(
        state.clone(),
        middleware::identity::identity,
    ));

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(from_fn(middleware::logger::logger));

    let addr = state
        .config
        .server_address()
        .parse()
        .expect("Invalid server address");
    tracing::info!("Server running at http://{}", addr);
    Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .expect("Server failed");
}
