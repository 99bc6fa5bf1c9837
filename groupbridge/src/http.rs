use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::{api::router::ApiRoutes, app_state::SharedAppState};

pub async fn setup_http_server(
    app_state: SharedAppState,
    bind_address: &str,
) -> anyhow::Result<tokio::task::JoinHandle<anyhow::Result<()>>> {
    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static("*"))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE]);

    let app = ApiRoutes::create(app_state.clone()).layer(cors);

    #[cfg(any(feature = "telemetry-grpc", feature = "telemetry-http"))]
    let app = app
        .layer(axum_tracing_opentelemetry::middleware::OtelInResponseLayer)
        .layer(axum_tracing_opentelemetry::middleware::OtelAxumLayer::default());

    #[cfg(not(any(feature = "telemetry-grpc", feature = "telemetry-http")))]
    let app = app.layer(tower_http::trace::TraceLayer::new_for_http());

    println!("API-Server starting at {}", &bind_address);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    let stop_flag = app_state.stop_flag.clone();
    let handle = tokio::spawn(async move {
        info!("Starting HTTP server");
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                stop_flag.wait().await;
                info!("Stop flag was set, shutting down HTTP server gracefully");
            })
            .await?;
        info!("HTTP server is down");
        Ok::<(), anyhow::Error>(())
    });

    Ok(handle)
}
