use std::net::SocketAddr;

use serde::Serialize;
use tracing::info;
use warp::Filter;

pub const ALIVE_TEXT: &str = "VFS appointment monitor is running";

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

/// `GET /` and `GET /health`, for hosting platforms that stop idle processes.
pub fn routes() -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let index = warp::get().and(warp::path::end()).map(|| ALIVE_TEXT);
    let health = warp::get()
        .and(warp::path("health"))
        .and(warp::path::end())
        .map(|| warp::reply::json(&Health { status: "ok" }));
    index.or(health)
}

pub async fn serve(port: u16) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "keep-alive endpoint listening");
    warp::serve(routes()).run(addr).await;
}
