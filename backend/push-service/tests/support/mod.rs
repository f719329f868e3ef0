use std::net::{SocketAddr, TcpListener};
use std::time::Duration;

use actix_web::{dev::ServerHandle, web, App, HttpServer};
use awc::{error::WsProtocolError, ws};
use futures_util::StreamExt;
use push_service::{configure_routes, AppState};

pub async fn start_push_server(state: AppState) -> std::io::Result<(SocketAddr, ServerHandle)> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(configure_routes)
    })
    .workers(1)
    .shutdown_timeout(1)
    .listen(listener)?
    .run();

    let handle = server.handle();
    actix_rt::spawn(server);
    Ok((addr, handle))
}

/// Next text frame from the server, skipping heartbeat frames
pub async fn next_text<S>(connection: &mut S) -> Option<String>
where
    S: futures_util::Stream<Item = Result<ws::Frame, WsProtocolError>> + Unpin,
{
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(2), connection.next())
            .await
            .ok()??
            .ok()?;
        match frame {
            ws::Frame::Text(bytes) => return String::from_utf8(bytes.to_vec()).ok(),
            ws::Frame::Ping(_) | ws::Frame::Pong(_) => continue,
            _ => return None,
        }
    }
}

/// Poll `check` until it holds or one second passes
pub async fn eventually<F: Fn() -> bool>(check: F) -> bool {
    wait_until(Duration::from_secs(1), check).await
}

/// Poll `check` every 20ms until it holds or `limit` passes
pub async fn wait_until<F: Fn() -> bool>(limit: Duration, check: F) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
