//! WebSocket push session
//!
//! One actor per connected client. The session owns the channel's
//! [`Registration`], so the channel leaves the registry exactly once when
//! the actor stops, whatever stopped it (close frame, protocol error,
//! heartbeat timeout, server shutdown).

use std::time::{Duration, Instant};

use actix::{Actor, ActorContext, AsyncContext, StreamHandler};
use actix_web_actors::ws;
use futures::StreamExt;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::Registration;

/// A serialized notification waiting to be written to the socket
struct PushFrame(String);

pub struct PushSession {
    registration: Registration,
    frames: Option<UnboundedReceiver<String>>,
    heartbeat_interval: Duration,
    client_timeout: Duration,
    hb: Instant,
}

impl PushSession {
    pub fn new(
        registration: Registration,
        frames: UnboundedReceiver<String>,
        heartbeat_interval: Duration,
        client_timeout: Duration,
    ) -> Self {
        Self {
            registration,
            frames: Some(frames),
            heartbeat_interval,
            client_timeout,
            hb: Instant::now(),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(self.heartbeat_interval, |act, ctx| {
            if Instant::now().duration_since(act.hb) > act.client_timeout {
                tracing::warn!(
                    user_id = %act.registration.user_id(),
                    channel_id = %act.registration.channel_id(),
                    "WebSocket heartbeat failed, disconnecting"
                );
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for PushSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(
            user_id = %self.registration.user_id(),
            channel_id = %self.registration.channel_id(),
            "WebSocket session started"
        );

        self.hb(ctx);

        if let Some(frames) = self.frames.take() {
            ctx.add_stream(UnboundedReceiverStream::new(frames).map(PushFrame));
        }
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.registration.close();
        tracing::info!(
            user_id = %self.registration.user_id(),
            channel_id = %self.registration.channel_id(),
            "WebSocket session stopped"
        );
    }
}

// Outbound: frames queued by the dispatcher
impl StreamHandler<PushFrame> for PushSession {
    fn handle(&mut self, frame: PushFrame, ctx: &mut Self::Context) {
        ctx.text(frame.0);
    }

    fn finished(&mut self, ctx: &mut Self::Context) {
        // The registry let go of this channel (e.g. shutdown); nothing can reach it any more
        tracing::debug!(
            channel_id = %self.registration.channel_id(),
            "push queue closed, stopping session"
        );
        ctx.stop();
    }
}

// Inbound: WebSocket protocol messages from the client
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for PushSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                // Push-only channel; text from the client only counts as liveness
                self.hb = Instant::now();
                tracing::debug!(len = text.len(), "ignoring inbound text frame");
            }
            Ok(ws::Message::Binary(bin)) => {
                self.hb = Instant::now();
                tracing::warn!(len = bin.len(), "Binary WebSocket messages not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::info!(
                    channel_id = %self.registration.channel_id(),
                    "WebSocket close message received: {:?}",
                    reason
                );
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => {}
            Err(e) => {
                tracing::warn!(
                    channel_id = %self.registration.channel_id(),
                    error = %e,
                    "WebSocket protocol error"
                );
                ctx.stop();
            }
        }
    }
}
