//! A4: newline-delimited JSON front end.
//!
//! Out-of-scope HTTP/JSON gateways aside, callers still need some way to
//! reach the engine from outside the process. One `Request` per line in,
//! one `Response` per line out, over plain TCP -- enough to drive the
//! engine from a test client or a thin CLI without pulling in a full HTTP
//! stack.
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use hotel_ac_protocol::{Request, Response, WireError};

use crate::engine::{ChangeOutcome, ChangeTempOutcome, Engine, PowerOnOutcome};

/// Accept loop: binds `addr`, spawns one task per connection, and returns
/// once `shutdown` resolves. Connections in flight are not force-closed;
/// they finish their current request and see EOF on their own.
pub async fn serve(addr: &str, engine: Engine, shutdown: impl std::future::Future<Output = ()>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "binding layer listening");
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "accepted connection");
                        let engine = engine.clone();
                        tokio::spawn(async move {
                            handle_connection(stream, engine).await;
                        });
                    }
                    Err(e) => warn!(error = %e, "accept failed"),
                }
            }
            _ = &mut shutdown => {
                info!("binding layer shutting down");
                return Ok(());
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, engine: Engine) {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "read error, closing connection");
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => dispatch(&engine, request).await,
            Err(e) => Response::Error { error: WireError::new("INVALID_ARGUMENT", format!("malformed request: {e}")) },
        };

        let Ok(mut payload) = serde_json::to_string(&response) else {
            error!("failed to serialize response");
            return;
        };
        payload.push('\n');
        if writer.write_all(payload.as_bytes()).await.is_err() {
            return;
        }
    }
}

async fn dispatch(engine: &Engine, request: Request) -> Response {
    match request {
        Request::PowerOn { room_id, current_temp } => match engine.power_on(room_id, current_temp).await {
            Ok(PowerOnOutcome::Started) => Response::Ok,
            Ok(PowerOnOutcome::NoOp) => Response::NoOp,
            Err(e) => error_response(e),
        },
        Request::PowerOff { room_id } => match engine.power_off(room_id).await {
            Ok(()) => Response::Ok,
            Err(e) => error_response(e),
        },
        Request::ChangeTemp { room_id, target_temp } => match engine.change_temp(room_id, target_temp).await {
            Ok(ChangeTempOutcome::Applied) => Response::Ok,
            Ok(ChangeTempOutcome::OutOfRange { message }) => Response::OutOfRange { message },
            Err(e) => error_response(e),
        },
        Request::ChangeSpeed { room_id, fan_speed } => match engine.change_speed(room_id, fan_speed).await {
            Ok(ChangeOutcome::Applied) => Response::Ok,
            Ok(ChangeOutcome::NoOp) => Response::NoOp,
            Err(e) => error_response(e),
        },
        Request::ChangeMode { room_id, mode } => match engine.change_mode(room_id, mode).await {
            Ok(ChangeOutcome::Applied) => Response::Ok,
            Ok(ChangeOutcome::NoOp) => Response::NoOp,
            Err(e) => error_response(e),
        },
        Request::RequestState { room_id } => match engine.request_state(room_id).await {
            Ok(room) => Response::Room { room },
            Err(e) => error_response(e),
        },
        Request::ScheduleStatus => Response::Schedule { schedule: engine.schedule_status().await },
        Request::SetTimeSpeed { speed } => Response::Clock { clock: engine.set_time_speed(speed).await },
        Request::JumpTime { add_minutes } => Response::Clock { clock: engine.jump_time_minutes(add_minutes).await },
        Request::PauseTime => Response::Clock { clock: engine.pause_time().await },
        Request::ResumeTime => Response::Clock { clock: engine.resume_time().await },
        Request::TimeStatus => Response::Clock { clock: engine.time_status().await },
        Request::InitRoom { room_id, temperature, default_temp, daily_rate } => {
            match engine.init_room(room_id, temperature, default_temp, daily_rate).await {
                Ok(()) => Response::Ok,
                Err(e) => error_response(e),
            }
        }
    }
}

fn error_response(err: crate::errors::EngineError) -> Response {
    Response::Error { error: WireError::new(err.kind(), err.to_string()) }
}
