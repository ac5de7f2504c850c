use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, warn};

use crate::services::broadcaster::LiveMessage;
use crate::state::AppState;

/// Canal en vivo: snapshot completo al conectar y uno por cada cambio
pub fn create_ws_router() -> Router<AppState> {
    Router::new().route("/", get(live_updates))
}

async fn live_updates(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| stream_vehicles(socket, state))
}

async fn stream_vehicles(socket: WebSocket, state: AppState) {
    let mut subscription = state.vehicles.subscribe().await;
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            snapshot = subscription.recv() => {
                let Some(vehicles) = snapshot else {
                    warn!("🐢 Suscriptor {} desconectado por lentitud", subscription.id());
                    break;
                };
                let payload = match serde_json::to_string(&LiveMessage::vehicles(&vehicles)) {
                    Ok(payload) => payload,
                    Err(e) => {
                        error!("❌ Error serializando vehículos: {}", e);
                        continue;
                    }
                };
                if sender.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => debug!("📨 Mensaje del cliente ignorado"),
                }
            }
        }
    }

    subscription.unsubscribe();
    let _ = sender.close().await;
}
