//! Servidor web Axum com WebSocket para segmentação de texto chinês em tempo real

mod config;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use hmmseg_core::{
    corpus::demo_texts, EstimatorConfig, ModelSummary, PipelineEvent, SegError, SegPipeline,
    State as Tag,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

/// Pausa entre eventos do WebSocket, para a animação passo a passo.
const STEP_DELAY_MS: u64 = 35;

/// Estado compartilhado da aplicação
struct AppState {
    pipeline: SegPipeline,
}

#[derive(Deserialize)]
struct SegmentRequest {
    text: String,
}

#[derive(Deserialize)]
struct BatchRequest {
    lines: Vec<String>,
}

#[derive(Serialize)]
struct SegmentResponse {
    words: Vec<String>,
    tags: Vec<Tag>,
    score: f64,
    processing_ms: u64,
    total_chars: usize,
}

#[derive(Serialize)]
struct BatchItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    words: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Erro de API: status HTTP + mensagem em JSON.
struct ApiError(StatusCode, String);

impl From<SegError> for ApiError {
    fn from(e: SegError) -> Self {
        ApiError(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let corpus = config.load_corpus()?;
    info!(
        sequences = corpus.len(),
        chars = corpus.total_chars(),
        source = ?config.corpus_path,
        "corpus carregado"
    );

    let estimator_config = EstimatorConfig {
        alphabet_size: config.alphabet_size,
        ..EstimatorConfig::default()
    };
    let pipeline = SegPipeline::train(&corpus, estimator_config)?;
    let summary = pipeline.model().summary();
    info!(
        observed_symbols = summary.observed_symbols,
        degenerate_rows = summary.degenerate_rows.len(),
        "modelo treinado"
    );

    let app = router(Arc::new(AppState { pipeline }));

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("🚀 Servidor de segmentação iniciado em http://{}", config.bind);
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/segment", post(segment_handler))
        .route("/segment/batch", post(batch_handler))
        .route("/model", get(model_handler))
        .route("/ws", get(ws_handler))
        .route("/demo-texts", get(demo_texts_handler))
        .layer(cors)
        .with_state(state)
}

async fn index_handler() -> impl IntoResponse {
    Html(
        "<h1>hmmseg</h1>\
         <p>POST /segment {\"text\": \"...\"} · POST /segment/batch · GET /model · GET /ws</p>",
    )
}

/// Segmentação via HTTP POST (sem streaming)
async fn segment_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SegmentRequest>,
) -> Result<Json<SegmentResponse>, ApiError> {
    if req.text.trim().is_empty() {
        return Err(ApiError(StatusCode::BAD_REQUEST, "Texto vazio".to_string()));
    }

    let start = Instant::now();
    let pipeline = state.pipeline.clone();
    let segmentation = tokio::task::spawn_blocking(move || pipeline.analyze(&req.text))
        .await
        .map_err(|e| ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))??;
    let total_chars = segmentation.tags.len();

    Ok(Json(SegmentResponse {
        words: segmentation.words,
        tags: segmentation.tags,
        score: segmentation.score,
        processing_ms: start.elapsed().as_millis() as u64,
        total_chars,
    }))
}

/// Segmenta várias linhas de uma vez; cada linha tem o seu próprio resultado
async fn batch_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BatchRequest>,
) -> Result<Json<Vec<BatchItem>>, ApiError> {
    let pipeline = state.pipeline.clone();
    let results = tokio::task::spawn_blocking(move || pipeline.segment_lines(&req.lines))
        .await
        .map_err(|e| ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let items = results
        .into_iter()
        .map(|r| match r {
            Ok(seg) => BatchItem {
                words: Some(seg.words),
                error: None,
            },
            Err(e) => BatchItem {
                words: None,
                error: Some(e.to_string()),
            },
        })
        .collect();
    Ok(Json(items))
}

async fn model_handler(State(state): State<Arc<AppState>>) -> Json<ModelSummary> {
    Json(state.pipeline.model().summary())
}

/// Retorna textos de demonstração
async fn demo_texts_handler() -> impl IntoResponse {
    let texts: Vec<serde_json::Value> = demo_texts()
        .iter()
        .map(|(origin, text)| {
            serde_json::json!({
                "origin": origin,
                "text": text
            })
        })
        .collect();
    Json(texts)
}

/// Upgrade HTTP → WebSocket
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Recebe texto, executa o pipeline e envia os eventos do Viterbi em tempo real
async fn handle_websocket(mut socket: WebSocket, state: Arc<AppState>) {
    info!("WebSocket conectado");

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                // Aceita {"text": "..."} ou texto puro
                let text = match serde_json::from_str::<SegmentRequest>(&text) {
                    Ok(req) => req.text,
                    Err(_) => text.to_string(),
                };
                if text.trim().is_empty() {
                    continue;
                }

                info!("Segmentando via WebSocket: {} chars", text.chars().count());

                let pipeline = state.pipeline.clone();
                let events = tokio::task::spawn_blocking(move || {
                    let (tx, rx) = std::sync::mpsc::channel::<PipelineEvent>();
                    pipeline.analyze_streaming(&text, tx);
                    rx.try_iter().collect::<Vec<_>>()
                })
                .await;

                let events = match events {
                    Ok(events) => events,
                    Err(e) => {
                        warn!("pipeline abortado: {}", e);
                        return;
                    }
                };

                for event in &events {
                    if let Ok(json) = serde_json::to_string(event) {
                        if socket.send(Message::Text(json)).await.is_err() {
                            return; // cliente desconectou
                        }
                        tokio::time::sleep(tokio::time::Duration::from_millis(STEP_DELAY_MS)).await;
                    }
                }
            }
            Message::Close(_) => {
                info!("WebSocket desconectado");
                return;
            }
            Message::Ping(payload) => {
                let _ = socket.send(Message::Pong(payload)).await;
            }
            _ => {}
        }
    }
}
