//! Servidor web Axum com WebSocket para gerar questões de lacuna em tempo real

mod config;

use askama::Template;
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
use cloze_core::{
    legend::{self, LABEL_FAMILIES},
    pipeline::{PipelineError, PipelineEvent, QuizOutput, QuizPipeline},
    DecodeMode, LexiconClassifier, QuizConfig, TaggedToken,
};
use serde::{Deserialize, Serialize};
use std::sync::{mpsc, Arc};
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

/// Estado compartilhado da aplicação
struct AppState {
    pipeline: QuizPipeline<LexiconClassifier>,
}

/// Ajustes por requisição sobre a configuração do servidor
#[derive(Debug, Default, Deserialize)]
struct QuizOverrides {
    #[serde(default)]
    max_per_entity_type: Option<usize>,
    #[serde(default)]
    decode_mode: Option<DecodeMode>,
}

impl QuizOverrides {
    fn apply(&self, base: &QuizConfig) -> QuizConfig {
        let mut config = base.clone();
        if let Some(max) = self.max_per_entity_type {
            config.max_per_entity_type = max;
        }
        if let Some(mode) = self.decode_mode {
            config.decode_mode = mode;
        }
        config
    }
}

#[derive(Deserialize)]
struct AnalyzeRequest {
    text: String,
    #[serde(flatten)]
    overrides: QuizOverrides,
}

/// Texto + fluxo já rotulado por um modelo externo
#[derive(Deserialize)]
struct QuestionsRequest {
    text: String,
    tokens: Vec<TaggedToken>,
    #[serde(flatten)]
    overrides: QuizOverrides,
}

#[derive(Serialize)]
struct AnalyzeResponse {
    #[serde(flatten)]
    output: QuizOutput,
    processing_ms: u64,
    total_tokens: usize,
}

impl AnalyzeResponse {
    fn new(output: QuizOutput, start: Instant) -> Self {
        Self {
            total_tokens: output.annotations.len(),
            processing_ms: start.elapsed().as_millis() as u64,
            output,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("failed to render results: {0}")]
    Template(#[from] askama::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Pipeline(PipelineError::EmptyInput) => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(PipelineError::Classifier(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self, "falha ao processar requisição");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

struct TokenView {
    token: String,
    label: String,
    confidence: String,
    style: String,
    highlighted: bool,
}

struct GroupView {
    entity_type: String,
    questions: Vec<String>,
}

/// Fragmento HTML com tokens destacados, legenda e questões agrupadas
#[derive(Template)]
#[template(path = "results.html")]
struct ResultsTemplate {
    tokens: Vec<TokenView>,
    description_lines: Vec<String>,
    groups: Vec<GroupView>,
}

impl ResultsTemplate {
    fn from_output(output: &QuizOutput) -> Self {
        let tokens = output
            .annotations
            .iter()
            .map(|t| TokenView {
                token: t.token.clone(),
                label: t.label.clone(),
                confidence: t.confidence_percent(),
                style: legend::label_style(&t.label),
                highlighted: t.label != "O",
            })
            .collect();
        let groups = output
            .questions
            .iter()
            .map(|(entity_type, questions)| GroupView {
                entity_type: entity_type.to_string(),
                questions: questions.to_vec(),
            })
            .collect();
        Self {
            tokens,
            description_lines: legend::description().lines().map(str::to_string).collect(),
            groups,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::load()?;
    let classifier = if config.lexicon.is_empty() {
        LexiconClassifier::demo()
    } else {
        LexiconClassifier::from_entries(&config.lexicon)
    };
    info!(
        phrases = classifier.len(),
        max_per_entity_type = config.quiz.max_per_entity_type,
        "classificador carregado"
    );

    let state = Arc::new(AppState {
        pipeline: QuizPipeline::new(classifier, config.quiz.clone()),
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("🚀 Servidor de questões iniciado em http://{}", config.bind_addr);
    axum::serve(listener, app(state)).await?;
    Ok(())
}

fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/analyze", post(analyze_handler))
        .route("/questions", post(questions_handler))
        .route("/render", post(render_handler))
        .route("/legend", get(legend_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(state)
}

/// Retorna a página principal HTML
async fn index_handler() -> impl IntoResponse {
    Html(include_str!("../templates/index.html"))
}

/// Classifica o texto e gera as questões (JSON)
async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let start = Instant::now();
    let config = req.overrides.apply(state.pipeline.config());
    let output = state.pipeline.run_with(&req.text, &config)?;
    Ok(Json(AnalyzeResponse::new(output, start)))
}

/// Gera as questões a partir de um fluxo rotulado enviado pelo cliente
async fn questions_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QuestionsRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let start = Instant::now();
    let config = req.overrides.apply(state.pipeline.config());
    let pipeline = QuizPipeline::from_stream(req.tokens, config);
    let output = pipeline.run(&req.text)?;
    Ok(Json(AnalyzeResponse::new(output, start)))
}

/// Mesmo que `/analyze`, mas devolve o fragmento HTML
async fn render_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Html<String>, ApiError> {
    let config = req.overrides.apply(state.pipeline.config());
    let output = state.pipeline.run_with(&req.text, &config)?;
    let html = ResultsTemplate::from_output(&output).render()?;
    Ok(Html(html))
}

/// Legenda do esquema BIO e cores por tipo
async fn legend_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "description": legend::description(),
        "families": LABEL_FAMILIES,
    }))
}

/// Upgrade HTTP → WebSocket
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Mensagem do cliente: JSON `{text, ...}` ou texto puro.
fn parse_ws_request(message: &str) -> (String, QuizOverrides) {
    match serde_json::from_str::<AnalyzeRequest>(message) {
        Ok(req) => (req.text, req.overrides),
        Err(_) => (message.to_string(), QuizOverrides::default()),
    }
}

/// Roda o pipeline (síncrono) fora do runtime e coleta os eventos emitidos.
///
/// Se a tarefa morrer no meio, os eventos já enviados são mantidos e um
/// `Error` fecha a sequência.
async fn collect_events<F>(job: F) -> Vec<PipelineEvent>
where
    F: FnOnce(mpsc::Sender<PipelineEvent>) + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<PipelineEvent>();
    let result = tokio::task::spawn_blocking(move || job(tx)).await;

    // Coleta numa Vec (o rx não é Send)
    let mut events: Vec<PipelineEvent> = rx.try_iter().collect();
    if let Err(e) = result {
        error!(error = %e, "pipeline interrompido");
        events.push(PipelineEvent::Error {
            message: format!("pipeline interrupted: {}", e),
        });
    }
    events
}

/// Lógica do WebSocket: recebe texto, executa pipeline e envia os eventos
async fn handle_websocket(mut socket: WebSocket, state: Arc<AppState>) {
    info!("WebSocket conectado");

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                let (text_str, overrides) = parse_ws_request(&text);
                let config = overrides.apply(state.pipeline.config());

                info!("Gerando questões via WebSocket: {} chars", text_str.len());

                let pipeline_state = Arc::clone(&state);
                let events = collect_events(move |tx| {
                    pipeline_state.pipeline.analyze_streaming(&text_str, &config, tx);
                })
                .await;

                for event in &events {
                    if let Ok(json) = serde_json::to_string(event) {
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            return; // cliente desconectou
                        }
                        // Pequena pausa para a animação passo a passo
                        tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
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
