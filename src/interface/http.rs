//! # HTTP Surface
//!
//! The axum router: file CRUD endpoints, uploads, search, chat, project
//! scaffolding and the automode SSE stream. Handlers stay thin and delegate
//! to the tool executor and the application services.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::application::chat::{ChatService, DEFAULT_SESSION};
use crate::application::engine::{AutomodeEngine, RunRegistry};
use crate::application::project::ProjectManager;
use crate::application::state::Snapshot;
use crate::domain::traits::LlmProvider;
use crate::infrastructure::tools::executor::SharedToolExecutor;
use crate::interface::error::ApiError;
use crate::interface::sse::automode_stream;
use crate::strings::{logs, messages};

// ── App State ──

pub struct AppState {
    pub tools: SharedToolExecutor,
    pub engine: AutomodeEngine,
    pub chat: ChatService,
    pub projects: ProjectManager,
}

impl AppState {
    pub fn new(tools: SharedToolExecutor, llm: Arc<dyn LlmProvider>, max_iterations: usize) -> Self {
        let provider = tools.search_provider().to_string();
        Self {
            engine: AutomodeEngine::new(
                llm.clone(),
                tools.clone(),
                Arc::new(RunRegistry::new()),
                max_iterations,
                &provider,
            ),
            chat: ChatService::new(llm, tools.clone(), &provider),
            projects: ProjectManager::new(tools.clone()),
            tools,
        }
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ── Routes ──

/// Every registered route, for the startup log.
pub const ROUTES: &[(&str, &str)] = &[
    ("GET", "/health"),
    ("POST", "/automode"),
    ("GET", "/automode"),
    ("GET", "/automode-status"),
    ("POST", "/create_folder"),
    ("POST", "/create_file"),
    ("GET", "/read_file"),
    ("GET", "/list_files"),
    ("POST", "/write_file"),
    ("DELETE", "/delete_file"),
    ("POST", "/upload"),
    ("POST", "/analyze_image"),
    ("POST", "/search"),
    ("POST", "/chat"),
    ("DELETE", "/chat"),
    ("POST", "/create_project"),
    ("GET", "/project_state"),
    ("POST", "/project_state/rebuild"),
];

/// Build the router (for testing without binding to a port).
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/automode", post(post_automode).get(get_automode))
        .route("/automode-status", get(automode_status))
        .route("/create_folder", post(create_folder))
        .route("/create_file", post(create_file))
        .route("/read_file", get(read_file))
        .route("/list_files", get(list_files))
        .route("/write_file", post(write_file))
        .route("/delete_file", delete(delete_file))
        .route("/upload", post(upload))
        .route("/analyze_image", post(analyze_image))
        .route("/search", post(search))
        .route("/chat", post(chat).delete(clear_chat))
        .route("/create_project", post(create_project))
        .route("/project_state", get(project_state))
        .route("/project_state/rebuild", post(rebuild_project_state))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Entrypoint ──

pub async fn serve(state: Arc<AppState>, bind: &str, port: u16) -> anyhow::Result<()> {
    let app = router(state);
    let addr = format!("{}:{}", bind, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("{}", logs::listening(&addr));
    for (method, path) in ROUTES {
        tracing::info!("{}", logs::route(method, path));
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("{}", logs::SHUTDOWN),
        Err(e) => tracing::error!("{}", logs::shutdown_fail(&e.to_string())),
    }
}

// ── Health ──

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

// ── Automode ──

#[derive(Deserialize)]
struct AutomodeRequest {
    message: String,
}

async fn post_automode(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AutomodeRequest>,
) -> impl IntoResponse {
    start_automode(state, req.message).await
}

async fn get_automode(
    State(state): State<Arc<AppState>>,
    Query(req): Query<AutomodeRequest>,
) -> impl IntoResponse {
    start_automode(state, req.message).await
}

async fn start_automode(state: Arc<AppState>, message: String) -> impl IntoResponse {
    let (run_id, rx) = state.engine.start(message).await;
    ([("x-run-id", run_id.to_string())], automode_stream(rx))
}

#[derive(Deserialize)]
struct StatusQuery {
    run_id: Option<u64>,
}

async fn automode_status(
    State(state): State<Arc<AppState>>,
    Query(q): Query<StatusQuery>,
) -> ApiResult<Json<Value>> {
    let runs = state.engine.runs();
    let run = match q.run_id {
        Some(id) => Some(
            runs.get(id)
                .await
                .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("Run not found: {}", id)))?,
        ),
        None => runs.latest().await,
    };
    let body = match run {
        Some(run) => serde_json::to_value(run).map_err(|e| ApiError::internal(e.to_string()))?,
        None => json!({ "progress": 0, "messages": [] }),
    };
    Ok(Json(body))
}

// ── Files ──

#[derive(Deserialize)]
struct PathQuery {
    path: String,
}

#[derive(Deserialize)]
struct ListQuery {
    #[serde(default = "dot")]
    path: String,
}

#[derive(Deserialize)]
struct CreateFileQuery {
    path: String,
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct ContentBody {
    #[serde(default)]
    content: String,
}

fn dot() -> String {
    ".".to_string()
}

async fn create_folder(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PathQuery>,
) -> ApiResult<Json<Value>> {
    let message = state.tools.create_folder(&q.path).await?;
    Ok(Json(json!({ "message": message })))
}

async fn create_file(
    State(state): State<Arc<AppState>>,
    Query(q): Query<CreateFileQuery>,
) -> ApiResult<Json<Value>> {
    let message = state.tools.create_file(&q.path, &q.content).await?;
    Ok(Json(json!({ "message": message })))
}

async fn read_file(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PathQuery>,
) -> ApiResult<Json<Value>> {
    let content = state.tools.read_file(&q.path).await?;
    Ok(Json(json!({ "content": content })))
}

async fn list_files(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> ApiResult<Json<Value>> {
    let (_, key) = state.tools.root().locate(&q.path)?;
    let files = state.tools.list_files(&q.path).await?;
    let current = if key.is_empty() { ".".to_string() } else { key };
    Ok(Json(json!({ "files": files, "currentDirectory": current })))
}

async fn write_file(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PathQuery>,
    body: Result<Json<ContentBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body.map_err(|_| ApiError::unprocessable("Invalid JSON body"))?;
    if body.content.is_empty() {
        return Err(ApiError::unprocessable("Content is required"));
    }
    let message = state.tools.write_to_file(&q.path, &body.content).await?;
    Ok(Json(json!({ "message": message })))
}

async fn delete_file(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PathQuery>,
) -> ApiResult<Json<Value>> {
    let message = state.tools.delete_file(&q.path).await?;
    Ok(Json(json!({ "message": message })))
}

// ── Uploads ──

struct UploadedFile {
    file_name: String,
    content_type: Option<String>,
    bytes: bytes::Bytes,
}

/// Pulls the `file` part out of a multipart body.
async fn file_part(mut multipart: Multipart) -> ApiResult<UploadedFile> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::unprocessable(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::unprocessable(format!("Invalid multipart body: {}", e)))?;
        return Ok(UploadedFile {
            file_name,
            content_type,
            bytes,
        });
    }
    Err(ApiError::unprocessable("Missing 'file' field"))
}

async fn upload(State(state): State<Arc<AppState>>, multipart: Multipart) -> ApiResult<Json<Value>> {
    let file = file_part(multipart).await?;
    let key = state.tools.store_upload(&file.file_name, &file.bytes).await?;
    let name = key.rsplit('/').next().unwrap_or(&key);
    Ok(Json(json!({
        "message": messages::uploaded(name),
        "file_contents": String::from_utf8_lossy(&file.bytes),
    })))
}

async fn analyze_image(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let file = file_part(multipart).await?;
    let media_type = file.content_type.as_deref().unwrap_or("image/png");
    let analysis = state
        .chat
        .analyze_image(media_type, &file.bytes)
        .await
        .map_err(|e| ApiError::internal(format!("Error analyzing image: {}", e)))?;
    Ok(Json(json!({ "analysis": analysis })))
}

// ── Search ──

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
}

async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> ApiResult<Json<Value>> {
    let results = state
        .tools
        .search(&req.query)
        .await
        .map_err(|e| ApiError::internal(format!("Error performing search: {}", e)))?;
    Ok(Json(json!({ "results": results })))
}

// ── Chat ──

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Deserialize)]
struct SessionQuery {
    #[serde(default)]
    session_id: Option<String>,
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> ApiResult<Json<Value>> {
    let session = req.session_id.as_deref().unwrap_or(DEFAULT_SESSION);
    let response = state.chat.send(session, &req.message).await?;
    Ok(Json(json!({ "response": response })))
}

async fn clear_chat(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SessionQuery>,
) -> Json<Value> {
    let session = q.session_id.as_deref().unwrap_or(DEFAULT_SESSION);
    let cleared = state.chat.clear(session).await;
    Json(json!({ "cleared": cleared }))
}

// ── Projects ──

#[derive(Deserialize)]
struct ProjectRequest {
    template: String,
}

async fn create_project(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
    Json(req): Json<ProjectRequest>,
) -> ApiResult<Json<Value>> {
    let message = state.projects.create_project(&req.template, &q.path).await?;
    Ok(Json(json!({ "message": message })))
}

async fn project_state(State(state): State<Arc<AppState>>) -> Json<Snapshot> {
    Json(state.tools.snapshot().await)
}

async fn rebuild_project_state(State(state): State<Arc<AppState>>) -> ApiResult<Json<Snapshot>> {
    Ok(Json(state.tools.rebuild_state().await?))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::engine::tests::{ScriptedLlm, text, tool_use};
    use crate::infrastructure::tools::executor::tests::fixture;
    use axum::body::Body;
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn app(llm: Arc<ScriptedLlm>, max_iterations: usize) -> (TempDir, Arc<AppState>) {
        let (tmp, exec) = fixture();
        let state = Arc::new(AppState::new(Arc::new(exec), llm, max_iterations));
        (tmp, state)
    }

    async fn send(state: &Arc<AppState>, req: Request<Body>) -> (StatusCode, Value) {
        let resp = router(state.clone()).oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    fn request(method: &str, uri: &str) -> Request<Body> {
        Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn multipart_request(uri: &str, file_name: &str, content_type: &str, data: &[u8]) -> Request<Body> {
        let boundary = "projectd-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let (_tmp, state) = app(ScriptedLlm::new(vec![]), 1);
        let (status, json) = send(&state, request("GET", "/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["ok"], true);
    }

    #[tokio::test]
    async fn file_crud_round_trip() {
        let (_tmp, state) = app(ScriptedLlm::new(vec![]), 1);

        let (status, json) = send(&state, request("POST", "/create_folder?path=app")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Folder created: app");

        let (status, _) = send(&state, request("POST", "/create_file?path=app/main.py&content=print")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, json) = send(
            &state,
            json_request("POST", "/write_file?path=app/main.py", json!({"content": "print('hi')"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Content written to file: app/main.py");

        let (_, json) = send(&state, request("GET", "/read_file?path=app/main.py")).await;
        assert_eq!(json["content"], "print('hi')");

        let (_, json) = send(&state, request("GET", "/list_files?path=app")).await;
        assert_eq!(json["currentDirectory"], "app");
        assert_eq!(json["files"][0]["name"], "main.py");
        assert_eq!(json["files"][0]["isDirectory"], false);

        let (status, _) = send(&state, request("DELETE", "/delete_file?path=app/main.py")).await;
        assert_eq!(status, StatusCode::OK);
        let (status, json) = send(&state, request("GET", "/read_file?path=app/main.py")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["detail"], "File does not exist: app/main.py");
    }

    #[tokio::test]
    async fn error_statuses() {
        let (_tmp, state) = app(ScriptedLlm::new(vec![]), 1);

        let (status, json) = send(&state, request("GET", "/read_file?path=../../etc/passwd")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(json["detail"].as_str().unwrap().starts_with("Access denied"));

        send(&state, request("POST", "/create_folder?path=app")).await;
        send(&state, request("POST", "/create_file?path=app/a.txt")).await;
        let (status, _) = send(&state, request("DELETE", "/delete_file?path=app")).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, json) = send(
            &state,
            json_request("POST", "/write_file?path=app/a.txt", json!({"content": ""})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["detail"], "Content is required");

        let (status, json) = send(&state, request("POST", "/write_file?path=app/a.txt")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["detail"], "Invalid JSON body");

        let (status, _) = send(&state, request("GET", "/list_files?path=missing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn automode_streams_events() {
        let llm = ScriptedLlm::new(vec![Ok(vec![
            tool_use("create_folder", json!({"path": "game"})),
            text("Done. AUTOMODE_COMPLETE"),
        ])]);
        let (_tmp, state) = app(llm, 3);

        let resp = router(state.clone())
            .oneshot(json_request("POST", "/automode", json!({"message": "make a game"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["content-type"], "text/event-stream");
        assert_eq!(resp.headers()["x-run-id"], "1");

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        let message_at = body.find("event: message").unwrap();
        let end_at = body.find("event: end").unwrap();
        assert!(message_at < end_at);
        assert!(body.contains(r#""event":"end""#));
        assert!(body.contains("Used tool: create_folder"));

        let (_, json) = send(&state, request("GET", "/automode-status")).await;
        assert_eq!(json["run_id"], 1);
        assert_eq!(json["progress"], 100);
        assert_eq!(json["status"], "completed");
        assert_eq!(json["messages"][0]["role"], "assistant");
    }

    #[tokio::test]
    async fn automode_failure_is_an_error_event() {
        let llm = ScriptedLlm::new(vec![Err("invalid x-api-key".to_string())]);
        let (_tmp, state) = app(llm, 2);

        let resp = router(state.clone())
            .oneshot(request("GET", "/automode?message=hi"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("event: error"));
        assert!(body.contains("invalid x-api-key"));

        let (_, json) = send(&state, request("GET", "/automode-status?run_id=1")).await;
        assert_eq!(json["status"], "failed");
        let (status, _) = send(&state, request("GET", "/automode-status?run_id=9")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn automode_status_before_any_run() {
        let (_tmp, state) = app(ScriptedLlm::new(vec![]), 1);
        let (status, json) = send(&state, request("GET", "/automode-status")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"progress": 0, "messages": []}));
    }

    #[tokio::test]
    async fn chat_sessions() {
        let llm = ScriptedLlm::new(vec![Ok(vec![text("Hello!")]), Err("down".to_string())]);
        let (_tmp, state) = app(llm, 1);

        let (status, json) = send(&state, json_request("POST", "/chat", json!({"message": "hi"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["response"], "Hello!");

        let (status, json) = send(
            &state,
            json_request("POST", "/chat", json!({"message": "hi", "session_id": "b"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["detail"], "[scripted] down");

        let (_, json) = send(&state, request("DELETE", "/chat")).await;
        assert_eq!(json["cleared"], true);
    }

    #[tokio::test]
    async fn create_project_endpoint() {
        let (_tmp, state) = app(ScriptedLlm::new(vec![]), 1);

        let (status, json) = send(
            &state,
            json_request("POST", "/create_project?path=.", json!({"template": "node"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "node project created successfully at node_project");

        let (_, json) = send(&state, request("GET", "/project_state")).await;
        assert_eq!(json["folders"], json!(["node_project"]));
        assert_eq!(json["files"], json!(["node_project/index.js", "node_project/package.json"]));

        let (status, _) = send(
            &state,
            json_request("POST", "/create_project", json!({"template": "fortran"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn rebuild_picks_up_disk_changes() {
        let (_tmp, state) = app(ScriptedLlm::new(vec![]), 1);
        std::fs::create_dir_all(state.tools.root().path().join("manual")).unwrap();

        let (status, json) = send(&state, request("POST", "/project_state/rebuild")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["folders"], json!(["manual"]));
    }

    #[tokio::test]
    async fn upload_and_analyze() {
        let llm = ScriptedLlm::new(vec![Ok(vec![text("A cat.")])]);
        let (_tmp, state) = app(llm, 1);

        let (status, json) = send(&state, multipart_request("/upload", "notes.txt", "text/plain", b"hello")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "File notes.txt uploaded successfully to uploads directory");
        assert_eq!(json["file_contents"], "hello");
        assert!(state.tools.root().path().join("uploads/notes.txt").is_file());

        let (status, json) = send(
            &state,
            multipart_request("/analyze_image", "cat.png", "image/png", b"\x89PNG"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["analysis"], "A cat.");
    }

    #[tokio::test]
    async fn search_endpoint() {
        let (_tmp, state) = app(ScriptedLlm::new(vec![]), 1);
        let (status, json) = send(&state, json_request("POST", "/search", json!({"query": "axum"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["results"], "results for axum");

        let (status, json) = send(&state, json_request("POST", "/search", json!({"query": "fail"}))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["detail"], "Error performing search: search backend unavailable");
    }
}
