//! HTTP JSON API for the process dashboard
//!
//! `nestland serve` → blocking tiny_http loop, one request at a time.
//! Routing and handling are plain functions over [`ApiRequest`] so they can be
//! tested without a socket.

use crate::config::Config;
use crate::db::{Database, DbError, ProcessStore};
use crate::filters::{available_categories, filter_processes_by_category, steps_by_role, visible_comments};
use crate::loader::{GraphLoader, LoadOutcome};
use crate::notify::{submit_comment, CommentNotifier};
use crate::selection::Selection;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use tiny_http::{Header, Request, Response, Server};
use tracing::{debug, info, warn};

pub const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";

/// Largest request body the server reads
pub const MAX_BODY_BYTES: u64 = 64 * 1024;

#[derive(Serialize)]
struct ApiResponse<T> {
    ok: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Status code and JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    fn ok<T: Serialize>(data: T) -> Self {
        match serde_json::to_string(&ApiResponse::success(data)) {
            Ok(body) => Self { status: 200, body },
            Err(e) => Self::error(500, format!("Failed to encode response: {}", e)),
        }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        let body = serde_json::to_string(&ApiResponse::failure(message))
            .unwrap_or_else(|_| r#"{"ok":false,"data":null,"error":"internal error"}"#.to_string());
        Self { status, body }
    }

    fn from_db_error(e: DbError) -> Self {
        match e {
            DbError::NotFound(_) => Self::error(404, e.to_string()),
            DbError::Validation(_) => Self::error(400, e.to_string()),
            other => {
                warn!(error = %other, "request failed");
                Self::error(500, format!("Database error: {}", other))
            }
        }
    }
}

/// Everything the handler needs from an incoming request
#[derive(Debug, Clone, Default)]
pub struct ApiRequest {
    pub method: String,
    pub url: String,
    pub admin_token: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    ListProcesses { selection: Selection },
    Categories,
    Process { slug: String },
    Graph { slug: String, selection: Selection },
    Comments { slug: String, step_id: Option<String> },
    Roles { slug: String },
    AddComment { slug: String },
    ResolveComment { id: String },
    NotFound,
}

/// Query values; blank values count as absent
fn parse_query(query: &str) -> HashMap<String, String> {
    serde_urlencoded::from_str::<Vec<(String, String)>>(query)
        .unwrap_or_default()
        .into_iter()
        .filter(|(_, v)| !v.trim().is_empty())
        .collect()
}

impl Route {
    pub fn parse(method: &str, url: &str) -> Self {
        let (path, query) = url.split_once('?').unwrap_or((url, ""));
        let mut query = parse_query(query);
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

        match (method, segments.as_slice()) {
            ("GET", ["api", "processes"]) => Route::ListProcesses {
                selection: Selection::new().with_category(query.get("category").map(String::as_str)),
            },
            ("GET", ["api", "categories"]) => Route::Categories,
            ("GET", ["api", "processes", slug]) => Route::Process { slug: slug.to_string() },
            ("GET", ["api", "processes", slug, "graph"]) => {
                let mut selection = match query.get("selected") {
                    Some(step_id) => Selection::new().select_step(step_id),
                    None => Selection::new(),
                };
                // a click on a node: select it, or deselect it if it was selected
                if let Some(step_id) = query.get("toggle") {
                    selection = selection.toggle_step(step_id);
                }
                Route::Graph { slug: slug.to_string(), selection }
            }
            ("GET", ["api", "processes", slug, "comments"]) => Route::Comments {
                slug: slug.to_string(),
                step_id: query.remove("step"),
            },
            ("GET", ["api", "processes", slug, "roles"]) => Route::Roles { slug: slug.to_string() },
            ("POST", ["api", "processes", slug, "comments"]) => Route::AddComment { slug: slug.to_string() },
            ("POST", ["api", "comments", id, "resolve"]) => Route::ResolveComment { id: id.to_string() },
            _ => Route::NotFound,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NewCommentRequest {
    body: String,
    #[serde(default)]
    step_id: Option<String>,
}

#[derive(Serialize)]
struct ResolveResult<'a> {
    id: &'a str,
    changed: bool,
}

/// Shared server state
pub struct ApiState {
    db: Database,
    config: Config,
    loader: GraphLoader,
    notifier: Box<dyn CommentNotifier>,
}

impl ApiState {
    pub fn new(db: Database, config: Config, notifier: Box<dyn CommentNotifier>) -> Self {
        Self {
            db,
            config,
            loader: GraphLoader::new(),
            notifier,
        }
    }

    pub fn handle(&self, request: &ApiRequest) -> Reply {
        let route = Route::parse(&request.method, &request.url);
        debug!(method = %request.method, url = %request.url, ?route, "request");

        let result = match route {
            Route::ListProcesses { selection } => self
                .db
                .list_processes()
                .map(|all| Reply::ok(filter_processes_by_category(&all, selection.category()))),
            Route::Categories => self
                .db
                .list_processes()
                .map(|all| Reply::ok(available_categories(&all))),
            Route::Process { slug } => self.db.snapshot(&slug).map(|s| {
                Reply::ok(serde_json::json!({
                    "process": s.process,
                    "steps": s.steps,
                    "transitions": s.transitions,
                }))
            }),
            Route::Graph { slug, selection } => self
                .loader
                .load(&self.db, &slug, selection.selected_step())
                .map(|outcome| match outcome {
                    LoadOutcome::Ready(loaded) => Reply::ok(loaded),
                    LoadOutcome::Superseded => Reply::error(409, "Superseded by a newer request"),
                }),
            Route::Comments { slug, step_id } => self
                .db
                .require_process(&slug)
                .and_then(|p| self.db.comments_for(&p.slug))
                .map(|comments| Reply::ok(visible_comments(&comments, step_id.as_deref()))),
            Route::Roles { slug } => self
                .db
                .require_process(&slug)
                .and_then(|p| self.db.steps_for(&p.id))
                .map(|steps| Reply::ok(steps_by_role(&steps))),
            Route::AddComment { slug } => return self.add_comment(&slug, &request.body),
            Route::ResolveComment { id } => return self.resolve_comment(&id, request.admin_token.as_deref()),
            Route::NotFound => return Reply::error(404, "Not found"),
        };

        result.unwrap_or_else(Reply::from_db_error)
    }

    fn add_comment(&self, slug: &str, body: &str) -> Reply {
        let req: NewCommentRequest = match serde_json::from_str(body) {
            Ok(r) => r,
            Err(e) => return Reply::error(400, format!("Invalid JSON: {}", e)),
        };
        if req.body.trim().is_empty() {
            return Reply::error(400, "Comment body is required");
        }

        match submit_comment(&self.db, self.notifier.as_ref(), slug, req.step_id.as_deref(), &req.body, None) {
            Ok(comment) => {
                let mut reply = Reply::ok(comment);
                reply.status = 201;
                reply
            }
            Err(e) => Reply::from_db_error(e),
        }
    }

    fn resolve_comment(&self, id: &str, token: Option<&str>) -> Reply {
        if !self.config.is_admin_token(token) {
            return Reply::error(403, "Admin token required");
        }
        match self.db.resolve_comment(id) {
            Ok(changed) => Reply::ok(ResolveResult { id, changed }),
            Err(e) => Reply::from_db_error(e),
        }
    }
}

fn json_header() -> Option<Header> {
    Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).ok()
}

fn body_too_large(limit: u64) -> Reply {
    Reply::error(413, format!("Request body exceeds {} bytes", limit))
}

/// Read at most `limit` bytes of UTF-8 body
fn read_body(reader: impl Read, limit: u64) -> Result<String, Reply> {
    let mut bytes = Vec::new();
    reader
        .take(limit + 1)
        .read_to_end(&mut bytes)
        .map_err(|e| Reply::error(400, format!("Failed to read body: {}", e)))?;
    if bytes.len() as u64 > limit {
        return Err(body_too_large(limit));
    }
    String::from_utf8(bytes).map_err(|e| Reply::error(400, format!("Body is not UTF-8: {}", e)))
}

fn read_request(request: &mut Request) -> Result<ApiRequest, Reply> {
    if request.body_length().is_some_and(|len| len as u64 > MAX_BODY_BYTES) {
        return Err(body_too_large(MAX_BODY_BYTES));
    }

    let admin_token = request
        .headers()
        .iter()
        .find(|h| h.field.equiv(ADMIN_TOKEN_HEADER))
        .map(|h| h.value.as_str().to_string());
    let body = read_body(request.as_reader(), MAX_BODY_BYTES)?;

    Ok(ApiRequest {
        method: request.method().to_string(),
        url: request.url().to_string(),
        admin_token,
        body,
    })
}

fn respond(mut request: Request, state: &ApiState) -> std::io::Result<()> {
    let reply = match read_request(&mut request) {
        Ok(api_request) => state.handle(&api_request),
        Err(reply) => {
            debug!(status = reply.status, url = %request.url(), "rejected request body");
            reply
        }
    };

    let mut response = Response::from_string(reply.body).with_status_code(reply.status);
    if let Some(header) = json_header() {
        response = response.with_header(header);
    }
    request.respond(response)
}

/// Start the API server; blocks until the process is stopped
pub fn start_server(state: ApiState, host: &str, port: u16) -> std::io::Result<()> {
    let addr = format!("{}:{}", host, port);
    let server = Server::http(&addr).map_err(|e| std::io::Error::other(e.to_string()))?;

    info!(addr = %addr, "nestland API listening");
    eprintln!("\nNestland Command Center API on http://{}", addr);
    eprintln!("   Press Ctrl+C to stop\n");

    for request in server.incoming_requests() {
        if let Err(e) = respond(request, &state) {
            warn!(error = %e, "failed to answer request");
        }
    }

    Ok(())
}
