//! SQLite database with Diesel ORM
//!
//! Stores processes, their steps and transitions, and visitor comments.
//! Tables are created on open; deletes cascade explicitly inside a transaction.

use crate::schema::*;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

/// Walk up directory tree to find .nestland folder (like git finds .git)
/// Can be overridden with NESTLAND_DB_PATH env var
fn get_db_path() -> std::path::PathBuf {
    if let Ok(path) = std::env::var("NESTLAND_DB_PATH") {
        return std::path::PathBuf::from(path);
    }

    if let Ok(current_dir) = std::env::current_dir() {
        let mut dir = current_dir.as_path();
        loop {
            let nestland_dir = dir.join(".nestland");
            if nestland_dir.is_dir() {
                return nestland_dir.join("nestland.db");
            }
            match dir.parent() {
                Some(parent) => dir = parent,
                None => break,
            }
        }
    }

    // `nestland init` creates it here
    std::path::PathBuf::from(".nestland/nestland.db")
}

/// Current schema version
pub const CURRENT_SCHEMA: ProcessSchema = ProcessSchema {
    major: 1,
    minor: 1,
    patch: 0,
    name: "process-graph",
    features: &["processes", "steps", "transitions", "comments"],
};

/// Describes the version and capabilities of the schema
#[derive(Debug, Clone)]
pub struct ProcessSchema {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub name: &'static str,
    pub features: &'static [&'static str],
}

impl ProcessSchema {
    pub fn version_string(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl std::fmt::Display for ProcessSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{} ({})", self.version_string(), self.name)
    }
}

/// Turn a display name into a URL-safe slug.
///
/// Lowercase ASCII alphanumerics are kept, every other run of characters
/// collapses into a single `-`, and leading/trailing dashes are dropped.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// True for `[a-z0-9]+(-[a-z0-9]+)*`
pub fn is_url_safe_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Blank strings are stored as NULL
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// ============================================================================
// Diesel Models
// ============================================================================

/// Insertable schema version
#[derive(Insertable)]
#[diesel(table_name = schema_versions)]
pub struct NewSchemaVersion<'a> {
    pub version: &'a str,
    pub name: &'a str,
    pub features: &'a str,
    pub introduced_at: &'a str,
}

/// A named business workflow
#[derive(
    Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq, Serialize, Deserialize,
)]
#[diesel(table_name = processes)]
#[diesel(treat_none_as_null = true)]
pub struct Process {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// One stage of a process, placed by lane and order_index
#[derive(
    Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq, Serialize, Deserialize,
)]
#[diesel(table_name = steps)]
#[diesel(treat_none_as_null = true)]
pub struct Step {
    pub id: String,
    pub process_id: String,
    pub title: String,
    pub role: Option<String>,
    pub lane: Option<String>,
    pub order_index: Option<i32>,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A directed edge between two steps of the same process
#[derive(
    Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq, Serialize, Deserialize,
)]
#[diesel(table_name = transitions)]
#[diesel(treat_none_as_null = true)]
pub struct Transition {
    pub id: String,
    pub process_id: String,
    pub from_step_id: String,
    pub to_step_id: String,
    pub label: Option<String>,
    pub created_at: String,
}

/// Anonymous or admin annotation on a process or one of its steps
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = comments)]
pub struct Comment {
    pub id: String,
    pub created_at: String,
    pub process_slug: String,
    /// `None` means the comment is about the process as a whole
    pub step_id: Option<String>,
    pub body: String,
    pub status: String,
    /// `None` for anonymous visitors
    pub author: Option<String>,
}

impl Comment {
    /// Only the literal status `open` counts as open
    pub fn is_open(&self) -> bool {
        self.status == CommentStatus::Open.as_str()
    }
}

/// Comment lifecycle. `Open -> Resolved` is the only transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    Open,
    Resolved,
}

impl CommentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentStatus::Open => "open",
            CommentStatus::Resolved => "resolved",
        }
    }
}

impl std::fmt::Display for CommentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CommentStatus {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "open" => Ok(CommentStatus::Open),
            "resolved" => Ok(CommentStatus::Resolved),
            other => Err(DbError::Validation(format!(
                "Unknown comment status '{}' (expected open or resolved)",
                other
            ))),
        }
    }
}

// ============================================================================
// Mutation inputs
// ============================================================================

/// Fields for a new process. The slug is derived from the name when absent.
#[derive(Debug, Clone, Default)]
pub struct NewProcess<'a> {
    pub name: &'a str,
    pub slug: Option<&'a str>,
    pub description: Option<&'a str>,
    pub category: Option<&'a str>,
}

/// Partial update for a process; `None` leaves a field untouched,
/// `Some("")` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct ProcessChanges<'a> {
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub category: Option<&'a str>,
}

/// Fields for a new step
#[derive(Debug, Clone, Default)]
pub struct NewStep<'a> {
    pub title: &'a str,
    pub role: Option<&'a str>,
    pub lane: Option<&'a str>,
    pub order_index: Option<i32>,
    pub description: Option<&'a str>,
}

/// Partial update for a step, same conventions as [`ProcessChanges`]
#[derive(Debug, Clone, Default)]
pub struct StepChanges<'a> {
    pub title: Option<&'a str>,
    pub role: Option<&'a str>,
    pub lane: Option<&'a str>,
    pub order_index: Option<i32>,
    pub description: Option<&'a str>,
}

// ============================================================================
// Database Connection
// ============================================================================

type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub(crate) type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Database connection wrapper with connection pool
pub struct Database {
    pool: DbPool,
}

/// Error type for database operations
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Query error: {0}")]
    Query(#[from] diesel::result::Error),
    #[error("Pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Read side used by the graph loader and the HTTP API.
///
/// Implementations must be shareable across threads: steps and transitions
/// are fetched in parallel.
pub trait ProcessStore: Sync {
    fn list_processes(&self) -> Result<Vec<Process>>;
    fn process_by_slug(&self, slug: &str) -> Result<Option<Process>>;
    /// Steps ordered by order_index, then creation time
    fn steps_for(&self, process_id: &str) -> Result<Vec<Step>>;
    fn transitions_for(&self, process_id: &str) -> Result<Vec<Transition>>;
    /// Comments ordered by creation time
    fn comments_for(&self, process_slug: &str) -> Result<Vec<Comment>>;
    /// Steps with the given ids, whatever process they belong to
    fn steps_by_ids(&self, step_ids: &[String]) -> Result<Vec<Step>>;
}

/// Everything needed to render one process
#[derive(Debug, Clone, Serialize)]
pub struct ProcessSnapshot {
    pub process: Process,
    pub steps: Vec<Step>,
    pub transitions: Vec<Transition>,
    pub comments: Vec<Comment>,
}

impl Database {
    /// Get the database path that will be used
    pub fn db_path() -> std::path::PathBuf {
        get_db_path()
    }

    /// Open database at default path (respects NESTLAND_DB_PATH env var)
    pub fn open() -> Result<Self> {
        let path = get_db_path();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DbError::Connection(format!("{}: {}", parent.display(), e)))?;
            }
        }
        Self::open_at(&path)
    }

    /// Open database at specified path
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let manager = ConnectionManager::<SqliteConnection>::new(&path_str);
        let pool = Pool::builder()
            .max_size(5)
            .build(manager)
            .map_err(|e| DbError::Connection(e.to_string()))?;

        let db = Self { pool };
        db.init_schema()?;
        debug!(path = %path_str, "database opened");
        Ok(db)
    }

    pub(crate) fn get_conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    fn init_schema(&self) -> Result<()> {
        let mut conn = self.get_conn()?;

        diesel::sql_query(r#"
            CREATE TABLE IF NOT EXISTS schema_versions (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                version TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                features TEXT NOT NULL,
                introduced_at TEXT NOT NULL
            )
        "#).execute(&mut conn)?;

        diesel::sql_query(r#"
            CREATE TABLE IF NOT EXISTS processes (
                id TEXT PRIMARY KEY NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                description TEXT,
                category TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
        "#).execute(&mut conn)?;

        diesel::sql_query(r#"
            CREATE TABLE IF NOT EXISTS steps (
                id TEXT PRIMARY KEY NOT NULL,
                process_id TEXT NOT NULL,
                title TEXT NOT NULL,
                role TEXT,
                lane TEXT,
                order_index INTEGER,
                description TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (process_id) REFERENCES processes(id)
            )
        "#).execute(&mut conn)?;

        diesel::sql_query(r#"
            CREATE TABLE IF NOT EXISTS transitions (
                id TEXT PRIMARY KEY NOT NULL,
                process_id TEXT NOT NULL,
                from_step_id TEXT NOT NULL,
                to_step_id TEXT NOT NULL,
                label TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (process_id) REFERENCES processes(id),
                FOREIGN KEY (from_step_id) REFERENCES steps(id),
                FOREIGN KEY (to_step_id) REFERENCES steps(id)
            )
        "#).execute(&mut conn)?;

        diesel::sql_query(r#"
            CREATE TABLE IF NOT EXISTS comments (
                id TEXT PRIMARY KEY NOT NULL,
                created_at TEXT NOT NULL,
                process_slug TEXT NOT NULL,
                step_id TEXT,
                body TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'open',
                author TEXT
            )
        "#).execute(&mut conn)?;

        diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_steps_process ON steps(process_id)").execute(&mut conn)?;
        diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_transitions_process ON transitions(process_id)").execute(&mut conn)?;
        diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_comments_process ON comments(process_slug)").execute(&mut conn)?;
        diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_comments_step ON comments(step_id)").execute(&mut conn)?;

        self.register_schema(&mut conn, &CURRENT_SCHEMA)
    }

    fn register_schema(&self, conn: &mut DbConn, schema: &ProcessSchema) -> Result<()> {
        let now = chrono::Local::now().to_rfc3339();
        let features_json = serde_json::to_string(&schema.features).unwrap_or_default();

        let new_schema = NewSchemaVersion {
            version: &schema.version_string(),
            name: schema.name,
            features: &features_json,
            introduced_at: &now,
        };

        diesel::insert_or_ignore_into(schema_versions::table)
            .values(&new_schema)
            .execute(conn)?;

        Ok(())
    }

    // ========================================================================
    // Processes
    // ========================================================================

    /// Create a process. Slugs must be unique and URL-safe.
    pub fn create_process(&self, input: &NewProcess<'_>) -> Result<Process> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(DbError::Validation("Process name is required".to_string()));
        }

        let slug = match input.slug {
            Some(s) => s.trim().to_string(),
            None => slugify(name),
        };
        if !is_url_safe_slug(&slug) {
            return Err(DbError::Validation(format!(
                "Slug '{}' is not URL-safe (use lowercase letters, digits and single dashes)",
                slug
            )));
        }

        let mut conn = self.get_conn()?;
        let taken = processes::table
            .filter(processes::slug.eq(&slug))
            .count()
            .get_result::<i64>(&mut conn)?;
        if taken > 0 {
            return Err(DbError::Validation(format!("Process slug '{}' already exists", slug)));
        }

        let now = chrono::Local::now().to_rfc3339();
        let process = Process {
            id: Uuid::new_v4().to_string(),
            slug,
            name: name.to_string(),
            description: non_blank(input.description).map(str::to_string),
            category: non_blank(input.category).map(str::to_string),
            created_at: now.clone(),
            updated_at: now,
        };

        diesel::insert_into(processes::table)
            .values(&process)
            .execute(&mut conn)?;

        info!(process = %process.slug, id = %process.id, "process created");
        Ok(process)
    }

    /// Look up a process by slug, failing with `NotFound` when absent
    pub fn require_process(&self, slug: &str) -> Result<Process> {
        self.process_by_slug(slug)?
            .ok_or_else(|| DbError::NotFound(format!("Process '{}'", slug)))
    }

    /// Apply a partial update to a process
    pub fn update_process(&self, slug: &str, changes: &ProcessChanges<'_>) -> Result<Process> {
        let mut process = self.require_process(slug)?;

        if let Some(name) = changes.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(DbError::Validation("Process name is required".to_string()));
            }
            process.name = name.to_string();
        }
        if let Some(description) = changes.description {
            process.description = non_blank(Some(description)).map(str::to_string);
        }
        if let Some(category) = changes.category {
            process.category = non_blank(Some(category)).map(str::to_string);
        }
        process.updated_at = chrono::Local::now().to_rfc3339();

        let mut conn = self.get_conn()?;
        diesel::update(processes::table.filter(processes::id.eq(&process.id)))
            .set(&process)
            .execute(&mut conn)?;

        Ok(process)
    }

    /// Delete a process together with its steps, transitions and comments
    pub fn delete_process(&self, slug: &str) -> Result<()> {
        let process = self.require_process(slug)?;
        let mut conn = self.get_conn()?;

        conn.transaction::<_, DbError, _>(|conn| {
            diesel::delete(comments::table.filter(comments::process_slug.eq(&process.slug)))
                .execute(conn)?;
            diesel::delete(transitions::table.filter(transitions::process_id.eq(&process.id)))
                .execute(conn)?;
            diesel::delete(steps::table.filter(steps::process_id.eq(&process.id)))
                .execute(conn)?;
            diesel::delete(processes::table.filter(processes::id.eq(&process.id)))
                .execute(conn)?;
            Ok(())
        })?;

        info!(process = %process.slug, "process deleted");
        Ok(())
    }

    // ========================================================================
    // Steps
    // ========================================================================

    /// Add a step to the process identified by `slug`
    pub fn create_step(&self, slug: &str, input: &NewStep<'_>) -> Result<Step> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(DbError::Validation("Step title is required".to_string()));
        }
        let process = self.require_process(slug)?;
        let now = chrono::Local::now().to_rfc3339();

        let step = Step {
            id: Uuid::new_v4().to_string(),
            process_id: process.id,
            title: title.to_string(),
            role: non_blank(input.role).map(str::to_string),
            lane: non_blank(input.lane).map(str::to_string),
            order_index: input.order_index,
            description: non_blank(input.description).map(str::to_string),
            created_at: now.clone(),
            updated_at: now,
        };

        let mut conn = self.get_conn()?;
        diesel::insert_into(steps::table)
            .values(&step)
            .execute(&mut conn)?;

        debug!(process = %slug, step = %step.id, "step created");
        Ok(step)
    }

    /// Fetch one step by id
    pub fn get_step(&self, step_id: &str) -> Result<Step> {
        self.find_step(step_id)?
            .ok_or_else(|| DbError::NotFound(format!("Step '{}'", step_id)))
    }

    /// Like [`Database::get_step`], but a missing step is `Ok(None)`
    pub fn find_step(&self, step_id: &str) -> Result<Option<Step>> {
        let mut conn = self.get_conn()?;
        let step = steps::table
            .filter(steps::id.eq(step_id))
            .select(Step::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(step)
    }

    /// Apply a partial update to a step
    pub fn update_step(&self, step_id: &str, changes: &StepChanges<'_>) -> Result<Step> {
        let mut step = self.get_step(step_id)?;

        if let Some(title) = changes.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(DbError::Validation("Step title is required".to_string()));
            }
            step.title = title.to_string();
        }
        if let Some(role) = changes.role {
            step.role = non_blank(Some(role)).map(str::to_string);
        }
        if let Some(lane) = changes.lane {
            step.lane = non_blank(Some(lane)).map(str::to_string);
        }
        if let Some(order_index) = changes.order_index {
            step.order_index = Some(order_index);
        }
        if let Some(description) = changes.description {
            step.description = non_blank(Some(description)).map(str::to_string);
        }
        step.updated_at = chrono::Local::now().to_rfc3339();

        let mut conn = self.get_conn()?;
        diesel::update(steps::table.filter(steps::id.eq(&step.id)))
            .set(&step)
            .execute(&mut conn)?;

        Ok(step)
    }

    /// Delete a step along with transitions touching it and comments on it
    pub fn delete_step(&self, step_id: &str) -> Result<()> {
        let step = self.get_step(step_id)?;
        let mut conn = self.get_conn()?;

        conn.transaction::<_, DbError, _>(|conn| {
            diesel::delete(
                transitions::table.filter(
                    transitions::from_step_id
                        .eq(&step.id)
                        .or(transitions::to_step_id.eq(&step.id)),
                ),
            )
            .execute(conn)?;
            diesel::delete(comments::table.filter(comments::step_id.eq(&step.id)))
                .execute(conn)?;
            diesel::delete(steps::table.filter(steps::id.eq(&step.id))).execute(conn)?;
            Ok(())
        })?;

        debug!(step = %step.id, "step deleted");
        Ok(())
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Connect two steps of the same process
    pub fn create_transition(
        &self,
        slug: &str,
        from_step_id: &str,
        to_step_id: &str,
        label: Option<&str>,
    ) -> Result<Transition> {
        let process = self.require_process(slug)?;

        let from = self.find_step(from_step_id)?;
        let to = self.find_step(to_step_id)?;
        match (&from, &to) {
            (None, None) => {
                return Err(DbError::Validation(format!(
                    "Both steps {} and {} do not exist. Run 'nestland step list {}' to see existing steps.",
                    from_step_id, to_step_id, slug
                )))
            }
            (None, _) => {
                return Err(DbError::Validation(format!(
                    "Source step {} does not exist. Run 'nestland step list {}' to see existing steps.",
                    from_step_id, slug
                )))
            }
            (_, None) => {
                return Err(DbError::Validation(format!(
                    "Target step {} does not exist. Run 'nestland step list {}' to see existing steps.",
                    to_step_id, slug
                )))
            }
            (Some(f), Some(t)) => {
                if f.process_id != process.id || t.process_id != process.id {
                    return Err(DbError::Validation(format!(
                        "Transitions must connect steps of process '{}'",
                        slug
                    )));
                }
            }
        }

        let transition = Transition {
            id: Uuid::new_v4().to_string(),
            process_id: process.id,
            from_step_id: from_step_id.to_string(),
            to_step_id: to_step_id.to_string(),
            label: non_blank(label).map(str::to_string),
            created_at: chrono::Local::now().to_rfc3339(),
        };

        let mut conn = self.get_conn()?;
        diesel::insert_into(transitions::table)
            .values(&transition)
            .execute(&mut conn)?;

        Ok(transition)
    }

    /// Remove a transition
    pub fn delete_transition(&self, transition_id: &str) -> Result<()> {
        let mut conn = self.get_conn()?;
        let removed = diesel::delete(transitions::table.filter(transitions::id.eq(transition_id)))
            .execute(&mut conn)?;
        if removed == 0 {
            return Err(DbError::NotFound(format!("Transition '{}'", transition_id)));
        }
        Ok(())
    }

    // ========================================================================
    // Comments
    // ========================================================================

    /// Store a comment. `step_id`, if given, must belong to the process.
    pub fn create_comment(
        &self,
        slug: &str,
        step_id: Option<&str>,
        body: &str,
        author: Option<&str>,
    ) -> Result<Comment> {
        if body.trim().is_empty() {
            return Err(DbError::Validation("Comment body is required".to_string()));
        }
        let process = self.require_process(slug)?;
        self.add_comment(&process, step_id, body, author)
    }

    /// Store a comment on a process the caller already looked up
    pub fn add_comment(
        &self,
        process: &Process,
        step_id: Option<&str>,
        body: &str,
        author: Option<&str>,
    ) -> Result<Comment> {
        let body = body.trim();
        if body.is_empty() {
            return Err(DbError::Validation("Comment body is required".to_string()));
        }

        let step_id = non_blank(step_id);
        if let Some(id) = step_id {
            let step = self.get_step(id)?;
            if step.process_id != process.id {
                return Err(DbError::Validation(format!(
                    "Step {} does not belong to process '{}'",
                    id, process.slug
                )));
            }
        }

        let comment = Comment {
            id: Uuid::new_v4().to_string(),
            created_at: chrono::Local::now().to_rfc3339(),
            process_slug: process.slug.clone(),
            step_id: step_id.map(str::to_string),
            body: body.to_string(),
            status: CommentStatus::Open.as_str().to_string(),
            author: non_blank(author).map(str::to_string),
        };

        let mut conn = self.get_conn()?;
        diesel::insert_into(comments::table)
            .values(&comment)
            .execute(&mut conn)?;

        Ok(comment)
    }

    /// Mark a comment resolved. Returns `false` if it already was.
    pub fn resolve_comment(&self, comment_id: &str) -> Result<bool> {
        let mut conn = self.get_conn()?;

        let updated = diesel::update(
            comments::table
                .filter(comments::id.eq(comment_id))
                .filter(comments::status.eq(CommentStatus::Open.as_str())),
        )
        .set(comments::status.eq(CommentStatus::Resolved.as_str()))
        .execute(&mut conn)?;

        if updated > 0 {
            info!(comment = %comment_id, "comment resolved");
            return Ok(true);
        }

        let exists = comments::table
            .filter(comments::id.eq(comment_id))
            .count()
            .get_result::<i64>(&mut conn)?;
        if exists == 0 {
            return Err(DbError::NotFound(format!("Comment '{}'", comment_id)));
        }
        Ok(false)
    }

    /// Read the full snapshot of one process
    pub fn snapshot(&self, slug: &str) -> Result<ProcessSnapshot> {
        let process = self.require_process(slug)?;
        let steps = self.steps_for(&process.id)?;
        let transitions = self.transitions_for(&process.id)?;
        let comments = self.comments_for(&process.slug)?;
        Ok(ProcessSnapshot {
            process,
            steps,
            transitions,
            comments,
        })
    }
}

impl ProcessStore for Database {
    fn list_processes(&self) -> Result<Vec<Process>> {
        let mut conn = self.get_conn()?;
        let rows = processes::table
            .order((processes::name.asc(), processes::slug.asc()))
            .select(Process::as_select())
            .load(&mut conn)?;
        Ok(rows)
    }

    fn process_by_slug(&self, slug: &str) -> Result<Option<Process>> {
        let mut conn = self.get_conn()?;
        let process = processes::table
            .filter(processes::slug.eq(slug))
            .select(Process::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(process)
    }

    fn steps_for(&self, process_id: &str) -> Result<Vec<Step>> {
        let mut conn = self.get_conn()?;
        let rows = steps::table
            .filter(steps::process_id.eq(process_id))
            .order((steps::order_index.asc(), steps::created_at.asc()))
            .select(Step::as_select())
            .load(&mut conn)?;
        Ok(rows)
    }

    fn transitions_for(&self, process_id: &str) -> Result<Vec<Transition>> {
        let mut conn = self.get_conn()?;
        let rows = transitions::table
            .filter(transitions::process_id.eq(process_id))
            .order(transitions::created_at.asc())
            .select(Transition::as_select())
            .load(&mut conn)?;
        Ok(rows)
    }

    fn steps_by_ids(&self, step_ids: &[String]) -> Result<Vec<Step>> {
        if step_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.get_conn()?;
        let rows = steps::table
            .filter(steps::id.eq_any(step_ids))
            .select(Step::as_select())
            .load(&mut conn)?;
        Ok(rows)
    }

    fn comments_for(&self, process_slug: &str) -> Result<Vec<Comment>> {
        let mut conn = self.get_conn()?;
        let rows = comments::table
            .filter(comments::process_slug.eq(process_slug))
            .order(comments::created_at.asc())
            .select(Comment::as_select())
            .load(&mut conn)?;
        Ok(rows)
    }
}
