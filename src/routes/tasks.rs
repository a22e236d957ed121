use crate::{
    auth::AuthenticatedUserId,
    error::AppError,
    models::{
        task::StatsRow, BulkAction, BulkRequest, Task, TaskInput, TaskListResponse, TaskQuery,
        TaskStats, TaskStatus,
    },
};
use actix_web::{delete, get, patch, post, put, web, HttpResponse, Responder};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// The column list shared by every query that returns full task rows.
const TASK_COLUMNS: &str =
    "id, title, description, priority, status, completed, due_date, created_at, updated_at, user_id";

/// Builds the WHERE clause for the task list from the active filters.
///
/// `$1` is always the owning user id; filter parameters are numbered from `$2`
/// in the order status, priority, completed, search. Callers must bind values
/// in that same order.
fn filter_clause(query: &TaskQuery) -> String {
    let mut sql = String::from("WHERE user_id = $1");
    let mut param = 2;

    if query.status.is_some() {
        sql.push_str(&format!(" AND status = ${}", param));
        param += 1;
    }
    if query.priority.is_some() {
        sql.push_str(&format!(" AND priority = ${}", param));
        param += 1;
    }
    if query.completed.is_some() {
        sql.push_str(&format!(" AND completed = ${}", param));
        param += 1;
    }
    if query.search.is_some() {
        sql.push_str(&format!(
            " AND (title ILIKE ${} OR description ILIKE ${})",
            param,
            param + 1
        ));
    }

    sql
}

/// Retrieves a paginated list of tasks for the authenticated user.
///
/// ## Query Parameters:
/// - `status` (optional): filter by workflow status (e.g. "backlog", "in_progress", "done").
/// - `priority` (optional): filter by priority ("low", "medium", "high").
/// - `completed` (optional): filter by completion (`true`/`false`).
/// - `search` (optional): case-insensitive match against titles and descriptions.
/// - `sort` (optional): `created_at` (default), `due_date`, `priority`, or `title`.
/// - `order` (optional): `asc` or `desc` (default).
/// - `page` (optional): 1-based page number, default 1.
/// - `limit` (optional): page size, default 10, capped at 100.
///
/// ## Responses:
/// - `200 OK`: `{count, total, page, pages, tasks}`.
/// - `401 Unauthorized`: missing or invalid token.
/// - `500 Internal Server Error`: database errors.
#[get("")]
pub async fn get_tasks(
    pool: web::Data<PgPool>,
    user_id: AuthenticatedUserId,
    query_params: web::Query<TaskQuery>,
) -> Result<impl Responder, AppError> {
    let filter = filter_clause(&query_params);
    let search_pattern = query_params
        .search
        .as_ref()
        .map(|s| format!("%{}%", s));

    let count_sql = format!("SELECT COUNT(*) FROM tasks {}", filter);
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(user_id.0);
    if let Some(status) = query_params.status {
        count_query = count_query.bind(status);
    }
    if let Some(priority) = query_params.priority {
        count_query = count_query.bind(priority);
    }
    if let Some(completed) = query_params.completed {
        count_query = count_query.bind(completed);
    }
    if let Some(pattern) = &search_pattern {
        count_query = count_query.bind(pattern).bind(pattern);
    }
    let total = count_query.fetch_one(&**pool).await?;

    // Sort column/order come from a whitelist and limit/offset are clamped
    // integers, so interpolating them cannot inject SQL.
    let list_sql = format!(
        "SELECT {} FROM tasks {} ORDER BY {} {} LIMIT {} OFFSET {}",
        TASK_COLUMNS,
        filter,
        query_params.sort_column(),
        query_params.sort_order(),
        query_params.limit(),
        query_params.offset(),
    );
    let mut list_query = sqlx::query_as::<_, Task>(&list_sql).bind(user_id.0);
    if let Some(status) = query_params.status {
        list_query = list_query.bind(status);
    }
    if let Some(priority) = query_params.priority {
        list_query = list_query.bind(priority);
    }
    if let Some(completed) = query_params.completed {
        list_query = list_query.bind(completed);
    }
    if let Some(pattern) = &search_pattern {
        list_query = list_query.bind(pattern).bind(pattern);
    }
    let tasks = list_query.fetch_all(&**pool).await?;

    let limit = query_params.limit();
    let pages = (total + limit - 1) / limit;

    Ok(HttpResponse::Ok().json(TaskListResponse {
        count: tasks.len(),
        total,
        page: query_params.page(),
        pages,
        tasks,
    }))
}

/// Creates a new task for the authenticated user.
///
/// Priority defaults to `medium` and status to `backlog` when omitted. The
/// owner is always the authenticated user.
///
/// ## Responses:
/// - `201 Created`: the new `Task`.
/// - `400 Bad Request`: validation failure (e.g. title over 100 characters).
/// - `401 Unauthorized`: missing or invalid token.
#[post("")]
pub async fn create_task(
    pool: web::Data<PgPool>,
    user_id: AuthenticatedUserId,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    let sql = format!(
        "INSERT INTO tasks (id, title, description, priority, status, due_date, user_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING {}",
        TASK_COLUMNS
    );
    let task = sqlx::query_as::<_, Task>(&sql)
        .bind(Uuid::new_v4())
        .bind(&task_data.title)
        .bind(&task_data.description)
        .bind(task_data.priority_or_default())
        .bind(task_data.status_or_default())
        .bind(task_data.due_date)
        .bind(user_id.0)
        .fetch_one(&**pool)
        .await?;

    Ok(HttpResponse::Created().json(task))
}

/// Retrieves a specific task by its ID.
///
/// A task owned by another user is indistinguishable from a missing one: both
/// return 404.
#[get("/{id}")]
pub async fn get_task(
    pool: web::Data<PgPool>,
    user_id: AuthenticatedUserId,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let sql = format!(
        "SELECT {} FROM tasks WHERE id = $1 AND user_id = $2",
        TASK_COLUMNS
    );
    let task = sqlx::query_as::<_, Task>(&sql)
        .bind(task_id.into_inner())
        .bind(user_id.0)
        .fetch_optional(&**pool)
        .await?;

    match task {
        Some(task) => Ok(HttpResponse::Ok().json(task)),
        None => Err(AppError::NotFound("Task not found".into())),
    }
}

/// Fully updates a task owned by the authenticated user.
///
/// This is a PUT: omitted optional fields fall back to their defaults
/// (priority `medium`, status `backlog`, no description, no due date).
/// `updated_at` is bumped on every successful update.
///
/// ## Responses:
/// - `200 OK`: the updated `Task`.
/// - `400 Bad Request`: validation failure.
/// - `404 Not Found`: task missing or owned by another user.
#[put("/{id}")]
pub async fn update_task(
    pool: web::Data<PgPool>,
    user_id: AuthenticatedUserId,
    task_id: web::Path<Uuid>,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    let sql = format!(
        "UPDATE tasks
         SET title = $1, description = $2, priority = $3, status = $4, due_date = $5,
             updated_at = now()
         WHERE id = $6 AND user_id = $7
         RETURNING {}",
        TASK_COLUMNS
    );
    let task = sqlx::query_as::<_, Task>(&sql)
        .bind(&task_data.title)
        .bind(&task_data.description)
        .bind(task_data.priority_or_default())
        .bind(task_data.status_or_default())
        .bind(task_data.due_date)
        .bind(task_id.into_inner())
        .bind(user_id.0)
        .fetch_optional(&**pool)
        .await?;

    match task {
        Some(task) => Ok(HttpResponse::Ok().json(task)),
        None => Err(AppError::NotFound("Task not found".into())),
    }
}

/// Deletes a task owned by the authenticated user.
#[delete("/{id}")]
pub async fn delete_task(
    pool: web::Data<PgPool>,
    user_id: AuthenticatedUserId,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
        .bind(task_id.into_inner())
        .bind(user_id.0)
        .execute(&**pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Task not found".into()));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Task deleted successfully"
    })))
}

/// Toggles a task's completion.
///
/// A done task reopens as `todo`; any other status moves to `done`. The
/// `completed` flag follows automatically since it is generated from status.
#[patch("/{id}/toggle")]
pub async fn toggle_task(
    pool: web::Data<PgPool>,
    user_id: AuthenticatedUserId,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task_uuid = task_id.into_inner();

    let status = sqlx::query_scalar::<_, TaskStatus>(
        "SELECT status FROM tasks WHERE id = $1 AND user_id = $2",
    )
    .bind(task_uuid)
    .bind(user_id.0)
    .fetch_optional(&**pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

    let sql = format!(
        "UPDATE tasks SET status = $1, updated_at = now()
         WHERE id = $2 AND user_id = $3
         RETURNING {}",
        TASK_COLUMNS
    );
    let task = sqlx::query_as::<_, Task>(&sql)
        .bind(status.toggled())
        .bind(task_uuid)
        .bind(user_id.0)
        .fetch_one(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(task))
}

/// Duplicates a task owned by the authenticated user.
///
/// Copies title (with a " (Copy)" suffix), description, priority, and due
/// date. The copy always starts fresh in `backlog`.
#[post("/{id}/duplicate")]
pub async fn duplicate_task(
    pool: web::Data<PgPool>,
    user_id: AuthenticatedUserId,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let select_sql = format!(
        "SELECT {} FROM tasks WHERE id = $1 AND user_id = $2",
        TASK_COLUMNS
    );
    let original = sqlx::query_as::<_, Task>(&select_sql)
        .bind(task_id.into_inner())
        .bind(user_id.0)
        .fetch_optional(&**pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

    let insert_sql = format!(
        "INSERT INTO tasks (id, title, description, priority, status, due_date, user_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING {}",
        TASK_COLUMNS
    );
    let duplicate = sqlx::query_as::<_, Task>(&insert_sql)
        .bind(Uuid::new_v4())
        .bind(format!("{} (Copy)", original.title))
        .bind(&original.description)
        .bind(original.priority)
        .bind(TaskStatus::Backlog)
        .bind(original.due_date)
        .bind(user_id.0)
        .fetch_one(&**pool)
        .await?;

    Ok(HttpResponse::Created().json(duplicate))
}

/// Applies one mutation across a list of task ids.
///
/// Supported actions: `updateStatus` (requires `data.status`),
/// `updatePriority` (requires `data.priority`), and `delete`. Ids not owned by
/// the caller are skipped; the response reports how many rows were affected.
#[put("/bulk")]
pub async fn bulk_operations(
    pool: web::Data<PgPool>,
    user_id: AuthenticatedUserId,
    bulk_data: web::Json<BulkRequest>,
) -> Result<impl Responder, AppError> {
    bulk_data.validate()?;

    let affected_count = match bulk_data.action {
        BulkAction::UpdateStatus => {
            let status = bulk_data
                .data
                .as_ref()
                .and_then(|d| d.status)
                .ok_or_else(|| {
                    AppError::BadRequest("Status is required for updateStatus action".into())
                })?;

            sqlx::query(
                "UPDATE tasks SET status = $1, updated_at = now()
                 WHERE id = ANY($2) AND user_id = $3",
            )
            .bind(status)
            .bind(&bulk_data.task_ids)
            .bind(user_id.0)
            .execute(&**pool)
            .await?
            .rows_affected()
        }
        BulkAction::UpdatePriority => {
            let priority = bulk_data
                .data
                .as_ref()
                .and_then(|d| d.priority)
                .ok_or_else(|| {
                    AppError::BadRequest("Priority is required for updatePriority action".into())
                })?;

            sqlx::query(
                "UPDATE tasks SET priority = $1, updated_at = now()
                 WHERE id = ANY($2) AND user_id = $3",
            )
            .bind(priority)
            .bind(&bulk_data.task_ids)
            .bind(user_id.0)
            .execute(&**pool)
            .await?
            .rows_affected()
        }
        BulkAction::Delete => sqlx::query("DELETE FROM tasks WHERE id = ANY($1) AND user_id = $2")
            .bind(&bulk_data.task_ids)
            .bind(user_id.0)
            .execute(&**pool)
            .await?
            .rows_affected(),
    };

    Ok(HttpResponse::Ok().json(json!({
        "message": "Bulk operation completed",
        "affected_count": affected_count
    })))
}

/// Aggregate task statistics for the authenticated user.
///
/// Returns totals, completion and overdue counts, a per-priority breakdown,
/// and a completion rate percentage. `completed + pending == total` holds for
/// any task set.
#[get("/stats")]
pub async fn get_stats(
    pool: web::Data<PgPool>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let row = sqlx::query_as::<_, StatsRow>(
        "SELECT COUNT(*) AS total,
                COUNT(*) FILTER (WHERE completed) AS completed,
                COUNT(*) FILTER (WHERE NOT completed) AS pending,
                COUNT(*) FILTER (WHERE NOT completed
                                 AND due_date IS NOT NULL
                                 AND due_date < now()) AS overdue,
                COUNT(*) FILTER (WHERE priority = 'low') AS low_priority,
                COUNT(*) FILTER (WHERE priority = 'medium') AS medium_priority,
                COUNT(*) FILTER (WHERE priority = 'high') AS high_priority
         FROM tasks WHERE user_id = $1",
    )
    .bind(user_id.0)
    .fetch_one(&**pool)
    .await?;

    Ok(HttpResponse::Ok().json(TaskStats::from(row)))
}

/// Incomplete tasks whose due date has passed, soonest first.
#[get("/overdue")]
pub async fn get_overdue_tasks(
    pool: web::Data<PgPool>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let sql = format!(
        "SELECT {} FROM tasks
         WHERE user_id = $1 AND NOT completed
           AND due_date IS NOT NULL AND due_date < now()
         ORDER BY due_date ASC",
        TASK_COLUMNS
    );
    let tasks = sqlx::query_as::<_, Task>(&sql)
        .bind(user_id.0)
        .fetch_all(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "count": tasks.len(),
        "tasks": tasks
    })))
}

#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    /// Look-ahead window in days, default 7, clamped to `0..=3650`.
    pub days: Option<i64>,
}

impl UpcomingQuery {
    /// Ten years. Anything longer is no meaningful look-ahead, and unclamped
    /// values would push the date arithmetic below out of chrono's range.
    const MAX_DAYS: i64 = 3650;

    pub fn days(&self) -> i64 {
        self.days.unwrap_or(7).clamp(0, Self::MAX_DAYS)
    }
}

/// Incomplete tasks due within the next `days` days (default 7), soonest first.
#[get("/upcoming")]
pub async fn get_upcoming_tasks(
    pool: web::Data<PgPool>,
    user_id: AuthenticatedUserId,
    query: web::Query<UpcomingQuery>,
) -> Result<impl Responder, AppError> {
    let days = query.days();
    let now = Utc::now();
    let until = now + chrono::Duration::days(days);

    let sql = format!(
        "SELECT {} FROM tasks
         WHERE user_id = $1 AND NOT completed
           AND due_date IS NOT NULL AND due_date >= $2 AND due_date <= $3
         ORDER BY due_date ASC",
        TASK_COLUMNS
    );
    let tasks = sqlx::query_as::<_, Task>(&sql)
        .bind(user_id.0)
        .bind(now)
        .bind(until)
        .fetch_all(&**pool)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "count": tasks.len(),
        "days": days,
        "tasks": tasks
    })))
}
