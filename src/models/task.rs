use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Represents the priority of a task.
/// Corresponds to the `task_priority` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    /// Low priority.
    Low,
    /// Medium priority. The default for new tasks.
    Medium,
    /// High priority.
    High,
}

/// Represents the workflow status of a task.
/// Corresponds to the `task_status` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task has been captured but not yet scheduled. The default for new tasks.
    Backlog,
    /// Task is scheduled to be worked on.
    Todo,
    /// Task is currently being worked on.
    InProgress,
    /// Task is finished and awaiting review.
    Review,
    /// Task is completed.
    Done,
}

impl TaskStatus {
    /// A task is completed exactly when its status is `done`.
    pub fn is_done(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }

    /// The status a task moves to when its completion is toggled:
    /// a done task reopens as `todo`, any other status completes to `done`.
    pub fn toggled(&self) -> TaskStatus {
        if self.is_done() {
            TaskStatus::Todo
        } else {
            TaskStatus::Done
        }
    }
}

/// Input structure for creating or fully updating a task.
/// Contains validation rules for its fields.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    /// The title of the task. Must be between 1 and 100 characters.
    #[validate(length(min = 1, max = 100, message = "Title must be between 1 and 100 characters"))]
    pub title: String,

    /// An optional description, at most 500 characters.
    #[validate(length(max = 500, message = "Description cannot exceed 500 characters"))]
    pub description: Option<String>,

    /// The priority of the task. Defaults to `medium` when omitted.
    pub priority: Option<TaskPriority>,

    /// The workflow status of the task. Defaults to `backlog` when omitted.
    pub status: Option<TaskStatus>,

    /// Optional due date for the task.
    pub due_date: Option<DateTime<Utc>>,
}

impl TaskInput {
    pub fn priority_or_default(&self) -> TaskPriority {
        self.priority.unwrap_or(TaskPriority::Medium)
    }

    pub fn status_or_default(&self) -> TaskStatus {
        self.status.unwrap_or(TaskStatus::Backlog)
    }
}

/// Represents a task entity as stored in the database and returned by the API.
///
/// `completed` is a generated column in Postgres (`status = 'done'`), so the
/// reconciliation invariant holds on every row no matter which code path wrote it.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Task {
    /// Unique identifier for the task (UUID v4).
    pub id: Uuid,
    /// The title of the task.
    pub title: String,
    /// An optional description for the task.
    pub description: Option<String>,
    /// The priority of the task.
    pub priority: TaskPriority,
    /// The current workflow status of the task.
    pub status: TaskStatus,
    /// Whether the task is completed. Always equal to `status == done`.
    pub completed: bool,
    /// Optional due date for the task.
    pub due_date: Option<DateTime<Utc>>,
    /// Timestamp of when the task was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last update to the task.
    pub updated_at: DateTime<Utc>,
    /// Identifier of the user who owns the task.
    pub user_id: i32,
}

/// Query parameters for filtering, sorting, and paginating the task list.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskQuery {
    /// Filter tasks by workflow status.
    pub status: Option<TaskStatus>,
    /// Filter tasks by priority.
    pub priority: Option<TaskPriority>,
    /// Filter tasks by completion.
    pub completed: Option<bool>,
    /// Search term matched against title and description (case-insensitive).
    pub search: Option<String>,
    /// Sort column: one of `created_at`, `due_date`, `priority`, `title`.
    /// Anything else falls back to `created_at`.
    pub sort: Option<String>,
    /// Sort order: `asc` or `desc` (default).
    pub order: Option<String>,
    /// 1-based page number, default 1, capped at 1,000,000.
    pub page: Option<i64>,
    /// Page size, default 10, capped at 100.
    pub limit: Option<i64>,
}

impl TaskQuery {
    /// A million pages is far past any real task list; the cap keeps the
    /// offset arithmetic below from overflowing `i64`.
    const MAX_PAGE: i64 = 1_000_000;

    /// The sort column, restricted to a whitelist so query parameters can
    /// never inject arbitrary SQL into the ORDER BY clause.
    pub fn sort_column(&self) -> &'static str {
        match self.sort.as_deref() {
            Some("due_date") => "due_date",
            Some("priority") => "priority",
            Some("title") => "title",
            _ => "created_at",
        }
    }

    pub fn sort_order(&self) -> &'static str {
        match self.order.as_deref() {
            Some("asc") => "ASC",
            _ => "DESC",
        }
    }

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).clamp(1, Self::MAX_PAGE)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(10).clamp(1, 100)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }
}

/// Response envelope for the paginated task list.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskListResponse {
    /// Number of tasks in this page.
    pub count: usize,
    /// Total number of tasks matching the filters.
    pub total: i64,
    /// The 1-based page number.
    pub page: i64,
    /// Total number of pages.
    pub pages: i64,
    pub tasks: Vec<Task>,
}

/// The mutation applied by a bulk request.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    #[serde(rename = "updateStatus")]
    UpdateStatus,
    #[serde(rename = "updatePriority")]
    UpdatePriority,
    #[serde(rename = "delete")]
    Delete,
}

/// Payload carried by bulk actions that need a target value.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct BulkData {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
}

/// A single request applying one mutation across a list of task ids.
/// Ids not owned by the caller are skipped, not reported.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct BulkRequest {
    pub action: BulkAction,
    #[validate(length(min = 1, message = "At least one task ID is required"))]
    pub task_ids: Vec<Uuid>,
    pub data: Option<BulkData>,
}

/// Per-priority task counts inside [`TaskStats`].
#[derive(Debug, Serialize, Deserialize)]
pub struct PriorityBreakdown {
    pub low: i64,
    pub medium: i64,
    pub high: i64,
}

/// Aggregate task statistics for a single user.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskStats {
    pub total: i64,
    pub completed: i64,
    /// Tasks not yet completed. `completed + pending == total` always holds.
    pub pending: i64,
    /// Incomplete tasks whose due date is in the past.
    pub overdue: i64,
    pub by_priority: PriorityBreakdown,
    /// Percentage of completed tasks, rounded to two decimals. Zero when there
    /// are no tasks.
    pub completion_rate: f64,
}

/// Raw aggregation row fetched from Postgres, folded into [`TaskStats`].
#[derive(Debug, FromRow)]
pub struct StatsRow {
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
    pub overdue: i64,
    pub low_priority: i64,
    pub medium_priority: i64,
    pub high_priority: i64,
}

impl From<StatsRow> for TaskStats {
    fn from(row: StatsRow) -> Self {
        let completion_rate = if row.total > 0 {
            ((row.completed as f64 / row.total as f64) * 10000.0).round() / 100.0
        } else {
            0.0
        };
        Self {
            total: row.total,
            completed: row.completed,
            pending: row.pending,
            overdue: row.overdue,
            by_priority: PriorityBreakdown {
                low: row.low_priority,
                medium: row.medium_priority,
                high: row.high_priority,
            },
            completion_rate,
        }
    }
}
