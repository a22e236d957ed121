pub mod task;
pub mod user;

pub use task::{
    BulkAction, BulkRequest, Task, TaskInput, TaskListResponse, TaskPriority, TaskQuery,
    TaskStats, TaskStatus,
};
pub use user::{User, UserResponse};
