pub mod auth;
pub mod health;
pub mod tasks;

use actix_web::web;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(auth::register)
            .service(auth::login)
            .service(auth::me)
            .service(auth::update_profile)
            .service(auth::change_password)
            .service(auth::logout),
    )
    .service(
        // Fixed-path routes must be registered before the `/{id}` matchers.
        web::scope("/tasks")
            .service(tasks::get_stats)
            .service(tasks::get_overdue_tasks)
            .service(tasks::get_upcoming_tasks)
            .service(tasks::bulk_operations)
            .service(tasks::get_tasks)
            .service(tasks::create_task)
            .service(tasks::get_task)
            .service(tasks::update_task)
            .service(tasks::delete_task)
            .service(tasks::toggle_task)
            .service(tasks::duplicate_task),
    );
}
