use axum::http::StatusCode;
use axum::extract::Path;
use axum::response::IntoResponse;
use serde::Deserialize;

use taskbook_api::{Payload, Validator};
use taskbook_api::tasks::{CreateTask, Priority, UpdateTask};

use crate::db::Conn;
use crate::error::{ApiError, ApiResult};
use crate::error::api::{AuthKind, TaskKind, Context};
use crate::sec::authn::initiator::Initiator;
use crate::tasks::{self, Task};

#[derive(Deserialize)]
pub struct TaskPath {
    task_id: i64,
}

pub async fn search(
    initiator: Initiator,
    Conn(conn): Conn,
) -> ApiResult<impl IntoResponse> {
    let found = Task::query_for_user(&conn, &initiator.user.id).await?;

    let rtn: Vec<taskbook_api::tasks::Task> = found.into_iter()
        .map(Task::into_api)
        .collect();

    Ok(Payload::new(rtn))
}

pub async fn create(
    initiator: Initiator,
    Conn(conn): Conn,
    axum::Json(json): axum::Json<CreateTask>,
) -> ApiResult<impl IntoResponse> {
    json.validate()?;

    let task = Task::create(&conn, tasks::CreateParams {
        user_id: initiator.user.id,
        title: json.title,
        description: json.description,
        due: json.due,
        priority: json.priority.unwrap_or(Priority::Medium),
    }).await?;

    Ok((
        StatusCode::CREATED,
        Payload::new(task.into_api())
    ))
}

async fn retrieve_owned(
    conn: &impl deadpool_postgres::GenericClient,
    initiator: &Initiator,
    task_id: &i64,
) -> ApiResult<Task> {
    let task = Task::retrieve(conn, task_id)
        .await?
        .kind(TaskKind::NotFound)?;

    if task.user_id != initiator.user.id {
        return Err(ApiError::api(AuthKind::PermissionDenied));
    }

    Ok(task)
}

pub async fn retrieve(
    initiator: Initiator,
    Conn(conn): Conn,
    Path(TaskPath { task_id }): Path<TaskPath>,
) -> ApiResult<impl IntoResponse> {
    let task = retrieve_owned(&conn, &initiator, &task_id).await?;

    Ok(Payload::new(task.into_api()))
}

pub async fn update(
    initiator: Initiator,
    Conn(conn): Conn,
    Path(TaskPath { task_id }): Path<TaskPath>,
    axum::Json(json): axum::Json<UpdateTask>,
) -> ApiResult<impl IntoResponse> {
    json.assert_ok()?;

    let mut task = retrieve_owned(&conn, &initiator, &task_id).await?;

    task.update(&conn, &json).await?;

    Ok(Payload::new(task.into_api()))
}

pub async fn delete(
    initiator: Initiator,
    Conn(conn): Conn,
    Path(TaskPath { task_id }): Path<TaskPath>,
) -> ApiResult<impl IntoResponse> {
    let task = retrieve_owned(&conn, &initiator, &task_id).await?;

    task.delete(&conn).await?;

    Ok(StatusCode::NO_CONTENT)
}
