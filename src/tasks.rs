use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use futures::pin_mut;
use tokio_postgres::{Error as PgError, Row};
use deadpool_postgres::GenericClient;

use taskbook_api::tasks::{Priority, UpdateTask};

use crate::sql;

pub fn priority_from_sql(v: i16) -> Option<Priority> {
    match v {
        0 => Some(Priority::High),
        1 => Some(Priority::Medium),
        2 => Some(Priority::Low),
        _ => None
    }
}

pub fn priority_to_sql(priority: &Priority) -> i16 {
    match priority {
        Priority::High => 0,
        Priority::Medium => 1,
        Priority::Low => 2,
    }
}

#[derive(Debug)]
pub struct Task {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub created: DateTime<Utc>,
    pub due: DateTime<Utc>,
    pub priority: Priority,
    pub completed: bool,
}

pub struct CreateParams {
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub due: DateTime<Utc>,
    pub priority: Priority,
}

impl Task {
    fn from_row(row: Row) -> Task {
        Task {
            id: row.get(0),
            user_id: row.get(1),
            title: row.get(2),
            description: row.get(3),
            created: row.get(4),
            due: row.get(5),
            priority: priority_from_sql(row.get(6))
                .expect("invalid priority returned from database for task"),
            completed: row.get(7),
        }
    }

    pub async fn retrieve(
        conn: &impl GenericClient,
        id: &i64,
    ) -> Result<Option<Task>, PgError> {
        if let Some(row) = conn.query_opt(
            "\
            select tasks.id, \
                   tasks.user_id, \
                   tasks.title, \
                   tasks.description, \
                   tasks.created, \
                   tasks.due, \
                   tasks.priority, \
                   tasks.completed \
            from tasks \
            where tasks.id = $1",
            &[id]
        ).await? {
            Ok(Some(Task::from_row(row)))
        } else {
            Ok(None)
        }
    }

    /// Open work sorts ahead of finished work, nearest deadline first.
    pub async fn query_for_user(
        conn: &impl GenericClient,
        user_id: &i64,
    ) -> Result<Vec<Task>, PgError> {
        let params: sql::ParamsArray<'_, 1> = [user_id];

        let stream = conn.query_raw(
            "\
            select tasks.id, \
                   tasks.user_id, \
                   tasks.title, \
                   tasks.description, \
                   tasks.created, \
                   tasks.due, \
                   tasks.priority, \
                   tasks.completed \
            from tasks \
            where tasks.user_id = $1 \
            order by tasks.completed, \
                     tasks.due",
            params
        ).await?;

        pin_mut!(stream);

        let mut rtn = Vec::new();

        while let Some(row) = stream.try_next().await? {
            rtn.push(Task::from_row(row));
        }

        Ok(rtn)
    }

    pub async fn create(
        conn: &impl GenericClient,
        params: CreateParams,
    ) -> Result<Task, PgError> {
        let completed = false;
        let priority = priority_to_sql(&params.priority);

        let row = conn.query_one(
            "\
            insert into tasks (user_id, title, description, due, priority, completed) values \
            ($1, $2, $3, $4, $5, $6) \
            returning id, created",
            &[
                &params.user_id,
                &params.title,
                &params.description,
                &params.due,
                &priority,
                &completed,
            ]
        ).await?;

        Ok(Task {
            id: row.get(0),
            user_id: params.user_id,
            title: params.title,
            description: params.description,
            created: row.get(1),
            due: params.due,
            priority: params.priority,
            completed,
        })
    }

    pub async fn update(
        &mut self,
        conn: &impl GenericClient,
        update: &UpdateTask,
    ) -> Result<(), PgError> {
        let mut params: sql::ParamsVec<'_> = vec![&self.id];
        let mut query = String::from("update tasks set");
        let mut first = true;

        macro_rules! set_field {
            ($name:literal, $value:expr) => {
                if !first {
                    query.push(',');
                }

                let index = sql::push_param(&mut params, $value);

                query.push_str(concat!(" ", $name, " = $"));
                query.push_str(&index.to_string());

                first = false;
            }
        }

        let priority = update.priority.as_ref().map(priority_to_sql);

        if let Some(title) = &update.title {
            set_field!("title", title);
        }

        if let Some(description) = &update.description {
            set_field!("description", description);
        }

        if let Some(due) = &update.due {
            set_field!("due", due);
        }

        if let Some(priority) = &priority {
            set_field!("priority", priority);
        }

        if let Some(completed) = &update.completed {
            set_field!("completed", completed);
        }

        if first {
            return Ok(());
        }

        query.push_str(" where id = $1");

        let _ = conn.execute(query.as_str(), params.as_slice()).await?;

        if let Some(title) = &update.title {
            self.title = title.clone();
        }

        if let Some(description) = &update.description {
            self.description = description.clone();
        }

        if let Some(due) = update.due {
            self.due = due;
        }

        if let Some(priority) = update.priority {
            self.priority = priority;
        }

        if let Some(completed) = update.completed {
            self.completed = completed;
        }

        Ok(())
    }

    pub async fn delete(&self, conn: &impl GenericClient) -> Result<(), PgError> {
        let _ = conn.execute(
            "delete from tasks where id = $1",
            &[&self.id]
        ).await?;

        Ok(())
    }

    pub fn into_api(self) -> taskbook_api::tasks::Task {
        taskbook_api::tasks::Task {
            id: self.id,
            title: self.title,
            description: self.description,
            created: self.created,
            due: self.due,
            priority: self.priority,
            completed: self.completed,
            user_id: self.user_id,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn priority_sql_mapping_round_trips() {
        for priority in [Priority::High, Priority::Medium, Priority::Low] {
            assert_eq!(priority_from_sql(priority_to_sql(&priority)), Some(priority));
        }

        assert_eq!(priority_from_sql(7), None);
    }
}
