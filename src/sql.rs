use tokio_postgres::{Error as PgError};
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;

pub type ParamsVec<'a> = Vec<&'a (dyn ToSql + Sync)>;
pub type ParamsArray<'a, const N: usize> = [&'a (dyn ToSql + Sync); N];

pub fn push_param<'a, T>(params: &mut ParamsVec<'a>, v: &'a T) -> usize
where
    T: ToSql + Sync
{
    params.push(v);
    params.len()
}

pub fn unique_constraint_error(error: &PgError) -> Option<&str> {
    let Some(db_error) = error.as_db_error() else {
        return None;
    };

    if *db_error.code() == SqlState::UNIQUE_VIOLATION {
        db_error.constraint()
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn push_param_returns_placeholder_index() {
        let first = 1i64;
        let second = "title";
        let mut params: ParamsVec<'_> = Vec::new();

        assert_eq!(push_param(&mut params, &first), 1);
        assert_eq!(push_param(&mut params, &second), 2);
        assert_eq!(params.len(), 2);
    }
}
