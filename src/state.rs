use std::path::PathBuf;
use std::sync::Arc;

use deadpool_postgres::Pool;

use crate::error;
use crate::config;
use crate::db;
use crate::sec;

#[derive(Debug)]
pub struct Shared {
    assets: PathBuf,
    pool: Pool,
    sec: sec::state::Sec,
}

pub type ArcShared = Arc<Shared>;

impl Shared {
    pub fn from_config(config: &config::Config) -> error::Result<Shared> {
        tracing::debug!("creating Shared state");

        Ok(Shared {
            assets: config.settings.assets.clone(),
            pool: db::from_config(config)?,
            sec: sec::state::Sec::from_config(config)?,
        })
    }

    pub fn assets(&self) -> &PathBuf {
        &self.assets
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn sec(&self) -> &sec::state::Sec {
        &self.sec
    }
}

impl AsRef<Pool> for Shared {
    fn as_ref(&self) -> &Pool {
        &self.pool
    }
}

impl AsRef<sec::state::Sec> for Shared {
    fn as_ref(&self) -> &sec::state::Sec {
        &self.sec
    }
}
