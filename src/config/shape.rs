use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub listener: Option<String>,
    pub assets: Option<PathBuf>,
    pub master_key: Option<String>,
    pub sec: Option<Sec>,
    pub db: Option<Db>,
}

#[derive(Debug, Deserialize)]
pub struct Sec {
    pub session: Option<Session>,
    pub totp: Option<Totp>,
}

#[derive(Debug, Deserialize)]
pub struct Session {
    pub secure: Option<bool>,
    pub domain: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Totp {
    pub issuer: Option<String>,
    pub grace_hours: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct Db {
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dbname: Option<String>,
}
