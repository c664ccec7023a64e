use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::net::{SocketAddr, IpAddr};
use std::default::Default;
use std::fmt::{Display, Formatter};

use clap::Parser;

use crate::error::{self, Context};
use crate::path::{metadata, normalize};

mod shape;

pub type Kdf = hkdf::Hkdf<sha3::Sha3_512>;

pub trait TryDefault: Sized {
    type Error;

    fn try_default() -> Result<Self, Self::Error>;
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// a config path or directory to load file from
    #[arg(long)]
    config: Vec<PathBuf>
}

pub fn get_config() -> error::Result<Config> {
    Config::from_args(CliArgs::parse())
}

#[derive(Debug)]
pub struct Config {
    pub settings: Settings,
    pub kdf: Kdf,
}

impl Config {
    pub fn from_args(args: CliArgs) -> error::Result<Self> {
        let cwd = std::env::current_dir()
            .context("failed to retrieve cwd for Settings")?;
        let mut settings = Settings::try_default()?;

        for config_path in args.config {
            let full = if config_path.is_absolute() {
                config_path
            } else {
                normalize(cwd.join(config_path))
            };

            tracing::debug!("loading config file \"{}\"", full.display());

            let loaded = Self::load_file(&full)?;
            let src = SrcFile::new(&full)?;
            let dot = DotPath::new(&"settings");

            settings.merge(&src, dot, loaded)?;
        }

        {
            let meta = metadata(&settings.assets).context(
                "failed to retrieve metadata for settings.assets"
            )?.context(
                "settings.assets does not exist"
            )?;

            if !meta.is_dir() {
                return Err(error::Error::new().context(
                    "settings.assets is not a directory"
                ));
            }
        }

        if settings.master_key.is_empty() {
            return Err(error::Error::new().context(
                "settings.master_key is required and must not be empty"
            ));
        }

        tracing::debug!("{settings:#?}");

        let kdf = hkdf::Hkdf::<sha3::Sha3_512>::new(None, settings.master_key.as_bytes());

        Ok(Config {
            settings,
            kdf
        })
    }

    fn load_file(path: &PathBuf) -> error::Result<shape::Settings> {
        let ext = path.extension().context(format!(
            "failed to retrieve the file extension for config file: \"{}\"", path.display()
        ))?;

        let ext = ext.to_ascii_lowercase();
        let file = std::fs::OpenOptions::new()
            .read(true)
            .open(path)
            .context(format!("failed to open config file: \"{}\"", path.display()))?;
        let reader = std::io::BufReader::new(file);

        if ext.eq("yaml") || ext.eq("yml") {
            serde_yaml::from_reader(reader).context(format!(
                "failed to parse yaml config file: \"{}\"", path.display()
            ))
        } else if ext.eq("json") {
            serde_json::from_reader(reader).context(format!(
                "failed to parse json config file: \"{}\"", path.display()
            ))
        } else {
            Err(error::Error::new().context(format!(
                "unknown type of config file: \"{}\"", path.display()
            )))
        }
    }
}

struct SrcFile<'a> {
    parent: &'a Path,
    src: &'a Path,
}

impl<'a> SrcFile<'a> {
    fn new(src: &'a Path) -> error::Result<Self> {
        let parent = src.parent().context(format!(
            "failed to retrieve parent path from source file \"{}\"", src.display()
        ))?;

        Ok(SrcFile {
            parent,
            src
        })
    }
}

impl<'a> Display for SrcFile<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\"", self.src.display())
    }
}

struct DotPath<'a>(Vec<&'a dyn Display>);

impl<'a> DotPath<'a> {
    fn new(name: &'a (dyn Display)) -> Self {
        DotPath(vec![name])
    }

    fn push(&self, name: &'a (dyn Display)) -> Self {
        let mut path = self.0.clone();
        path.push(name);

        DotPath(path)
    }
}

impl<'a> Display for DotPath<'a> {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;

        for name in &self.0 {
            if first {
                write!(fmt, "{name}")?;
                first = false;
            } else {
                write!(fmt, ".{name}")?;
            }
        }

        Ok(())
    }
}

#[derive(Debug)]
pub struct Settings {
    pub listener: SocketAddr,
    pub assets: PathBuf,
    pub master_key: String,
    pub sec: Sec,
    pub db: Db,
}

impl Settings {
    fn merge(&mut self, src: &SrcFile<'_>, dot: DotPath<'_>, settings: shape::Settings) -> error::Result<()> {
        if let Some(listener) = settings.listener {
            self.listener = match SocketAddr::from_str(&listener) {
                Ok(valid) => valid,
                Err(_) => match IpAddr::from_str(&listener) {
                    Ok(valid) => SocketAddr::from((valid, 8000)),
                    Err(_) => {
                        return Err(error::Error::new().context(format!(
                            "{dot}.listener invalid: \"{listener}\" file: {src}"
                        )));
                    }
                }
            };
        }

        if let Some(assets) = settings.assets {
            self.assets = check_path(assets, src, dot.push(&"assets"))?;
        }

        if let Some(master_key) = settings.master_key {
            self.master_key = master_key;
        }

        if let Some(sec) = settings.sec {
            self.sec.merge(src, dot.push(&"sec"), sec)?;
        }

        if let Some(db) = settings.db {
            self.db.merge(src, dot.push(&"db"), db)?;
        }

        Ok(())
    }
}

impl TryDefault for Settings {
    type Error = error::Error;

    fn try_default() -> Result<Self, Self::Error> {
        let cwd = std::env::current_dir()
            .context("failed to retrieve cwd for Settings")?;

        Ok(Settings {
            listener: SocketAddr::from(([0, 0, 0, 0], 8000)),
            assets: cwd.join("assets"),
            master_key: String::new(),
            sec: Sec::default(),
            db: Db::default(),
        })
    }
}

#[derive(Debug)]
pub struct Sec {
    pub session: Session,
    pub totp: Totp,
}

impl Sec {
    fn merge(&mut self, src: &SrcFile<'_>, dot: DotPath<'_>, sec: shape::Sec) -> error::Result<()> {
        if let Some(session) = sec.session {
            self.session.merge(src, dot.push(&"session"), session)?;
        }

        if let Some(totp) = sec.totp {
            self.totp.merge(src, dot.push(&"totp"), totp)?;
        }

        Ok(())
    }
}

impl Default for Sec {
    fn default() -> Self {
        Sec {
            session: Default::default(),
            totp: Default::default(),
        }
    }
}

#[derive(Debug)]
pub struct Session {
    pub secure: bool,
    pub domain: Option<String>,
}

impl Session {
    fn merge(&mut self, _src: &SrcFile<'_>, _dot: DotPath<'_>, session: shape::Session) -> error::Result<()> {
        if let Some(secure) = session.secure {
            self.secure = secure;
        }

        if let Some(domain) = session.domain {
            self.domain = Some(domain);
        }

        Ok(())
    }
}

impl Default for Session {
    fn default() -> Self {
        Session {
            secure: true,
            domain: None,
        }
    }
}

#[derive(Debug)]
pub struct Totp {
    pub issuer: String,
    pub grace_hours: u32,
}

impl Totp {
    fn merge(&mut self, _src: &SrcFile<'_>, dot: DotPath<'_>, totp: shape::Totp) -> error::Result<()> {
        if let Some(issuer) = totp.issuer {
            if issuer.is_empty() {
                return Err(error::Error::new().context(format!(
                    "{dot}.issuer must not be empty"
                )));
            }

            self.issuer = issuer;
        }

        if let Some(grace_hours) = totp.grace_hours {
            self.grace_hours = grace_hours;
        }

        Ok(())
    }
}

impl Default for Totp {
    fn default() -> Self {
        Totp {
            issuer: "TaskBook".into(),
            grace_hours: 24,
        }
    }
}

#[derive(Debug)]
pub struct Db {
    pub user: String,
    pub password: Option<String>,
    pub host: String,
    pub port: u16,
    pub dbname: String
}

impl Db {
    fn merge(&mut self, _src: &SrcFile<'_>, _dot: DotPath<'_>, db: shape::Db) -> error::Result<()> {
        if let Some(user) = db.user {
            self.user = user;
        }

        if let Some(password) = db.password {
            self.password = Some(password);
        }

        if let Some(host) = db.host {
            self.host = host;
        }

        if let Some(port) = db.port {
            self.port = port;
        }

        if let Some(dbname) = db.dbname {
            self.dbname = dbname;
        }

        Ok(())
    }
}

impl Default for Db {
    fn default() -> Self {
        Db {
            user: "postgres".into(),
            password: None,
            host: "localhost".into(),
            port: 5432,
            dbname: "taskbook".into(),
        }
    }
}

fn check_path(given: PathBuf, src: &SrcFile<'_>, dot: DotPath<'_>) -> error::Result<PathBuf> {
    let full = if given.is_absolute() {
        given
    } else {
        normalize(src.parent.join(given))
    };

    tracing::debug!("{dot} {src} checking {}", full.display());

    let meta = metadata(&full).context(format!(
        "{dot} failed to retrieve metadata for: {src}"
    ))?.context(format!(
        "{dot} {src} was not found"
    ))?;

    if !meta.is_dir() {
        return Err(error::Error::new().context(format!(
            "{dot} is not a directory in: {src}"
        )));
    }

    Ok(full)
}
