use axum::response::IntoResponse;
use tracing::Level;

pub use taskbook_api::error::{
    ApiErrorKind,
    AuthKind,
    GeneralKind,
    TaskKind,
    UserKind,
};

type BoxDynError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug)]
pub struct ApiError {
    inner: taskbook_api::ApiError,
    context: Option<String>,
    src: Option<BoxDynError>,
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn new() -> Self {
        ApiError {
            inner: Default::default(),
            context: None,
            src: None,
        }
    }

    pub fn api<T>(value: T) -> Self
    where
        T: Into<taskbook_api::ApiError>
    {
        ApiError {
            inner: value.into(),
            context: None,
            src: None,
        }
    }

    pub fn kind<K>(mut self, kind: K) -> Self
    where
        K: Into<ApiErrorKind>
    {
        self.inner = self.inner.with_kind(kind.into());
        self
    }

    pub fn context<C>(mut self, cxt: C) -> Self
    where
        C: Into<String>
    {
        self.context = Some(cxt.into());
        self
    }

    pub fn source<S>(mut self, src: S) -> Self
    where
        S: Into<BoxDynError>
    {
        self.src = Some(src.into());
        self
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.inner, &self.context, &self.src) {
            (inner, Some(cxt), Some(err)) => write!(f, "inner: {}\ncxt: {}\nerr: {:?}", inner, cxt, err),
            (inner, Some(cxt), None) => write!(f, "inner: {}\ncxt: {}", inner, cxt),
            (inner, None, Some(err)) => write!(f, "inner: {}\nerr: {:?}", inner, err),
            (inner, None, None) => write!(f, "inner: {}", inner)
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.src.as_ref().map(|v| & **v as _)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        if let Some(err) = self.src.as_ref() {
            tracing::event!(
                Level::ERROR,
                "unhandled error when processing request: {:#?}",
                err
            );
        }

        self.inner.into_response()
    }
}

impl From<taskbook_api::ApiError> for ApiError {
    fn from(api_err: taskbook_api::ApiError) -> Self {
        ApiError {
            inner: api_err,
            context: None,
            src: None,
        }
    }
}

impl From<ApiErrorKind> for ApiError {
    fn from(kind: ApiErrorKind) -> Self {
        ApiError::api(kind)
    }
}

impl From<AuthKind> for ApiError {
    fn from(kind: AuthKind) -> Self {
        ApiError::api(kind)
    }
}

impl From<GeneralKind> for ApiError {
    fn from(kind: GeneralKind) -> Self {
        ApiError::api(kind)
    }
}

impl From<UserKind> for ApiError {
    fn from(kind: UserKind) -> Self {
        ApiError::api(kind)
    }
}

impl From<TaskKind> for ApiError {
    fn from(kind: TaskKind) -> Self {
        ApiError::api(kind)
    }
}

impl From<std::convert::Infallible> for ApiError {
    fn from(_infallible: std::convert::Infallible) -> Self {
        // this should not happen
        ApiError::new()
            .source("Infallible. how did this happen")
    }
}

impl From<deadpool_postgres::PoolError> for ApiError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        use deadpool_postgres::PoolError;

        match err {
            PoolError::Backend(e) => Self::from(e),
            _ => ApiError::new().source(err)
        }
    }
}

impl From<tower::BoxError> for ApiError {
    fn from(err: tower::BoxError) -> Self {
        if err.is::<tower::timeout::error::Elapsed>() {
            ApiError::api(GeneralKind::Timeout)
        } else {
            ApiError::new().source(err)
        }
    }
}

macro_rules! simple_from {
    ($e:path) => {
        impl From<$e> for ApiError {
            fn from(err: $e) -> Self {
                ApiError::new()
                    .source(err)
            }
        }
    };
    ($e:path, $k:expr) => {
        impl From<$e> for ApiError {
            fn from(err: $e) -> Self {
                ApiError::new()
                    .kind($k)
                    .source(err)
            }
        }
    };
    ($e:path, $k:expr, $m:expr) => {
        impl From<$e> for ApiError {
            fn from(err: $e) -> Self {
                ApiError::new()
                    .kind($k)
                    .context($m)
                    .source(err)
            }
        }
    }
}

simple_from!(std::io::Error);
simple_from!(std::fmt::Error);

simple_from!(axum::Error);
simple_from!(axum::http::Error);
simple_from!(
    axum::http::header::ToStrError,
    GeneralKind::InvalidHeaderValue
);
simple_from!(
    axum::http::header::InvalidHeaderValue,
    GeneralKind::InvalidHeaderValue
);

simple_from!(tokio_postgres::Error);

simple_from!(serde_json::Error);

simple_from!(rand::Error);

simple_from!(argon2::Error);

// ----------------------------------------------------------------------------

pub trait Context<T, E> {
    fn context<C>(self, cxt: C) -> std::result::Result<T, ApiError>
    where
        C: Into<String>;

    fn kind<K>(self, kind: K) -> std::result::Result<T, ApiError>
    where
        K: Into<ApiErrorKind>;
}

impl<T, E> Context<T, E> for std::result::Result<T, E>
where
    E: Into<BoxDynError>
{
    fn context<C>(self, cxt: C) -> std::result::Result<T, ApiError>
    where
        C: Into<String>
    {
        match self {
            Ok(v) => Ok(v),
            Err(err) => Err(ApiError::new()
                .context(cxt)
                .source(err))
        }
    }

    fn kind<K>(self, kind: K) -> std::result::Result<T, ApiError>
    where
        K: Into<ApiErrorKind>
    {
        match self {
            Ok(v) => Ok(v),
            Err(err) => Err(ApiError::new()
                .kind(kind)
                .source(err))
        }
    }
}

impl<T> Context<T, ()> for std::option::Option<T> {
    fn context<C>(self, cxt: C) -> std::result::Result<T, ApiError>
    where
        C: Into<String>
    {
        match self {
            Some(v) => Ok(v),
            None => Err(ApiError::new()
                .context(cxt))
        }
    }

    fn kind<K>(self, kind: K) -> std::result::Result<T, ApiError>
    where
        K: Into<ApiErrorKind>
    {
        match self {
            Some(v) => Ok(v),
            None => Err(ApiError::new()
                .kind(kind))
        }
    }
}
