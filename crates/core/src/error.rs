use thiserror::Error;

/// The three kinds `spec.md` §4.1 requires `URL::parse`/`join` to distinguish.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidUrl {
    #[error("unsupported scheme: {0}")]
    Scheme(String),
    #[error("missing or invalid host: {0}")]
    Host(String),
    #[error("invalid port: {0}")]
    Port(String),
}

/// Why a scheduler tick declined to keep processing a URL. One structured
/// log line is emitted per variant (see `crawler-core`'s callers); the
/// document store and frontier are never touched once this is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("transient transport failure: {0}")]
    TransientExhausted(String),
    #[error("fatal transport failure: {0}")]
    FatalTransport(String),
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("robots disallow")]
    RobotsDisallow,
    #[error("x-robots-tag: nofollow")]
    NofollowHeader,
    #[error("content-type is not text/html")]
    WrongContentType,
    #[error("content-language is not de/en")]
    WrongContentLanguage,
    #[error("already in document store")]
    AlreadyStored,
    #[error("empty or unparseable document")]
    ParseFailure,
    #[error("detected language {0} is not de/en")]
    WrongLanguage(String),
    #[error("redirected to a different host, re-enqueued")]
    CrossHostRedirect,
}

/// Crate-boundary error taxonomy, in the shape of the teacher's
/// `CrawlError`: one variant per failure kind, `thiserror` interpolation,
/// an `Other` escape hatch for call sites that only need `anyhow::Result`.
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] InvalidUrl),

    #[error("store error: {0}")]
    Store(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("snapshot error: {0}")]
    Snapshot(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}
