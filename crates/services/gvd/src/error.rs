#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] gv_config::error::Error),

    #[error(transparent)]
    Store(#[from] gv_store::error::Error),

    #[error(transparent)]
    Web(#[from] gv_web::error::Error),

    #[error(transparent)]
    TaskJoin(#[from] tokio::task::JoinError),
}
