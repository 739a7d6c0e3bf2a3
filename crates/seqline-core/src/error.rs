pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid event stream JSON: {0}")]
    EventJson(#[source] serde_json::Error),

    #[error("Invalid event at index {position}: {message}")]
    InvalidEvent { position: usize, message: String },

    #[error("Invalid config JSON: {message}")]
    InvalidConfigJson { message: String },

    #[error("Invalid config override `{assignment}`: expected <dotted.key>=<json or text>")]
    InvalidConfigOverride { assignment: String },
}
