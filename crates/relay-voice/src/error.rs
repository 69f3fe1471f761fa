use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("synthesis error: {0}")]
    Synthesis(String),

    #[error("transcode error: {0}")]
    Transcode(String),

    #[error("{stage} timed out after {secs} seconds")]
    Timeout { stage: &'static str, secs: u64 },
}
