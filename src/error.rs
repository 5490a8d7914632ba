use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Model deserialization error: {0}")]
    Deserialization(#[from] bincode::Error),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Landmark set has {found} points, at least {expected} required")]
    TooFewLandmarks { expected: usize, found: usize },

    #[error("Face detector error: {0}")]
    Detector(String),

    #[error("Video source error: {0}")]
    Video(String),

    #[error("Alarm playback error: {0}")]
    Alarm(String),
}

pub type Result<T> = std::result::Result<T, Error>;
