use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("tile byte {byte:#04x} at ({x},{y}) decodes to terrain class {class} (>= 48)")]
    CorruptTerrain { byte: u8, x: i32, y: i32, class: u8 },

    #[error("no defending unit at ({x},{y}) during attack resolution")]
    MissingDefender { x: i32, y: i32 },

    #[error("rule patch offset {0} does not address any table")]
    BadPatchOffset(usize),

    #[error("campaign bundle: {0}")]
    BadBundle(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
