//! Error types for the azaan streaming application

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Notification error: {0}")]
    Notify(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Audio subsystem errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open stream: {0}")]
    StreamError(String),
}

/// Encrypted transport errors
///
/// A transport error is terminal for the affected session; the streaming
/// loops never retry internally.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Invalid endpoint address: {0}")]
    InvalidAddress(String),

    #[error("Connection failed: {0}")]
    ConnectFailed(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Trust anchor error: {0}")]
    TrustAnchor(String),
}

/// Identity provider errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("API key is required")]
    MissingApiKey,

    #[error("No active session")]
    NoSession,

    #[error("Provider rejected request: {0}")]
    Rejected(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Group registry errors
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Project identifier is required")]
    MissingProjectId,

    #[error("Registry rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Malformed registry document: {0}")]
    Malformed(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Offline media errors
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Offline track not found for prayer: {0}")]
    NotFound(String),

    #[error("Failed to open audio output: {0}")]
    Output(String),

    #[error("Failed to decode media file: {0}")]
    Decode(String),
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
