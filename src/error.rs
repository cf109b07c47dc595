//! Request-path error types.
//!
//! Everything that can go wrong between route match and the last byte of a
//! page funnels into [`SsrError`]. The dispatcher catches it once and hands
//! it to the fallback renderer, which needs a display name and a "stack" for
//! the 500 document; both are derived here from the error and its source
//! chain.

use std::error::Error as StdError;
use thiserror::Error;

/// Error type returned by page and endpoint code.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors raised while handling a request.
#[derive(Debug, Error)]
pub enum SsrError {
    /// The page's `preload` step failed.
    #[error("preload failed for route '{route}': {source}")]
    Preload {
        route: String,
        #[source]
        source: BoxError,
    },

    /// The page's `render` step failed.
    #[error("render failed for route '{route}': {source}")]
    Render {
        route: String,
        #[source]
        source: BoxError,
    },

    /// An endpoint handler failed.
    #[error("endpoint '{route}' failed on {method}: {source}")]
    Endpoint {
        route: String,
        method: String,
        #[source]
        source: BoxError,
    },

    /// A route was registered without a server module.
    #[error("no server module registered for route '{0}'")]
    MissingModule(String),

    /// The request body could not be read.
    #[error("failed to read request body: {0}")]
    Body(String),

    /// Page or endpoint code panicked.
    #[error("handler panicked: {0}")]
    Panic(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SsrError {
    /// Stable name shown as the title of the 500 page.
    pub fn name(&self) -> &'static str {
        match self {
            SsrError::Preload { .. } => "PreloadError",
            SsrError::Render { .. } => "RenderError",
            SsrError::Endpoint { .. } => "EndpointError",
            SsrError::MissingModule(_) => "MissingModuleError",
            SsrError::Body(_) => "BodyError",
            SsrError::Panic(_) => "PanicError",
            SsrError::Io(_) => "IoError",
        }
    }

    /// The innermost message: for wrapped page/endpoint errors this is the
    /// author's own message rather than our wrapper text.
    pub fn detail(&self) -> String {
        match self {
            SsrError::Preload { source, .. }
            | SsrError::Render { source, .. }
            | SsrError::Endpoint { source, .. } => source.to_string(),
            SsrError::Panic(message) => message.clone(),
            other => other.to_string(),
        }
    }

    /// Build a [`SsrError::Panic`] from a caught panic payload.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        SsrError::Panic(message)
    }

    /// Stack-like rendering: the first line repeats the message, each
    /// following line is one frame of the source chain.
    pub fn stack(&self) -> String {
        let mut lines = vec![format!("{}: {}", self.name(), self.detail())];
        lines.push(format!("    at {}", self));
        let mut current = self.source();
        while let Some(err) = current {
            lines.push(format!("    at {}", err));
            current = err.source();
        }
        lines.join("\n")
    }
}
