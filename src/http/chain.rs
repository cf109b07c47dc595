//! Handler chain.
//!
//! # Responsibilities
//! - Define the [`Handler`] middleware contract
//! - Compose an ordered list of handlers into one handler
//!
//! # Design Decisions
//! - A handler either owns the response (`Flow::Handled`) or passes control
//!   on (`Flow::Next`); there is no way to resume a handler after it passed
//! - Composition is a plain loop over the list, so stage N+1 never starts
//!   before stage N has returned
//! - An exhausted chain reports `Flow::Next`; the caller owns the fallback

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::SsrError;
use crate::http::request::SsrRequest;
use crate::http::response::SsrResponse;

/// What a handler did with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Continue with the next handler.
    Next,
    /// The response is complete; stop here.
    Handled,
}

/// A single middleware stage.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, req: &mut SsrRequest, res: &mut SsrResponse) -> Result<Flow, SsrError>;
}

/// Ordered composition of handlers, itself a [`Handler`].
#[derive(Clone, Default)]
pub struct Chain {
    handlers: Vec<Arc<dyn Handler>>,
}

impl Chain {
    pub fn new(handlers: Vec<Arc<dyn Handler>>) -> Self {
        Self { handlers }
    }

    /// Append a stage.
    pub fn with(mut self, handler: impl Handler + 'static) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[async_trait]
impl Handler for Chain {
    async fn handle(&self, req: &mut SsrRequest, res: &mut SsrResponse) -> Result<Flow, SsrError> {
        for handler in &self.handlers {
            if handler.handle(req, res).await? == Flow::Handled {
                return Ok(Flow::Handled);
            }
        }
        Ok(Flow::Next)
    }
}

/// Adapter turning a synchronous closure into a [`Handler`].
pub struct FnHandler<F>(F);

/// Wrap a closure as a handler, mostly for small endpoints.
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&mut SsrRequest, &mut SsrResponse) -> Result<Flow, SsrError> + Send + Sync,
{
    FnHandler(f)
}

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: Fn(&mut SsrRequest, &mut SsrResponse) -> Result<Flow, SsrError> + Send + Sync,
{
    async fn handle(&self, req: &mut SsrRequest, res: &mut SsrResponse) -> Result<Flow, SsrError> {
        (self.0)(req, res)
    }
}
