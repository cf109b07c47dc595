//! Ordered emission of independently completing fragments.
//!
//! # Responsibilities
//! - Poll every slot future concurrently
//! - Write fragments strictly in declaration order
//! - Stop the body at the first failed slot
//!
//! # Design Decisions
//! - `FuturesOrdered` is the reorder buffer: a slot that resolves early is
//!   held until every slot before it has been yielded
//! - Literal text is a ready future, so skeleton bytes ahead of the first
//!   pending slot go out on the first poll

use bytes::Bytes;
use futures_util::future::{self, BoxFuture, FutureExt};
use futures_util::stream::{FuturesOrdered, StreamExt};
use std::sync::Arc;

use crate::error::SsrError;
use crate::http::response::BodyStream;

/// Failure of a slot; shared so every projection of one upstream failure
/// reports the same error.
pub type SlotError = Arc<SsrError>;

/// A pending slot value.
pub type SlotFuture = BoxFuture<'static, Result<String, SlotError>>;

type Fragment = BoxFuture<'static, Result<Bytes, SlotError>>;

/// Builder for an ordered fragment stream.
#[derive(Default)]
pub struct Sequencer {
    fragments: FuturesOrdered<Fragment>,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&mut self, text: String) {
        self.fragments
            .push_back(future::ready(Ok(Bytes::from(text))).boxed());
    }

    pub fn push_slot(&mut self, slot: SlotFuture) {
        self.fragments
            .push_back(slot.map(|value| value.map(Bytes::from)).boxed());
    }

    pub fn into_stream(self) -> BodyStream {
        self.fragments
            .scan(false, |failed, item| {
                if *failed {
                    return future::ready(None);
                }
                *failed = item.is_err();
                future::ready(Some(item))
            })
            .filter(|item| future::ready(!matches!(item, Ok(bytes) if bytes.is_empty())))
            .boxed()
    }
}
