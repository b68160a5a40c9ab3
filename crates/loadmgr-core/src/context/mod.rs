use std::sync::Arc;

use loadmgr_model::Metadata;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::ContextError;

/// Cancellation scope plus request metadata, passed into every worker call.
///
/// Cloning is cheap; clones share the same token and metadata.
/// Metadata is immutable once attached: deriving a context copies it.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    token: CancellationToken,
    incoming: Option<Arc<Metadata>>,
    outgoing: Option<Arc<Metadata>>,
}

impl RunContext {
    /// Fresh context with its own token and no metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context driven by an existing token.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            ..Default::default()
        }
    }

    /// Attach metadata received from an upstream caller.
    pub fn with_incoming(mut self, md: Metadata) -> Self {
        self.incoming = Some(Arc::new(md));
        self
    }

    /// Attach metadata to forward to downstream calls.
    pub fn with_outgoing(mut self, md: Metadata) -> Self {
        self.outgoing = Some(Arc::new(md));
        self
    }

    #[inline]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel this context and every context derived from it with [`RunContext::child`].
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Resolves once the context is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub fn incoming(&self) -> Option<&Metadata> {
        self.incoming.as_deref()
    }

    pub fn outgoing(&self) -> Option<&Metadata> {
        self.outgoing.as_deref()
    }

    /// Nested scope: cancelled with the parent, cancellable on its own without touching the parent.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            incoming: self.incoming.clone(),
            outgoing: self.outgoing.clone(),
        }
    }

    /// Detached copy of the request metadata for background work.
    ///
    /// The incoming metadata is preferred, the outgoing metadata is the fallback; the copy becomes the outgoing metadata of a context whose token is independent of `self`.
    /// The returned token cancels the new context; cancelling `self` does not.
    pub fn derive_outgoing(&self) -> Result<(RunContext, CancellationToken), ContextError> {
        let md = self
            .incoming
            .as_deref()
            .or(self.outgoing.as_deref())
            .ok_or(ContextError::MissingMetadata)?;

        let token = CancellationToken::new();
        let ctx = RunContext {
            token: token.clone(),
            incoming: None,
            outgoing: Some(Arc::new(md.clone())),
        };
        trace!(entries = md.len(), "derived outgoing context");
        Ok((ctx, token))
    }
}
