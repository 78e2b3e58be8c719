//! Sequential handler pipeline.
//!
//! Each handler receives the previous handler's output and decides whether
//! the pipeline continues. An error stops the pipeline and is returned.

use stash_core::{BoxFuture, StashResult};
use std::future::Future;
use tracing::debug;

/// Whether the pipeline moves on to the next handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    Continue,
    Break,
}

/// A boxed pipeline step.
pub type FlowHandler<P> = Box<dyn Fn(P) -> BoxFuture<'static, (P, FlowControl)> + Send + Sync>;

/// An ordered list of handlers over params of type `P`.
pub struct Flow<P> {
    handlers: Vec<FlowHandler<P>>,
}

impl<P> Default for Flow<P> {
    fn default() -> Self {
        Self { handlers: Vec::new() }
    }
}

impl<P: Send + 'static> Flow<P> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler.
    #[must_use]
    pub fn then<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StashResult<(P, FlowControl)>> + Send + 'static,
    {
        let boxed: FlowHandler<P> =
            Box::new(move |params: P| -> BoxFuture<'static, (P, FlowControl)> { Box::pin(handler(params)) });
        self.handlers.push(boxed);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Runs the handlers in order.
    ///
    /// Returns `None` for an empty pipeline, otherwise the output of the
    /// last handler that ran.
    pub async fn run(&self, params: P) -> StashResult<Option<P>> {
        run_flow(&self.handlers, params).await
    }
}

/// Feeds `params` through `handlers`, stopping after the first
/// [`FlowControl::Break`].
pub async fn run_flow<P>(handlers: &[FlowHandler<P>], params: P) -> StashResult<Option<P>> {
    if handlers.is_empty() {
        return Ok(None);
    }

    let mut current = params;
    for (step, handler) in handlers.iter().enumerate() {
        let (output, control) = handler(current).await?;
        current = output;
        if control == FlowControl::Break {
            debug!(step, "Flow stopped early");
            break;
        }
    }
    Ok(Some(current))
}
