//! Middleware pipeline — composable before/after request handler logic.
//!
//! Each middleware wraps the next layer, enabling request inspection,
//! short-circuit responses, and response decoration without coupling handlers
//! to infrastructure concerns. The response cache is one such layer.
//!
//! ## Core types
//!
//! - [`Middleware`] — trait implemented by all middleware.
//! - [`Next`] — cursor into the remaining middleware chain; call [`Next::run`] to
//!   advance to the next layer.
//! - [`MiddlewareHandler`] — type-erased, cheaply-cloneable middleware function.
//! - [`from_middleware`] — converts a [`Middleware`] into a [`MiddlewareHandler`].
//! - [`Pipeline`] — an ordered stack of middleware ending in a handler, plus the
//!   per-request capabilities the host offers.

use std::{future::Future, pin::Pin, sync::Arc};

use crate::{Request, Response, background::TaskQueue, context::Context};

/// A cursor into the remaining middleware chain for a single request.
///
/// `Next` is passed to each middleware's [`Middleware::handle`] implementation.
/// Calling [`Next::run`] advances the cursor by one position and invokes the next
/// middleware (or returns a fallback `500` response when the chain is exhausted
/// without any middleware generating a response).
///
/// `Next` is consumed on each call to [`run`](Self::run), so it cannot be called
/// more than once per middleware invocation.
pub struct Next {
    middlewares: Vec<MiddlewareHandler>,
    // Tracks which middleware to invoke on the next `run` call.
    index: usize,
}

/// A type-erased, reference-counted middleware function.
///
/// Every entry in the middleware stack is stored as a `MiddlewareHandler`.
/// The [`Arc`] wrapper makes handlers cheap to clone so that [`Next`] can
/// advance through the chain without copying closures.
pub type MiddlewareHandler = Arc<
    dyn Fn(Context, Next) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync + 'static,
>;

/// Converts a [`Middleware`] implementation into a [`MiddlewareHandler`].
pub fn from_middleware<M>(middleware: Arc<M>) -> MiddlewareHandler
where
    M: Middleware + 'static,
{
    Arc::new(move |ctx: Context, next: Next| middleware.handle(ctx, next))
}

impl Next {
    /// Creates a new `Next` positioned at the start of the given middleware stack.
    pub fn new(middlewares: Vec<MiddlewareHandler>) -> Self {
        Self {
            middlewares,
            index: 0,
        }
    }

    /// Invokes the next middleware in the chain and returns its response.
    ///
    /// If no handler remains, a `500 Internal Server Error` response is
    /// returned as a safe fallback.
    pub async fn run(mut self, ctx: Context) -> Response {
        if self.index < self.middlewares.len() {
            let handler = self.middlewares[self.index].clone();
            self.index += 1;
            handler(ctx, self).await
        } else {
            Response::new(crate::StatusCode::InternalServerError)
                .body("No response generated by middleware pipeline")
        }
    }
}

/// The core trait for all middleware.
///
/// Implementors receive a [`Context`] and a [`Next`] cursor. They may:
///
/// - **Pass through** — call `next.run(ctx).await` without modification.
/// - **Short-circuit** — return a [`Response`] directly without calling `next`.
/// - **Decorate** — call `next.run(ctx).await`, inspect the response, and return
///   a modified copy.
///
/// # Contract
///
/// - Implementations **must** be `Send + Sync` because middleware is shared across
///   Tokio tasks.
/// - `handle` **must** return a pinned, `Send` future so it can be awaited across
///   `.await` points in multi-threaded runtimes.
/// - Implementations **should not** hold `&mut` references to shared state across
///   an `.await` point.
pub trait Middleware: Send + Sync {
    /// Handle the request and optionally delegate to the next middleware.
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>>;
}

/// An ordered middleware stack terminated by a request handler.
///
/// `Pipeline` is the host side of the middleware contract: it builds the
/// [`Context`] for each request, attaches the capabilities it offers, and
/// drives the chain. When built with [`background`](Self::background), each
/// context carries a clone of the [`TaskQueue`] in its extensions.
///
/// Requests that reach the end of the chain without a handler get a `500`.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use response_cache::{Response, StatusCode};
/// use response_cache::background::TaskQueue;
/// use response_cache::cache::{CacheMiddleware, CacheOptions};
/// use response_cache::middleware::Pipeline;
///
/// let pipeline = Pipeline::new()
///     .layer(Arc::new(CacheMiddleware::new(CacheOptions::new().namespace("api"))))
///     .background(TaskQueue::new())
///     .handler(|_ctx| async { Response::new(StatusCode::Ok).body("hello") });
/// ```
#[derive(Default)]
pub struct Pipeline {
    middlewares: Vec<MiddlewareHandler>,
    handler: Option<MiddlewareHandler>,
    background: Option<TaskQueue>,
}

impl Pipeline {
    /// Creates an empty pipeline with no middleware, handler, or background queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware layer. Layers run in the order they are added.
    #[must_use]
    pub fn layer<M>(mut self, middleware: Arc<M>) -> Self
    where
        M: Middleware + 'static,
    {
        self.middlewares.push(from_middleware(middleware));
        self
    }

    /// Sets the handler that runs after every layer has passed the request on.
    #[must_use]
    pub fn handler<H, F>(mut self, handler: H) -> Self
    where
        H: Fn(Context) -> F + Send + Sync + 'static,
        F: Future<Output = Response> + Send + 'static,
    {
        let terminal: MiddlewareHandler = Arc::new(
            move |ctx: Context, _next: Next| -> Pin<Box<dyn Future<Output = Response> + Send>> {
                Box::pin(handler(ctx))
            },
        );
        self.handler = Some(terminal);
        self
    }

    /// Offers `queue` to every request as its after-response hook.
    #[must_use]
    pub fn background(mut self, queue: TaskQueue) -> Self {
        self.background = Some(queue);
        self
    }

    /// Runs `request` through every layer and the handler.
    pub async fn dispatch(&self, request: Request) -> Response {
        let mut ctx = Context::new(request);
        if let Some(queue) = &self.background {
            ctx.extensions_mut().insert(queue.clone());
        }

        let mut chain = self.middlewares.clone();
        chain.extend(self.handler.clone());
        Next::new(chain).run(ctx).await
    }
}
