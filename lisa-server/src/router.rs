use lisa_net::{Reply, Request};
use lisa_storage::QueueSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The reply is set; stop routing.
    Finished,
    /// Not this handler's request; try the next one.
    Declined,
}

/// A validated request plus the storage session lent by the worker.
pub struct RequestContext<'a> {
    pub request: &'a Request,
    /// Percent-decoded, absolute, traversal-free path.
    pub path: &'a str,
    pub session: &'a mut dyn QueueSession,
}

pub trait Handler: Send + Sync {
    fn handle(&self, ctx: &mut RequestContext<'_>, reply: &mut Reply) -> Outcome;
}

#[derive(Default)]
pub struct Router {
    handlers: Vec<Box<dyn Handler>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handler(mut self, handler: impl Handler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    /// Offers the request to each handler in registration order.
    pub fn route(&self, ctx: &mut RequestContext<'_>, reply: &mut Reply) -> Outcome {
        for handler in &self.handlers {
            if handler.handle(ctx, reply) == Outcome::Finished {
                return Outcome::Finished;
            }
        }
        Outcome::Declined
    }
}
