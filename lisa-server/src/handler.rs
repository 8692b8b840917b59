use std::sync::Arc;

use lisa_net::{Reply, Request, StatusCode, decode_path};
use lisa_storage::QueueSession;

use crate::logger::Logger;
use crate::router::{Outcome, RequestContext, Router};

/// Validates the request path and dispatches through the router.
pub struct RequestHandler {
    router: Router,
    logger: Arc<dyn Logger>,
}

impl RequestHandler {
    pub fn new(router: Router, logger: Arc<dyn Logger>) -> Self {
        Self { router, logger }
    }

    pub fn handle_request(&self, request: &Request, session: &mut dyn QueueSession) -> Reply {
        let path = match decode_path(&request.uri) {
            Ok(path) => path,
            Err(err) => {
                self.logger
                    .debug(&format!("rejected request path {:?}: {err}", request.uri));
                return Reply::stock(StatusCode::BadRequest);
            }
        };

        let mut ctx = RequestContext {
            request,
            path: &path,
            session,
        };
        let mut reply = Reply::default();
        match self.router.route(&mut ctx, &mut reply) {
            Outcome::Finished => reply,
            Outcome::Declined => Reply::stock(StatusCode::NotImplemented),
        }
    }
}
