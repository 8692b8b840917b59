use std::sync::Arc;

use lisa_net::{CONTENT_LENGTH, CONTENT_TYPE, FORM_MIME_TYPE, Header, Reply, StatusCode};
use lisa_storage::{QueueSession, StorageError, TakeOutcome, parse_priority};

use crate::logger::Logger;
use crate::router::{Handler, Outcome, RequestContext};

/// Bytes at the front of every POST body that precede the payload.
const POST_PREFIX_LEN: usize = 2;

/// The priority-queue handler.
///
/// `GET /` dequeues, `GET /spy` peeks, `GET /size` and `GET /count` report
/// the number of items, `POST /<priority>` enqueues. Atomicity of takes is
/// left entirely to the session's transaction.
pub struct QueueProcessor {
    logger: Arc<dyn Logger>,
}

impl QueueProcessor {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }

    fn get(&self, action: &str, session: &mut dyn QueueSession) -> Reply {
        let remove = match action {
            "size" | "count" => return self.count(session),
            "" => true,
            "spy" => false,
            _ => return Reply::stock(StatusCode::BadRequest),
        };

        let taken = self.transaction(session, |session| {
            session.take(remove)?.ok_or(StorageError::NoResultRow)
        });
        match taken {
            Ok(TakeOutcome::Found(payload)) => content_reply(payload),
            Ok(TakeOutcome::Empty) => Reply::stock(StatusCode::NotFound),
            Err(err) => self.failure(&err),
        }
    }

    fn count(&self, session: &mut dyn QueueSession) -> Reply {
        match session.count() {
            Ok(count) => content_reply(count.to_string().into_bytes()),
            Err(err) => self.failure(&err),
        }
    }

    fn post(&self, action: &str, body: &[u8], session: &mut dyn QueueSession) -> Reply {
        if body.len() <= POST_PREFIX_LEN {
            return Reply::stock(StatusCode::BadRequest);
        }
        let payload = &body[POST_PREFIX_LEN..];
        let raw_priority = if action.is_empty() { "0" } else { action };

        let inserted = self.transaction(session, |session| {
            let priority = parse_priority(raw_priority)?;
            session.insert(priority, payload)
        });
        match inserted {
            Ok(_) => content_reply(Vec::new()),
            Err(err) => self.failure(&err),
        }
    }

    /// Runs `op` between `begin` and `commit`. Any error rolls back; a failed
    /// rollback is logged on its own and the original error is returned.
    fn transaction<T, F>(&self, session: &mut dyn QueueSession, op: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut dyn QueueSession) -> Result<T, StorageError>,
    {
        session.begin()?;
        let result = op(&mut *session).and_then(|value| {
            session.commit()?;
            Ok(value)
        });
        if result.is_err() {
            if let Err(rollback_err) = session.rollback() {
                self.logger
                    .error(&format!("queue rollback failed: {rollback_err}"));
            }
        }
        result
    }

    fn failure(&self, err: &StorageError) -> Reply {
        self.logger.error(&format!("queue operation failed: {err}"));
        Reply::stock(StatusCode::InternalServerError)
    }
}

impl Handler for QueueProcessor {
    fn handle(&self, ctx: &mut RequestContext<'_>, reply: &mut Reply) -> Outcome {
        let action = ctx.path.strip_prefix('/').unwrap_or(ctx.path);
        *reply = match ctx.request.method.as_str() {
            "GET" => self.get(action, ctx.session),
            "POST" => self.post(action, &ctx.request.body, ctx.session),
            _ => Reply::stock(StatusCode::MethodNotAllowed),
        };
        Outcome::Finished
    }
}

fn content_reply(body: Vec<u8>) -> Reply {
    let mut reply = Reply {
        body,
        ..Reply::default()
    };
    finish_content(&mut reply);
    reply
}

/// Stamps the framing headers on a successful reply and marks it OK.
pub fn finish_content(reply: &mut Reply) {
    reply
        .headers
        .push(Header::new(CONTENT_LENGTH, reply.body.len().to_string()));
    reply.headers.push(Header::new(CONTENT_TYPE, FORM_MIME_TYPE));
    reply.status = StatusCode::Ok;
}
