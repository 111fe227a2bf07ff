//! Request/response ring transport.
//!
//! Only the start of the first request line matters: `GET <ring path>`
//! followed by a space, `?`, `/` or the end of the line rings the bell and is
//! answered `200 OK` with the ack token as the body. Whatever trails the path
//! is ignored. Every other line, malformed ones included, gets
//! `404 Not Found`.

use core::time::Duration;

use winnow::ascii::space1;
use winnow::combinator::{alt, eof};
use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::token::{literal, one_of};

use crate::config::ReceiverConfig;
use crate::hal::{RequestConnection, RequestServer};

use super::{AckReply, InboundEvent, InboundListener, RingSource, TransportError};

/// Longest request line inspected; the rest is truncated.
pub const MAX_REQUEST_LINE: usize = 128;

const HEADERS: &[u8] = b"Content-Type: text/plain\r\nConnection: close\r\n\r\n";
const NOT_FOUND_BODY: &[u8] = b"Not Found";

/// Matches `GET`, the ring path and one delimiter, leaving the rest unread.
fn ring_prefix<'i>(ring_path: &'static str) -> impl Parser<&'i [u8], (), ContextError> {
    move |input: &mut &'i [u8]| {
        literal("GET").parse_next(input)?;
        space1.parse_next(input)?;
        literal(ring_path).parse_next(input)?;
        alt((eof.void(), one_of([b' ', b'?', b'/', b'\r']).void())).parse_next(input)
    }
}

/// How a request line is answered.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Route {
    Ring,
    NotFound,
}

impl Route {
    #[must_use]
    pub fn resolve(line: &[u8], ring_path: &'static str) -> Self {
        let mut input = line;
        if ring_prefix(ring_path).parse_next(&mut input).is_ok() {
            Route::Ring
        } else {
            Route::NotFound
        }
    }

    const fn status_line(self) -> &'static [u8] {
        match self {
            Route::Ring => b"HTTP/1.1 200 OK\r\n",
            Route::NotFound => b"HTTP/1.1 404 Not Found\r\n",
        }
    }
}

/// Writes a complete `text/plain` response for `route`.
pub fn write_response<C: RequestConnection>(
    connection: &mut C,
    route: Route,
    ack_token: &[u8],
) -> Result<(), C::Error> {
    let body = match route {
        Route::Ring => ack_token,
        Route::NotFound => NOT_FOUND_BODY,
    };
    connection.write_all(route.status_line())?;
    connection.write_all(HEADERS)?;
    connection.write_all(body)?;
    connection.write_all(b"\r\n")
}

/// Serves one connection per poll on a [`RequestServer`].
#[derive(Debug)]
pub struct RequestListener<R> {
    server: R,
    ring_path: &'static str,
    ack_token: &'static [u8],
    read_timeout: Duration,
    linger: Duration,
}

impl<R> RequestListener<R>
where
    R: RequestServer,
{
    #[must_use]
    pub fn new(server: R, config: &ReceiverConfig) -> Self {
        Self {
            server,
            ring_path: config.ring_path,
            ack_token: config.ack_token,
            read_timeout: config.request_timeout,
            linger: config.response_linger,
        }
    }

    pub fn server(&self) -> &R {
        &self.server
    }

    pub fn server_mut(&mut self) -> &mut R {
        &mut self.server
    }
}

impl<R> InboundListener for RequestListener<R>
where
    R: RequestServer,
{
    fn poll(&mut self) -> Option<InboundEvent> {
        let mut connection = match self.server.try_accept() {
            Ok(Some(connection)) => connection,
            Ok(None) => return None,
            Err(_) => return Some(InboundEvent::Failed(TransportError::Accept)),
        };

        let mut line = [0_u8; MAX_REQUEST_LINE];
        let len = match connection.read_line(&mut line, self.read_timeout) {
            Ok(0) => {
                connection.close(Duration::ZERO);
                return Some(InboundEvent::TimedOut);
            }
            Ok(len) => len.min(line.len()),
            Err(_) => {
                connection.close(Duration::ZERO);
                return Some(InboundEvent::Failed(TransportError::Receive));
            }
        };

        let route = Route::resolve(&line[..len], self.ring_path);
        let written = write_response(&mut connection, route, self.ack_token).is_ok();
        connection.close(self.linger);

        Some(match (route, written) {
            (Route::Ring, true) => InboundEvent::Ring {
                source: RingSource::Request,
                ack: AckReply::Sent,
            },
            (Route::Ring, false) => InboundEvent::Ring {
                source: RingSource::Request,
                ack: AckReply::Failed,
            },
            (Route::NotFound, true) => InboundEvent::Rejected,
            (Route::NotFound, false) => InboundEvent::Failed(TransportError::Respond),
        })
    }

    fn rearm(&mut self) -> Result<(), TransportError> {
        self.server.rebind().map_err(|_| TransportError::Rebind)
    }
}
