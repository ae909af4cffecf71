//! Typed event sequence over a streamed run body.

use std::collections::VecDeque;

use ahf_client::{ByteStream, ClientError};
use ahf_schemas::DetailedAnalysis;
use futures_util::{Stream, StreamExt};

use crate::sse::{parse_frame, Frame, LineDecoder};

/// One agent status update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Backend agent identifier, e.g. `technical_analyst_agent`.
    pub agent: String,
    pub status: String,
    pub ticker: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Progress(ProgressEvent),
    Complete(DetailedAnalysis),
    /// Backend reported the run failed.
    Error(String),
}

struct Reader {
    body: ByteStream,
    decoder: LineDecoder,
    pending: VecDeque<StreamEvent>,
    finished: bool,
}

impl Reader {
    fn absorb(&mut self, line: &str) {
        if self.finished {
            return;
        }
        match parse_frame(line) {
            Some(Frame::Event(ev)) => self.pending.push_back(ev),
            Some(Frame::Done) => self.finished = true,
            None => {}
        }
    }
}

/// Decode `body` into events, strictly in arrival order.
///
/// The sequence ends at `[DONE]` or when the body closes. A transport error
/// is yielded once as `Err` and ends the sequence. Frames after `[DONE]`
/// are ignored.
pub fn event_stream(body: ByteStream) -> impl Stream<Item = Result<StreamEvent, ClientError>> + Send {
    let reader = Reader {
        body,
        decoder: LineDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    futures_util::stream::unfold(reader, |mut r| async move {
        loop {
            if let Some(ev) = r.pending.pop_front() {
                return Some((Ok(ev), r));
            }
            if r.finished {
                return None;
            }
            match r.body.next().await {
                Some(Ok(chunk)) => {
                    for line in r.decoder.push(&chunk) {
                        r.absorb(&line);
                    }
                }
                Some(Err(e)) => {
                    r.finished = true;
                    return Some((Err(e), r));
                }
                None => {
                    if let Some(line) = r.decoder.finish() {
                        r.absorb(&line);
                    }
                    r.finished = true;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn body(chunks: Vec<Result<&'static str, ClientError>>) -> ByteStream {
        futures_util::stream::iter(
            chunks
                .into_iter()
                .map(|c| c.map(|s| Bytes::from_static(s.as_bytes()))),
        )
        .boxed()
    }

    async fn collect(s: ByteStream) -> Vec<Result<StreamEvent, ClientError>> {
        event_stream(s).collect().await
    }

    #[tokio::test]
    async fn events_arrive_in_order_and_stop_at_done() {
        let out = collect(body(vec![
            Ok("data: {\"type\":\"progress\",\"agent\":\"a\",\"status\":\"Fetching\"}\n\ndata: {\"ty"),
            Ok("pe\":\"complete\",\"data\":{\"decisions\":{}}}\n\ndata: [DONE]\n\n"),
            Ok("data: {\"type\":\"progress\",\"agent\":\"late\",\"status\":\"x\"}\n"),
        ]))
        .await;

        assert_eq!(out.len(), 2);
        assert!(matches!(&out[0], Ok(StreamEvent::Progress(p)) if p.agent == "a"));
        assert!(matches!(&out[1], Ok(StreamEvent::Complete(_))));
    }

    #[tokio::test]
    async fn malformed_frames_do_not_abort_the_read() {
        let out = collect(body(vec![Ok(
            "data: {oops\n\ndata: {\"type\":\"progress\",\"agent\":\"b\",\"status\":\"Done\"}\n",
        )]))
        .await;
        assert_eq!(out.len(), 1);
    }

    #[tokio::test]
    async fn close_without_done_flushes_tail() {
        let out = collect(body(vec![Ok(
            "data: {\"type\":\"progress\",\"agent\":\"c\",\"status\":\"Done\"}",
        )]))
        .await;
        assert_eq!(out.len(), 1);
    }

    #[tokio::test]
    async fn transport_error_ends_sequence() {
        let out = collect(body(vec![
            Ok("data: {\"type\":\"progress\",\"agent\":\"d\",\"status\":\"x\"}\n"),
            Err(ClientError::Transport("reset".into())),
            Ok("data: [DONE]\n"),
        ]))
        .await;
        assert_eq!(out.len(), 2);
        assert!(out[1].is_err());
    }
}
