use std::{
    io::Error as IoError,
    pin::Pin,
    task::{ready, Context, Poll},
};

use futures_util::stream::Stream;
use hyper::body::{Bytes, Frame, SizeHint};
use tokio::{
    fs::File,
    io::{AsyncRead, AsyncSeek},
};

use crate::util::{FileBytesStream, FileBytesStreamRange};

/// Hyper Body implementation for the various types of responses used in static serving.
///
/// Dropping the body drops the file handle it streams from.
#[derive(Debug)]
pub enum Body<F = File> {
    /// No response body.
    Empty,
    /// A small in-memory body, such as a JSON error. Taken on first poll.
    Buffered(Option<Bytes>),
    /// Serve a complete file.
    Full(FileBytesStream<F>),
    /// Serve a range from a file.
    Range(FileBytesStreamRange<F>),
}

impl<F> Body<F> {
    /// A body holding the given bytes.
    pub fn buffered(bytes: impl Into<Bytes>) -> Self {
        Body::Buffered(Some(bytes.into()))
    }
}

impl<F> hyper::body::Body for Body<F>
where
    F: AsyncRead + AsyncSeek + Unpin,
{
    type Data = Bytes;
    type Error = IoError;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, IoError>>> {
        let opt = ready!(match *self {
            Body::Empty => return Poll::Ready(None),
            Body::Buffered(ref mut bytes) => {
                return Poll::Ready(bytes.take().map(|b| Ok(Frame::data(b))))
            }
            Body::Full(ref mut stream) => Pin::new(stream).poll_next(cx),
            Body::Range(ref mut stream) => Pin::new(stream).poll_next(cx),
        });
        Poll::Ready(opt.map(|res| res.map(Frame::data)))
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Body::Empty => true,
            Body::Buffered(bytes) => bytes.is_none(),
            Body::Full(stream) => stream.remaining() == 0,
            Body::Range(stream) => stream.remaining() == 0,
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            Body::Empty => SizeHint::with_exact(0),
            Body::Buffered(bytes) => {
                SizeHint::with_exact(bytes.as_ref().map_or(0, |b| b.len() as u64))
            }
            // A full stream may end early if the file shrank, so only an upper bound is known.
            Body::Full(stream) => {
                let mut hint = SizeHint::new();
                hint.set_upper(stream.remaining());
                hint
            }
            Body::Range(stream) => {
                let mut hint = SizeHint::new();
                hint.set_upper(stream.remaining());
                hint
            }
        }
    }
}
