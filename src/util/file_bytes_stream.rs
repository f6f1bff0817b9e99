use std::{
    cmp::min,
    io::{Error as IoError, SeekFrom},
    mem::MaybeUninit,
    pin::Pin,
    task::{Context, Poll},
};

use futures_util::stream::Stream;
use hyper::body::Bytes;
use tokio::{
    fs::File,
    io::{AsyncRead, AsyncSeek, ReadBuf},
};

use crate::range::ByteRange;

/// Largest chunk produced per poll.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Wraps an `AsyncRead`, like a tokio `File`, and implements a stream of `Bytes`s.
///
/// The stream never reads more than `limit` bytes in total, even if the underlying file has grown
/// since it was opened. Each poll reads at most one chunk, so a slow consumer slows the reads.
#[derive(Debug)]
pub struct FileBytesStream<F = File> {
    file: F,
    buf: Box<[MaybeUninit<u8>; CHUNK_SIZE]>,
    remaining: u64,
}

impl<F> FileBytesStream<F> {
    /// Create a new stream from the given file, reading up to `limit` bytes.
    pub fn new(file: F, limit: u64) -> Self {
        Self {
            file,
            buf: Box::new([MaybeUninit::uninit(); CHUNK_SIZE]),
            remaining: limit,
        }
    }

    /// Bytes left to read before the stream ends.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl<F> Stream for FileBytesStream<F>
where
    F: AsyncRead + Unpin,
{
    type Item = Result<Bytes, IoError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context) -> Poll<Option<Self::Item>> {
        let Self {
            ref mut file,
            ref mut buf,
            ref mut remaining,
        } = *self;

        if *remaining == 0 {
            return Poll::Ready(None);
        }

        let max_read_length = min(*remaining, buf.len() as u64) as usize;
        let mut read_buf = ReadBuf::uninit(&mut buf[..max_read_length]);
        match Pin::new(file).poll_read(cx, &mut read_buf) {
            Poll::Ready(Ok(())) => {
                let filled = read_buf.filled();
                *remaining -= filled.len() as u64;
                if filled.is_empty() {
                    // The file shrank underneath us; end early rather than spin.
                    *remaining = 0;
                    Poll::Ready(None)
                } else {
                    Poll::Ready(Some(Ok(Bytes::copy_from_slice(filled))))
                }
            }
            Poll::Ready(Err(e)) => Poll::Ready(Some(Err(e))),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum FileSeekState {
    NeedSeek,
    Seeking,
    Reading,
}

/// Wraps an `AsyncRead + AsyncSeek`, like a tokio `File`, and implements a stream of `Bytes`s
/// reading exactly the window given by `range`.
#[derive(Debug)]
pub struct FileBytesStreamRange<F = File> {
    file_stream: FileBytesStream<F>,
    seek_state: FileSeekState,
    start_offset: u64,
}

impl<F> FileBytesStreamRange<F> {
    /// Create a new stream from the given file and range.
    pub fn new(file: F, range: ByteRange) -> Self {
        Self {
            file_stream: FileBytesStream::new(file, range.length()),
            seek_state: FileSeekState::NeedSeek,
            start_offset: range.start,
        }
    }

    /// Bytes left to read before the stream ends.
    pub fn remaining(&self) -> u64 {
        self.file_stream.remaining()
    }
}

impl<F> Stream for FileBytesStreamRange<F>
where
    F: AsyncRead + AsyncSeek + Unpin,
{
    type Item = Result<Bytes, IoError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context) -> Poll<Option<Self::Item>> {
        let Self {
            ref mut file_stream,
            ref mut seek_state,
            start_offset,
        } = *self;
        if *seek_state == FileSeekState::NeedSeek {
            *seek_state = FileSeekState::Seeking;
            if let Err(e) =
                Pin::new(&mut file_stream.file).start_seek(SeekFrom::Start(start_offset))
            {
                return Poll::Ready(Some(Err(e)));
            }
        }
        if *seek_state == FileSeekState::Seeking {
            match Pin::new(&mut file_stream.file).poll_complete(cx) {
                Poll::Ready(Ok(..)) => *seek_state = FileSeekState::Reading,
                Poll::Ready(Err(e)) => return Poll::Ready(Some(Err(e))),
                Poll::Pending => return Poll::Pending,
            }
        }
        Pin::new(file_stream).poll_next(cx)
    }
}
