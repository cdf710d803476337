//! Response body types
//!
//! Small in-memory bodies use `Full`; file content is streamed in bounded
//! chunks. A streamed body stops reading as soon as hyper drops it, which
//! happens when the client goes away.

use futures_util::stream::{Stream, TryStreamExt};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::{Bytes, Frame};
use hyper::Response;
use std::io::{self, SeekFrom};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use super::range::ByteRange;

/// Body type of every response
pub type ResponseBody = UnsyncBoxBody<Bytes, io::Error>;

pub type HttpResponse = Response<ResponseBody>;

/// Read size for streamed files
pub const CHUNK_SIZE: usize = 64 * 1024;

pub fn full(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

pub fn empty() -> ResponseBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Stream exactly `range` of `file`
pub async fn file_window(file: File, range: ByteRange) -> io::Result<ResponseBody> {
    file_window_guarded(file, range, ()).await
}

/// Stream exactly `range` of `file`, keeping `guard` alive until the body
/// is finished or dropped
pub async fn file_window_guarded<G>(
    mut file: File,
    range: ByteRange,
    guard: G,
) -> io::Result<ResponseBody>
where
    G: Send + Unpin + 'static,
{
    file.seek(SeekFrom::Start(range.start)).await?;
    let reader = ReaderStream::with_capacity(file.take(range.len()), CHUNK_SIZE);
    let stream = Guarded {
        inner: reader,
        _guard: guard,
    };
    Ok(StreamBody::new(stream.map_ok(Frame::data)).boxed_unsync())
}

/// Stream wrapper that owns a value for the lifetime of the stream
struct Guarded<S, G> {
    inner: S,
    _guard: G,
}

impl<S, G> Stream for Guarded<S, G>
where
    S: Stream + Unpin,
    G: Unpin,
{
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<S::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
