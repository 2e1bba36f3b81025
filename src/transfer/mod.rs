//! Byte sources and local file transfer helpers.
//!
//! A [`ByteSource`] is either a fully buffered body or a stream with a
//! caller-declared length. Streams of unknown length are not representable:
//! the length travels with the stream and is checked when it is consumed.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use md5::{Digest, Md5};
use std::io;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

/// Size of the chunks read from local files.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Boxed stream of body chunks.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// Body of an object or part upload.
pub enum ByteSource {
    /// In-memory content.
    Bytes(Bytes),
    /// Streamed content of a declared length.
    Stream {
        /// The chunks.
        stream: ByteStream,
        /// Total number of bytes the stream yields.
        length: u64,
    },
}

impl ByteSource {
    /// Wrap a stream whose total length is known up front.
    pub fn from_stream<S>(stream: S, length: u64) -> Self
    where
        S: futures::Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        ByteSource::Stream {
            stream: stream.boxed(),
            length,
        }
    }

    /// Open a local file as a streamed source.
    pub async fn from_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = tokio::fs::File::open(path.as_ref()).await?;
        let length = file.metadata().await?.len();
        Ok(ByteSource::Stream {
            stream: read_chunks(file, DEFAULT_CHUNK_SIZE),
            length,
        })
    }

    /// Byte count of the body, as declared or as buffered.
    pub fn len(&self) -> u64 {
        match self {
            ByteSource::Bytes(bytes) => bytes.len() as u64,
            ByteSource::Stream { length, .. } => *length,
        }
    }

    /// Returns true if the body holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true for streamed sources.
    pub fn is_stream(&self) -> bool {
        matches!(self, ByteSource::Stream { .. })
    }

    /// Buffer the whole body.
    ///
    /// A stream that yields more or fewer bytes than declared fails with
    /// `InvalidData`.
    pub async fn collect(self) -> io::Result<Bytes> {
        match self {
            ByteSource::Bytes(bytes) => Ok(bytes),
            ByteSource::Stream { stream, length } => {
                let capacity = usize::try_from(length).unwrap_or(usize::MAX).min(64 * 1024 * 1024);
                let buffer = stream
                    .try_fold(BytesMut::with_capacity(capacity), |mut acc, chunk| async move {
                        acc.extend_from_slice(&chunk);
                        Ok(acc)
                    })
                    .await?;
                if buffer.len() as u64 != length {
                    return Err(length_mismatch(length, buffer.len() as u64));
                }
                Ok(buffer.freeze())
            }
        }
    }

    /// Turn the body into a chunk stream.
    ///
    /// Streamed sources are checked against their declared length as they
    /// are consumed.
    pub fn into_stream(self) -> ByteStream {
        match self {
            ByteSource::Bytes(bytes) => stream::once(async move { Ok(bytes) }).boxed(),
            ByteSource::Stream { stream, length } => checked(stream, length),
        }
    }
}

impl std::fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ByteSource::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            ByteSource::Stream { length, .. } => f
                .debug_struct("Stream")
                .field("length", length)
                .finish_non_exhaustive(),
        }
    }
}

impl From<Bytes> for ByteSource {
    fn from(bytes: Bytes) -> Self {
        ByteSource::Bytes(bytes)
    }
}

impl From<Vec<u8>> for ByteSource {
    fn from(bytes: Vec<u8>) -> Self {
        ByteSource::Bytes(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for ByteSource {
    fn from(bytes: &'static [u8]) -> Self {
        ByteSource::Bytes(Bytes::from_static(bytes))
    }
}

impl From<String> for ByteSource {
    fn from(text: String) -> Self {
        ByteSource::Bytes(Bytes::from(text))
    }
}

/// Read `reader` as a stream of chunks of at most `chunk_size` bytes.
pub fn read_chunks<R>(reader: R, chunk_size: usize) -> ByteStream
where
    R: AsyncRead + Send + Unpin + 'static,
{
    stream::try_unfold(reader, move |mut reader| async move {
        let mut buffer = vec![0u8; chunk_size];
        let mut filled = 0;

        while filled < chunk_size {
            let n = reader.read(&mut buffer[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        if filled == 0 {
            return Ok(None);
        }

        buffer.truncate(filled);
        Ok(Some((Bytes::from(buffer), reader)))
    })
    .boxed()
}

fn checked(stream: ByteStream, length: u64) -> ByteStream {
    stream::try_unfold((stream, 0u64), move |(mut stream, seen)| async move {
        match stream.next().await {
            Some(chunk) => {
                let chunk = chunk?;
                let seen = seen + chunk.len() as u64;
                if seen > length {
                    return Err(length_mismatch(length, seen));
                }
                Ok(Some((chunk, (stream, seen))))
            }
            None if seen != length => Err(length_mismatch(length, seen)),
            None => Ok(None),
        }
    })
    .boxed()
}

fn length_mismatch(declared: u64, actual: u64) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("stream declared {} bytes but yielded {}", declared, actual),
    )
}

/// Base64 MD5 digest of `data`, as sent in `Content-MD5`.
pub fn content_md5(data: &[u8]) -> String {
    BASE64.encode(Md5::digest(data))
}

/// Content type guessed from a file name.
pub fn content_type_for(path: impl AsRef<Path>) -> String {
    mime_guess::from_path(path.as_ref())
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Write a chunk stream to `path` and return the number of bytes written.
///
/// The file is removed again if reading a chunk or writing fails.
pub async fn write_stream(path: impl AsRef<Path>, mut body: ByteStream) -> io::Result<u64> {
    let path = path.as_ref();
    let mut file = tokio::fs::File::create(path).await?;

    let written = async {
        let mut total = 0u64;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            total += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;
        Ok::<_, io::Error>(total)
    }
    .await;
    drop(file);

    if written.is_err() {
        if let Err(remove) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %remove, "Failed to remove partial file");
        }
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn chunks(parts: &[&'static [u8]]) -> ByteStream {
        let parts: Vec<io::Result<Bytes>> = parts.iter().map(|p| Ok(Bytes::from_static(p))).collect();
        stream::iter(parts).boxed()
    }

    #[tokio::test]
    async fn test_read_chunks() {
        let data = b"hello world this is a test".to_vec();
        let mut reader = read_chunks(Cursor::new(data), 5);

        assert_eq!(reader.next().await.unwrap().unwrap().as_ref(), b"hello");
        assert_eq!(reader.next().await.unwrap().unwrap().as_ref(), b" worl");

        let rest: Vec<Bytes> = reader.try_collect().await.unwrap();
        let rest: Vec<u8> = rest.iter().flat_map(|b| b.iter().copied()).collect();
        assert_eq!(rest, b"d this is a test");
    }

    #[tokio::test]
    async fn test_read_chunks_end() {
        let mut reader = read_chunks(Cursor::new(b"hi".to_vec()), 10);
        assert_eq!(reader.next().await.unwrap().unwrap().as_ref(), b"hi");
        assert!(reader.next().await.is_none());
    }

    #[tokio::test]
    async fn test_collect_checks_declared_length() {
        let source = ByteSource::Stream {
            stream: chunks(&[b"abc", b"def"]),
            length: 6,
        };
        assert_eq!(source.collect().await.unwrap().as_ref(), b"abcdef");

        let short = ByteSource::Stream {
            stream: chunks(&[b"abc"]),
            length: 6,
        };
        let err = short.collect().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn test_into_stream_checks_declared_length() {
        let long = ByteSource::Stream {
            stream: chunks(&[b"abc", b"def"]),
            length: 4,
        };
        let result: io::Result<Vec<Bytes>> = long.into_stream().try_collect().await;
        assert!(result.is_err());

        let short = ByteSource::Stream {
            stream: chunks(&[b"ab"]),
            length: 4,
        };
        let result: io::Result<Vec<Bytes>> = short.into_stream().try_collect().await;
        assert!(result.is_err());

        let exact = ByteSource::Stream {
            stream: chunks(&[b"ab", b"cd"]),
            length: 4,
        };
        let parts: Vec<Bytes> = exact.into_stream().try_collect().await.unwrap();
        assert_eq!(parts.len(), 2);
    }

    #[tokio::test]
    async fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        tokio::fs::write(&path, vec![7u8; 150_000]).await.unwrap();

        let source = ByteSource::from_file(&path).await.unwrap();
        assert!(source.is_stream());
        assert_eq!(source.len(), 150_000);
        assert_eq!(source.collect().await.unwrap().len(), 150_000);
    }

    #[tokio::test]
    async fn test_write_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let written = write_stream(&path, chunks(&[b"con", b"tent"])).await.unwrap();
        assert_eq!(written, 7);
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"content");
    }

    #[tokio::test]
    async fn test_write_stream_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.bin");
        let parts: Vec<io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"first")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ];

        let err = write_stream(&path, stream::iter(parts).boxed())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        assert!(!path.exists());
    }

    #[test]
    fn test_content_md5() {
        // md5("hello") = 5d41402abc4b2a76b9719d911017c592
        assert_eq!(content_md5(b"hello"), "XUFAKrxLKna5cZ2REBfFkg==");
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("archive.zip"), "application/zip");
        assert_eq!(content_type_for("photo.PNG"), "image/png");
        assert_eq!(content_type_for("no-extension"), "application/octet-stream");
    }
}
