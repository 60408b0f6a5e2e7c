//! Media responses written straight to a blocking socket.
//!
//! Media connections are taken away from hyper before any byte is consumed
//! and served here on a blocking thread. The handler speaks just enough
//! HTTP/1.1 for players: one request per connection, `GET` only, a single
//! byte range, and `Connection: close` on every response.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::net::TcpStream;

use kino_common::paths::content_type_for;

use super::range::{parse_range_header, unsatisfied_content_range};
use super::MediaRoot;

/// Upper bound on request header size.
const MAX_HEADER_BYTES: usize = 8192;

struct MediaRequest {
    method: String,
    target: String,
    range: Option<String>,
}

/// Read request headers up to the blank line.
///
/// Bytes after the header block are discarded; media requests carry no body.
fn read_request_headers(stream: &mut TcpStream) -> io::Result<MediaRequest> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before end of headers",
            ));
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        if buf.len() > MAX_HEADER_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "headers too large",
            ));
        }
    };

    let header_str = std::str::from_utf8(&buf[..header_end])
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "non-UTF-8 headers"))?;
    let mut lines = header_str.split("\r\n");

    let request_line = lines
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "empty request"))?;
    let mut parts = request_line.split_whitespace();
    let (method, target) = match (parts.next(), parts.next()) {
        (Some(m), Some(t)) => (m.to_owned(), t.to_owned()),
        _ => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "malformed request line",
            ))
        }
    };

    let range = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("range"))
        .map(|(_, value)| value.trim().to_owned());

    Ok(MediaRequest {
        method,
        target,
        range,
    })
}

/// Write a bodiless response.
fn write_empty(stream: &mut TcpStream, status: &str, extra: &[(&str, &str)]) -> io::Result<()> {
    let mut head = format!("HTTP/1.1 {status}\r\n");
    for (name, value) in extra {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str("Content-Length: 0\r\nConnection: close\r\n\r\n");
    stream.write_all(head.as_bytes())
}

/// Serve one media request on a blocking socket.
///
/// Errors are I/O failures on the socket or file after the response has
/// started; the caller decides how loudly to log them. The file handle is
/// scoped to this call.
pub fn handle_media_connection(
    mut stream: TcpStream,
    media: &MediaRoot,
    chunk_size: usize,
) -> io::Result<()> {
    let req = match read_request_headers(&mut stream) {
        Ok(req) => req,
        Err(e) if e.kind() == io::ErrorKind::InvalidData => {
            tracing::debug!("Rejecting media request: {e}");
            return write_empty(&mut stream, "400 Bad Request", &[]);
        }
        Err(e) => return Err(e),
    };

    let head_only = match req.method.as_str() {
        "GET" => false,
        "HEAD" => true,
        _ => {
            tracing::debug!(method = %req.method, uri = %req.target, "405 media request");
            return write_empty(&mut stream, "405 Method Not Allowed", &[("Allow", "GET, HEAD")]);
        }
    };

    let opened = media
        .resolve(&req.target)
        .and_then(|path| File::open(&path).ok().map(|f| (path, f)))
        .and_then(|(path, f)| match f.metadata() {
            Ok(meta) if meta.is_file() => Some((path, f, meta.len())),
            _ => None,
        });
    let Some((path, mut file, size)) = opened else {
        tracing::debug!(uri = %req.target, "404 media request");
        return write_empty(&mut stream, "404 Not Found", &[]);
    };

    let content_type = content_type_for(&path);

    let (status, start, length, content_range) = match req.range.as_deref() {
        Some(value) => match parse_range_header(value, size) {
            Ok(range) => (
                "206 Partial Content",
                range.start,
                range.length(),
                Some(range.content_range(size)),
            ),
            Err(e) => {
                tracing::debug!(uri = %req.target, range = %value, "416 media request: {e}");
                return write_empty(
                    &mut stream,
                    "416 Range Not Satisfiable",
                    &[
                        ("Content-Range", &unsatisfied_content_range(size)),
                        ("Accept-Ranges", "bytes"),
                    ],
                );
            }
        },
        None => ("200 OK", 0, size, None),
    };

    tracing::debug!(
        uri = %req.target,
        status,
        start,
        length,
        "Streaming media"
    );

    let mut head = format!(
        "HTTP/1.1 {status}\r\n\
         Content-Type: {content_type}\r\n\
         Content-Length: {length}\r\n\
         Accept-Ranges: bytes\r\n"
    );
    if let Some(content_range) = content_range {
        head.push_str(&format!("Content-Range: {content_range}\r\n"));
    }
    head.push_str("Connection: close\r\n\r\n");
    stream.write_all(head.as_bytes())?;
    if head_only {
        return stream.flush();
    }

    file.seek(SeekFrom::Start(start))?;
    let sent = copy_chunked(&mut file, &mut stream, length, chunk_size)?;
    tracing::trace!(uri = %req.target, sent, "Media response complete");
    stream.flush()
}

/// Copy up to `length` bytes in `chunk_size` reads, stopping early if the
/// reader runs dry. Returns the number of bytes written.
fn copy_chunked<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    length: u64,
    chunk_size: usize,
) -> io::Result<u64> {
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut remaining = length;

    while remaining > 0 {
        let want = remaining.min(buf.len() as u64) as usize;
        let n = match reader.read(&mut buf[..want]) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..n])?;
        remaining -= n as u64;
    }

    Ok(length - remaining)
}

/// Whether an error means the peer went away mid-response.
pub fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted
    )
}
