//! Localhost listener that turns browser redirects into deep-link deliveries.

use std::io;
use std::sync::Arc;

use lens_auth::deep_link::LinkRouter;
use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const RECEIVED_HTML: &str =
    "<html><body><h1>Authorization received</h1><p>You may close this window.</p></body></html>";
const BAD_REQUEST_HTML: &str = "<html><body><h1>Unexpected request</h1></body></html>";

/// Upper bound on the bytes read while waiting for the request line.
const MAX_REQUEST_BYTES: usize = 8192;

pub async fn bind(port: u16) -> io::Result<TcpListener> {
    TcpListener::bind(("127.0.0.1", port)).await
}

/// Accept connections until the task is aborted, forwarding each `GET` target to `router`.
pub async fn serve(listener: TcpListener, router: Arc<LinkRouter>) {
    let port = match listener.local_addr() {
        Ok(addr) => addr.port(),
        Err(e) => {
            warn!("Loopback listener has no local address: {e}");
            return;
        }
    };

    loop {
        match listener.accept().await {
            Ok((socket, _)) => {
                let router = Arc::clone(&router);
                tokio::spawn(async move {
                    if let Err(e) = handle(socket, port, &router).await {
                        warn!("Loopback callback failed: {e}");
                    }
                });
            }
            Err(e) => warn!("Loopback accept failed: {e}"),
        }
    }
}

async fn handle(mut socket: TcpStream, port: u16, router: &LinkRouter) -> io::Result<()> {
    let buffer = read_request_line(&mut socket).await?;
    let request = String::from_utf8_lossy(&buffer);

    let delivered = match extract_request_target(&request) {
        Some(target) => {
            let uri = format!("http://127.0.0.1:{port}{target}");
            match router.deliver(&uri) {
                Ok(listeners) => {
                    debug!("Delivered loopback callback to {listeners} listener(s)");
                    true
                }
                Err(e) => {
                    warn!("Rejected loopback callback: {e}");
                    false
                }
            }
        }
        None => false,
    };

    let (status, body) = if delivered {
        ("HTTP/1.1 200 OK", RECEIVED_HTML)
    } else {
        ("HTTP/1.1 400 Bad Request", BAD_REQUEST_HTML)
    };
    let response = format!(
        "{status}\r\n\
         Content-Type: text/html; charset=utf-8\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n{}",
        body.len(),
        body
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}

/// Read until the request line is complete, the peer stops sending or
/// [`MAX_REQUEST_BYTES`] have arrived.
async fn read_request_line<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    while buffer.len() < MAX_REQUEST_BYTES && !buffer.windows(2).any(|pair| pair == b"\r\n") {
        let read = reader.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
    }
    buffer.truncate(MAX_REQUEST_BYTES);
    Ok(buffer)
}

/// The origin-form target of a `GET` request line.
fn extract_request_target(request: &str) -> Option<&str> {
    let mut parts = request.lines().next()?.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    (method == "GET" && target.starts_with('/')).then_some(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lens_auth::deep_link::DeepLink;
    use std::sync::Mutex;
    use url::Url;

    #[test]
    fn test_extract_request_target() {
        assert_eq!(
            extract_request_target("GET /callback?code=abc&state=xyz HTTP/1.1\r\nHost: x\r\n\r\n"),
            Some("/callback?code=abc&state=xyz")
        );
        assert_eq!(extract_request_target("POST /callback HTTP/1.1\r\n"), None);
        assert_eq!(extract_request_target("GET http://evil/ HTTP/1.1\r\n"), None);
        assert_eq!(extract_request_target(""), None);
    }

    #[tokio::test]
    async fn test_request_line_split_across_reads() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(b"GET /callback?code=abc").await.unwrap();

        let writer = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            client
                .write_all(b"&state=xyz HTTP/1.1\r\nHost: localhost\r\n\r\n")
                .await
                .unwrap();
            client
        });

        let buffer = read_request_line(&mut server).await.unwrap();
        let request = String::from_utf8_lossy(&buffer);
        assert_eq!(
            extract_request_target(&request),
            Some("/callback?code=abc&state=xyz")
        );
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_request_without_line_end_is_bounded() {
        let (mut client, mut server) = tokio::io::duplex(MAX_REQUEST_BYTES * 2);
        client.write_all(&vec![b'a'; MAX_REQUEST_BYTES + 100]).await.unwrap();
        drop(client);

        let buffer = read_request_line(&mut server).await.unwrap();
        assert_eq!(buffer.len(), MAX_REQUEST_BYTES);
    }

    #[tokio::test]
    async fn test_redirect_is_delivered_to_router() {
        let router = Arc::new(LinkRouter::new(|_| Ok(())));
        let received = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = Arc::clone(&received);
        let _subscription = router.subscribe(Arc::new(move |url: &Url| {
            sink.lock().unwrap().push(url.to_string());
        }));

        let listener = bind(0).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(serve(listener, Arc::clone(&router)));

        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        stream
            .write_all(b"GET /callback?code=abc&state=xyz HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert_eq!(
            received.lock().unwrap().as_slice(),
            [format!("http://127.0.0.1:{port}/callback?code=abc&state=xyz")]
        );
        server.abort();
    }
}
