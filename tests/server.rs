use edge_staticfile::{server, ContentRoot, Static};
use http::{header, Request, StatusCode, Version};
use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper_util::rt::{TokioExecutor, TokioIo};
use std::{fs, net::SocketAddr, time::Duration};
use tempdir::TempDir;
use tokio::{
    net::{TcpListener, TcpStream},
    sync::oneshot,
    task::JoinHandle,
    time::timeout,
};

struct Harness {
    _dir: TempDir,
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}
impl Harness {
    async fn start(files: Vec<(&str, &str)>) -> Harness {
        let dir = TempDir::new("edge-staticfile-server").unwrap();
        for (subpath, contents) in files {
            fs::write(dir.path().join(subpath), contents).expect("failed to write fixtures");
        }
        let static_ = Static::new(ContentRoot::new(dir.path()).unwrap());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(server::run(listener, static_, async move {
            let _ = stopped.await;
        }));

        Harness {
            _dir: dir,
            addr,
            stop,
            task,
        }
    }

    fn uri(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

#[tokio::test]
async fn serves_files_over_http2() {
    let harness = Harness::start(vec![("a.txt", "hello world")]).await;

    let stream = TcpStream::connect(harness.addr).await.unwrap();
    let (mut sender, conn) =
        hyper::client::conn::http2::handshake(TokioExecutor::new(), TokioIo::new(stream))
            .await
            .unwrap();
    tokio::spawn(conn);

    let req = Request::get(harness.uri("/a.txt"))
        .body(Empty::<Bytes>::new())
        .unwrap();
    let res = sender.send_request(req).await.unwrap();
    assert_eq!(res.version(), Version::HTTP_2);
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"hello world");

    let req = Request::get(harness.uri("/a.txt"))
        .header(header::RANGE, "bytes=6-")
        .body(Empty::<Bytes>::new())
        .unwrap();
    let res = sender.send_request(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(res.headers()[header::CONTENT_RANGE], "bytes 6-10/11");
    let body = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"world");

    let req = Request::get(harness.uri("/health"))
        .body(Empty::<Bytes>::new())
        .unwrap();
    let res = sender.send_request(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn shutdown_closes_idle_connections_and_returns() {
    let harness = Harness::start(vec![("a.txt", "hello")]).await;

    let stream = TcpStream::connect(harness.addr).await.unwrap();
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .unwrap();
    let client = tokio::spawn(conn);

    let req = Request::get("/a.txt")
        .header(header::HOST, "localhost")
        .body(Empty::<Bytes>::new())
        .unwrap();
    let res = sender.send_request(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"hello");

    // The keep-alive connection is still open; shutdown must close it rather than wait it out.
    harness.stop.send(()).unwrap();
    timeout(Duration::from_secs(5), harness.task)
        .await
        .expect("server did not stop")
        .unwrap();
    let _closed = timeout(Duration::from_secs(5), client)
        .await
        .expect("connection was not closed")
        .unwrap();
    drop(sender);
}
