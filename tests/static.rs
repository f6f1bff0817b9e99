use edge_staticfile::{
    Body, ContentRoot, ExtensionSizePolicy, Static, CDN_CACHE_CONTROL, X_CACHE_STATUS,
};
use http::{header, Method, Request, Response, StatusCode};
use http_body_util::BodyExt;
use std::time::{Duration, SystemTime};
use std::{fs, str};
use tempdir::TempDir;

const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

struct Harness {
    _dir: TempDir,
    static_: Static,
}
impl Harness {
    fn new(files: Vec<(&str, &str)>) -> Harness {
        let dir = TempDir::new("edge-staticfile-tests").unwrap();
        for (subpath, contents) in files {
            let fullpath = dir.path().join(subpath);
            fs::create_dir_all(fullpath.parent().unwrap())
                .and_then(|_| fs::write(fullpath, contents))
                .expect("failed to write fixtures");
        }

        let static_ = Static::new(ContentRoot::new(dir.path()).unwrap());
        Harness { _dir: dir, static_ }
    }

    async fn request<B>(&self, req: Request<B>) -> Response<Body> {
        self.static_.serve(req).await
    }

    async fn get(&self, path: &str) -> Response<Body> {
        let req = Request::builder()
            .uri(path)
            .body(())
            .expect("unable to build request");
        self.request(req).await
    }

    async fn get_with(&self, path: &str, name: header::HeaderName, value: &str) -> Response<Body> {
        let req = Request::builder()
            .uri(path)
            .header(name, value)
            .body(())
            .expect("unable to build request");
        self.request(req).await
    }
}

async fn read_body(res: Response<Body>) -> Vec<u8> {
    res.into_body()
        .collect()
        .await
        .expect("unable to read body")
        .to_bytes()
        .to_vec()
}

async fn read_json(res: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&read_body(res).await).expect("body is not json")
}

fn song() -> String {
    (0..2000u32).map(|i| char::from(b'a' + (i % 26) as u8)).collect()
}

#[tokio::test]
async fn serves_file_from_root() {
    let harness = Harness::new(vec![("file1.html", "this is file1")]);
    let res = harness.get("/file1.html").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_body(res).await;
    assert_eq!(str::from_utf8(&body).unwrap(), "this is file1");
}

#[tokio::test]
async fn serves_file_from_subdirectory() {
    let harness = Harness::new(vec![("assets/js/app.js", "console.log(1)")]);
    let res = harness.get("/assets/js/app.js").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(read_body(res).await, b"console.log(1)");
}

#[tokio::test]
async fn returns_404_if_file_not_found() {
    let harness = Harness::new(vec![]);
    let res = harness.get("/missing.txt").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.headers()[header::CACHE_CONTROL], NO_CACHE);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "application/json");
    let body = read_json(res).await;
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn returns_404_for_directories() {
    let harness = Harness::new(vec![("dir/index.html", "this is index")]);
    for path in ["/dir", "/dir/", "/dir/index.html/x"] {
        let res = harness.get(path).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{path}");
    }
}

#[tokio::test]
async fn root_returns_service_info() {
    let harness = Harness::new(vec![("index.html", "this is index")]);
    for path in ["/", "/./", "/a/.."] {
        let res = harness.get(path).await;
        assert_eq!(res.status(), StatusCode::OK, "{path}");
        assert_eq!(res.headers()[header::CACHE_CONTROL], NO_CACHE);
        let body = read_json(res).await;
        assert_eq!(body["service"], "edge-staticfile");
        assert_eq!(body["status"], "ok");
        assert!(body["version"].is_string());
    }
}

#[tokio::test]
async fn decodes_percent_notation() {
    let harness = Harness::new(vec![("has space.html", "file with funky chars")]);
    let res = harness.get("/has%20space.html").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(read_body(res).await, b"file with funky chars");
}

#[tokio::test]
async fn normalizes_path() {
    let harness = Harness::new(vec![("index.html", "this is index")]);
    for path in ["/xxx/../index.html", "/./index.html", "/a/..//index.html", "/a/b/../../index.html"] {
        let res = harness.get(path).await;
        assert_eq!(res.status(), StatusCode::OK, "{path}");
        assert_eq!(read_body(res).await, b"this is index");
    }
}

#[tokio::test]
async fn normalizes_percent_encoded_path() {
    let harness = Harness::new(vec![("file1.html", "this is file1")]);
    let res = harness.get("/xxx/..%2ffile1.html").await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(read_body(res).await, b"this is file1");
}

#[tokio::test]
async fn prevents_from_escaping_root() {
    let harness = Harness::new(vec![("file1.html", "this is file1")]);
    for path in [
        "/../file1.html",
        "/%2e%2e/file1.html",
        "/..%2ffile1.html",
        "/%2e%2e%2fetc%2fpasswd",
        "/foo/../../file1.html",
        "/..%5cfile1.html",
        "/c:/windows/win.ini",
        "/%2fetc/passwd",
    ] {
        let res = harness.get(path).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN, "{path}");
        assert_eq!(res.headers()[header::CACHE_CONTROL], NO_CACHE);
        let body = read_json(res).await;
        assert_eq!(body["error"], "forbidden");
    }
}

#[tokio::test]
async fn sends_headers() {
    let harness = Harness::new(vec![("style.css", "body {}")]);
    let res = harness.get("/style.css").await;
    assert_eq!(res.status(), StatusCode::OK);

    let directive = "max-age=31536000, immutable, stale-while-revalidate=3153600";
    let headers = res.headers();
    assert_eq!(headers[header::CACHE_CONTROL], directive);
    assert_eq!(headers[CDN_CACHE_CONTROL], directive);
    assert_eq!(headers[X_CACHE_STATUS], "MISS");
    assert_eq!(headers[header::ACCEPT_RANGES], "bytes");
    assert_eq!(headers[header::CONTENT_LENGTH], "7");
    assert_eq!(headers[header::CONTENT_TYPE], "text/css");
    assert!(headers.contains_key(header::LAST_MODIFIED));
    assert!(headers[header::ETAG].to_str().unwrap().starts_with("W/\""));
}

#[tokio::test]
async fn cache_lifetime_follows_extension() {
    let harness = Harness::new(vec![
        ("a.woff2", "x"),
        ("b.mp4", "x"),
        ("c.pdf", "x"),
        ("d.html", "x"),
        ("e.unknown", "x"),
    ]);
    for (path, max_age) in [
        ("/a.woff2", "max-age=31536000,"),
        ("/b.mp4", "max-age=2592000,"),
        ("/c.pdf", "max-age=604800,"),
        ("/d.html", "max-age=86400,"),
        ("/e.unknown", "max-age=3600,"),
    ] {
        let res = harness.get(path).await;
        let value = res.headers()[header::CACHE_CONTROL].to_str().unwrap();
        assert!(value.starts_with(max_age), "{path}: {value}");
    }
}

#[tokio::test]
async fn changes_content_type_on_extension() {
    let harness = Harness::new(vec![("file1.gif", "this is file1"), ("blob", "?")]);
    let res = harness.get("/file1.gif").await;
    assert_eq!(res.headers()[header::CONTENT_TYPE], "image/gif");
    let res = harness.get("/blob").await;
    assert_eq!(res.headers()[header::CONTENT_TYPE], "application/octet-stream");
}

#[tokio::test]
async fn serves_file_with_old_if_modified_since() {
    let harness = Harness::new(vec![("file1.html", "this is file1")]);
    let old = httpdate::fmt_http_date(SystemTime::now() - Duration::from_secs(24 * 3600));
    let res = harness
        .get_with("/file1.html", header::IF_MODIFIED_SINCE, &old)
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(read_body(res).await, b"this is file1");
}

#[tokio::test]
async fn serves_file_with_new_if_modified_since() {
    let harness = Harness::new(vec![("file1.html", "this is file1")]);
    let new = httpdate::fmt_http_date(SystemTime::now() + Duration::from_secs(3600));
    let res = harness
        .get_with("/file1.html", header::IF_MODIFIED_SINCE, &new)
        .await;
    assert_eq!(res.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(res.headers()[X_CACHE_STATUS], "REVALIDATED");
    assert!(res.headers().contains_key(header::CACHE_CONTROL));
    assert!(read_body(res).await.is_empty());
}

#[tokio::test]
async fn revalidates_with_etag() {
    let harness = Harness::new(vec![("song.mp3", song().as_str())]);
    let res = harness.get("/song.mp3").await;
    let etag = res.headers()[header::ETAG].to_str().unwrap().to_owned();

    // Repeated revalidation keeps answering 304 with the same tag.
    for _ in 0..2 {
        let res = harness
            .get_with("/song.mp3", header::IF_NONE_MATCH, &etag)
            .await;
        assert_eq!(res.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(res.headers()[header::ETAG], etag.as_str());
        assert_eq!(res.headers()[X_CACHE_STATUS], "REVALIDATED");
        assert!(read_body(res).await.is_empty());
    }

    let res = harness
        .get_with("/song.mp3", header::IF_NONE_MATCH, "W/\"other\"")
        .await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn serves_requested_range() {
    let data = song();
    let harness = Harness::new(vec![("song.mp3", data.as_str())]);
    let res = harness
        .get_with("/song.mp3", header::RANGE, "bytes=100-199")
        .await;
    assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(res.headers()[header::CONTENT_RANGE], "bytes 100-199/2000");
    assert_eq!(res.headers()[header::CONTENT_LENGTH], "100");
    assert_eq!(res.headers()[X_CACHE_STATUS], "MISS");
    assert_eq!(read_body(res).await, data[100..200].as_bytes());
}

#[tokio::test]
async fn clamps_range_end_to_file_size() {
    let data = song();
    let harness = Harness::new(vec![("song.mp3", data.as_str())]);
    for range in ["bytes=1500-99999", "bytes=1500-"] {
        let res = harness.get_with("/song.mp3", header::RANGE, range).await;
        assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT, "{range}");
        assert_eq!(res.headers()[header::CONTENT_RANGE], "bytes 1500-1999/2000");
        assert_eq!(read_body(res).await, data[1500..].as_bytes());
    }
}

#[tokio::test]
async fn rejects_unsatisfiable_range() {
    let harness = Harness::new(vec![("song.mp3", song().as_str())]);
    let res = harness
        .get_with("/song.mp3", header::RANGE, "bytes=5000-")
        .await;
    assert_eq!(res.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(res.headers()[header::CONTENT_RANGE], "bytes */2000");
    assert_eq!(res.headers()[header::CACHE_CONTROL], NO_CACHE);
    assert!(read_body(res).await.is_empty());
}

#[tokio::test]
async fn ignores_malformed_range() {
    let data = song();
    let harness = Harness::new(vec![("song.mp3", data.as_str())]);
    for range in ["bytes=-500", "bytes=abc-", "items=0-10", "bytes=10-5"] {
        let res = harness.get_with("/song.mp3", header::RANGE, range).await;
        assert_eq!(res.status(), StatusCode::OK, "{range}");
        assert_eq!(read_body(res).await, data.as_bytes());
    }
}

#[tokio::test]
async fn head_describes_full_file() {
    let harness = Harness::new(vec![("song.mp3", song().as_str())]);
    let get = harness.get("/song.mp3").await;
    let req = Request::builder()
        .method(Method::HEAD)
        .uri("/song.mp3")
        .header(header::RANGE, "bytes=0-9")
        .body(())
        .unwrap();
    let head = harness.request(req).await;

    assert_eq!(head.status(), StatusCode::OK);
    for name in [
        header::CACHE_CONTROL,
        header::ETAG,
        header::LAST_MODIFIED,
        header::CONTENT_LENGTH,
        header::CONTENT_TYPE,
        header::ACCEPT_RANGES,
    ] {
        assert_eq!(head.headers()[&name], get.headers()[&name], "{name}");
    }
    assert!(read_body(head).await.is_empty());
}

#[tokio::test]
async fn rejects_other_methods() {
    let harness = Harness::new(vec![("file1.html", "this is file1")]);
    let req = Request::builder()
        .method(Method::POST)
        .uri("/file1.html")
        .body(())
        .unwrap();
    let res = harness.request(req).await;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.headers()[header::ALLOW], "GET, HEAD");
    assert_eq!(res.headers()[header::CACHE_CONTROL], NO_CACHE);
}

#[tokio::test]
async fn applies_access_policy() {
    let mut harness = Harness::new(vec![
        ("site.env", "SECRET=1"),
        (".env", "SECRET=1"),
        ("big.txt", "more than ten bytes"),
        ("small.txt", "tiny"),
    ]);
    harness
        .static_
        .policy(ExtensionSizePolicy::new(["env"], Some(10)));

    let res = harness.get("/site.env").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(read_json(res).await["error"], "forbidden_file_type");

    let res = harness.get("/.env").await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(read_json(res).await["error"], "forbidden_file_type");

    let res = harness.get("/big.txt").await;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(read_json(res).await["error"], "file_too_large");

    let res = harness.get("/small.txt").await;
    assert_eq!(res.status(), StatusCode::OK);

    // Missing files are reported before the extension is checked.
    let res = harness.get("/missing.env").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
