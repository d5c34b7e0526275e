use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dish::dish::digest::{self, Profile};
use dish::dish::Loaded;
use dish::{CacheStore, Dish, DishOptions, StoreConfig};
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{
    HeaderMap, HeaderValue, ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, ETAG,
    IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED, VARY,
};
use hyper::{Method, Response, StatusCode};

fn store() -> Arc<CacheStore> {
    Arc::new(CacheStore::new(StoreConfig::default()).unwrap())
}

fn headers(pairs: &[(hyper::header::HeaderName, &str)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        map.insert(name.clone(), HeaderValue::from_str(value).unwrap());
    }
    map
}

async fn body(response: Response<Full<Bytes>>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn text_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[tokio::test]
async fn string_dish_serves_bytes_with_validators() {
    let dish = Dish::new("hello :D", &DishOptions::default(), &store()).unwrap();
    let response = dish.respond(&Method::GET, &HeaderMap::new(), None).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_LENGTH], "8");
    assert_eq!(response.headers()[CONTENT_TYPE], "application/octet-stream");
    assert_eq!(response.headers()[ETAG], "18eddd4897daa9d6096014988cd07f7b688ac46f");
    assert!(response.headers().contains_key(LAST_MODIFIED));
    assert_eq!(&body(response).await[..], b"hello :D");
}

#[tokio::test]
async fn compressible_text_is_negotiated() {
    let text = "party time! ".repeat(200);
    let options = DishOptions {
        default_content_type: Some("text/plain".to_string()),
        ..DishOptions::default()
    };
    let dish = Dish::new(text.clone(), &options, &store()).unwrap();

    let gz = dish
        .respond(&Method::GET, &headers(&[(ACCEPT_ENCODING, "gzip, deflate")]), None)
        .await
        .unwrap();
    assert_eq!(gz.headers()[CONTENT_ENCODING], "gzip");
    assert_eq!(gz.headers()[VARY], "Accept-Encoding");
    let mut decoded = String::new();
    flate2::read::GzDecoder::new(&body(gz).await[..])
        .read_to_string(&mut decoded)
        .unwrap();
    assert_eq!(decoded, text);

    let zl = dish
        .respond(&Method::GET, &headers(&[(ACCEPT_ENCODING, "deflate")]), None)
        .await
        .unwrap();
    assert_eq!(zl.headers()[CONTENT_ENCODING], "deflate");
    let mut decoded = String::new();
    flate2::read::ZlibDecoder::new(&body(zl).await[..])
        .read_to_string(&mut decoded)
        .unwrap();
    assert_eq!(decoded, text);

    let plain = dish.respond(&Method::GET, &HeaderMap::new(), None).await.unwrap();
    assert!(plain.headers().get(CONTENT_ENCODING).is_none());
    assert_eq!(plain.headers()[CONTENT_LENGTH], text.len().to_string().as_str());
}

#[tokio::test]
async fn file_dish_conditional_get_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = text_file(&dir, "index.html", "<h1>hello world!</h1>");
    let dish = Dish::file(&path, &DishOptions::default().max_age(120), &store()).unwrap();

    let first = dish.respond(&Method::GET, &HeaderMap::new(), None).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.headers()[CONTENT_TYPE], "text/html");
    assert_eq!(first.headers()["cache-control"], "public, max-age=120");
    let etag = first.headers()[ETAG].to_str().unwrap().to_string();
    let last_modified = first.headers()[LAST_MODIFIED].to_str().unwrap().to_string();

    let quoted = format!("\"{etag}\"");
    let revalidated = dish
        .respond(&Method::GET, &headers(&[(IF_NONE_MATCH, &quoted)]), None)
        .await
        .unwrap();
    assert_eq!(revalidated.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(revalidated.headers()[ETAG], etag.as_str());
    assert!(revalidated.headers().get(CONTENT_LENGTH).is_none());
    assert!(body(revalidated).await.is_empty());

    let since = dish
        .respond(&Method::GET, &headers(&[(IF_MODIFIED_SINCE, &last_modified)]), None)
        .await
        .unwrap();
    assert_eq!(since.status(), StatusCode::NOT_MODIFIED);

    let stale = dish
        .respond(&Method::GET, &headers(&[(IF_NONE_MATCH, "\"0000\"")]), None)
        .await
        .unwrap();
    assert_eq!(stale.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_file_reports_not_found_and_is_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("later.txt");
    let store = store();
    let dish = Dish::file(&path, &DishOptions::default(), &store).unwrap();

    let err = dish.respond(&Method::GET, &HeaderMap::new(), None).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(store.is_empty());

    std::fs::write(&path, "now it exists").unwrap();
    let response = dish.respond(&Method::GET, &HeaderMap::new(), None).await.unwrap();
    assert_eq!(&body(response).await[..], b"now it exists");
}

#[tokio::test]
async fn prefix_invalidation_picks_up_new_contents() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("assets")).unwrap();
    let app = text_file(&dir, "assets/app.js", "console.log(1)");
    let css = text_file(&dir, "assets/site.css", "body{}");
    let index = text_file(&dir, "index.html", "<p>home</p>");

    let store = store();
    let options = DishOptions::default();
    let dishes = [
        Dish::file(&app, &options, &store).unwrap(),
        Dish::file(&css, &options, &store).unwrap(),
        Dish::file(&index, &options, &store).unwrap(),
    ];
    let mut before = Vec::new();
    for dish in &dishes {
        let response = dish.respond(&Method::GET, &HeaderMap::new(), None).await.unwrap();
        before.push(response.headers()[ETAG].clone());
    }
    assert_eq!(store.len(), 3);

    std::fs::write(&app, "console.log(2)").unwrap();
    let prefix = dir.path().join("assets");
    assert_eq!(store.delete_by_prefix(prefix.to_str().unwrap()), 2);
    assert_eq!(store.len(), 1);

    let refreshed = dishes[0].respond(&Method::GET, &HeaderMap::new(), None).await.unwrap();
    assert_ne!(refreshed.headers()[ETAG], before[0]);
    assert_eq!(&body(refreshed).await[..], b"console.log(2)");

    let untouched = dishes[2].respond(&Method::GET, &HeaderMap::new(), None).await.unwrap();
    assert_eq!(untouched.headers()[ETAG], before[2]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_requests_share_one_representation() {
    let dir = tempfile::tempdir().unwrap();
    let path = text_file(&dir, "data.json", &"{\"k\":1}".repeat(500));
    let store = store();
    let dish = Dish::file(&path, &DishOptions::default(), &store).unwrap();

    let gate = Arc::new(tokio::sync::Barrier::new(32));
    let mut tasks = Vec::new();
    for _ in 0..32 {
        let dish = dish.clone();
        let gate = Arc::clone(&gate);
        tasks.push(tokio::spawn(async move {
            gate.wait().await;
            dish.representation().await.unwrap()
        }));
    }

    let mut records = Vec::new();
    for task in tasks {
        records.push(task.await.unwrap());
    }
    // A second population would hand out a distinct record
    assert!(records.iter().all(|r| Arc::ptr_eq(r, &records[0])));
    assert_eq!(store.len(), 1);
    assert_eq!(store.stats().in_flight, 0);

    let response = dish
        .respond(&Method::GET, &headers(&[(ACCEPT_ENCODING, "gzip")]), None)
        .await
        .unwrap();
    assert_eq!(response.headers()[ETAG], records[0].etag());
    assert_eq!(response.headers()[CONTENT_ENCODING], "gzip");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_misses_populate_once() {
    let store = store();
    let runs = Arc::new(AtomicUsize::new(0));
    let profile = Arc::new(Profile {
        headers: HeaderMap::new(),
        compress: false,
    });

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let store = Arc::clone(&store);
        let runs = Arc::clone(&runs);
        let profile = Arc::clone(&profile);
        tasks.push(tokio::spawn(async move {
            store
                .get_or_populate("shared", move || async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    let loaded = Loaded {
                        bytes: Bytes::from_static(b"hello :D"),
                        modified: None,
                    };
                    digest::materialize("shared", loaded, &profile).await
                })
                .await
                .unwrap()
        }));
    }

    let mut records = Vec::new();
    for task in tasks {
        records.push(task.await.unwrap());
    }
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(records.iter().all(|r| Arc::ptr_eq(r, &records[0])));
    assert_eq!(records[0].etag(), "18eddd4897daa9d6096014988cd07f7b688ac46f");
}

#[tokio::test]
async fn serve_answers_hyper_requests() {
    let options = DishOptions::default().header("X-Served-By", "dish");
    let dish = Dish::new(b"\x00\x01binary".to_vec(), &options, &store()).unwrap();

    let head = hyper::Request::head("/whatever").body(()).unwrap();
    let response = dish.serve(&head).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-served-by"], "dish");
    assert!(body(response).await.is_empty());

    let get = hyper::Request::get("/").body(()).unwrap();
    let response = dish.serve(&get).await.unwrap();
    assert_eq!(&body(response).await[..], b"\x00\x01binary");
}
