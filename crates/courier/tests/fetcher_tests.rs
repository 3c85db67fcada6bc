mod common;

use common::{url, Reply, StubTransport, PRIMARY};
use courier::{ContentFetcher, LocalRoot};
use hashmirror_core::hash::HashAlgorithm;
use hashmirror_core::manifest::{Endpoint, EndpointKind};
use hashmirror_core::MirrorError;
use std::fs;
use tempfile::TempDir;

fn primary() -> Endpoint {
    Endpoint::new(EndpointKind::Primary, PRIMARY)
}

fn md5(data: &[u8]) -> String {
    HashAlgorithm::Md5.digest(data)
}

#[async_std::test]
async fn test_fetch_writes_body_and_returns_it() {
    let temp = TempDir::new().unwrap();
    let remote = StubTransport::new();
    remote.set(url(PRIMARY, "lib/arm64/libfoo.so"), Reply::Body(vec![0, 1, 2, 255]));

    let fetcher = ContentFetcher::new(remote.clone(), LocalRoot::new(temp.path()));
    let data = fetcher
        .fetch(&primary(), "lib/arm64/libfoo.so", HashAlgorithm::Md5, &md5(&[0, 1, 2, 255]))
        .await.unwrap();

    assert_eq!(data, [0, 1, 2, 255]);
    assert_eq!(
        fs::read(temp.path().join("lib/arm64/libfoo.so")).unwrap(),
        [0, 1, 2, 255]
    );
}

#[async_std::test]
async fn test_failed_fetch_keeps_previous_copy() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("asset"), "old").unwrap();

    let remote = StubTransport::new();
    remote.set(url(PRIMARY, "asset"), Reply::Status(500));

    let fetcher = ContentFetcher::new(remote.clone(), LocalRoot::new(temp.path()));
    let err = fetcher
        .fetch(&primary(), "asset", HashAlgorithm::Md5, &md5(b"new"))
        .await.unwrap_err();

    assert!(matches!(err, MirrorError::HttpStatus { status: 500, .. }));
    assert_eq!(fs::read_to_string(temp.path().join("asset")).unwrap(), "old");
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[async_std::test]
async fn test_mismatched_body_is_not_written() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("asset"), "good").unwrap();

    let remote = StubTransport::new();
    remote.set(url(PRIMARY, "asset"), Reply::Body(b"stale".to_vec()));

    let fetcher = ContentFetcher::new(remote.clone(), LocalRoot::new(temp.path()));
    let err = fetcher
        .fetch(&primary(), "asset", HashAlgorithm::Md5, &md5(b"fresh"))
        .await
        .unwrap_err();

    assert!(matches!(err, MirrorError::DigestMismatch { ref name, .. } if name == "asset"));
    assert_eq!(fs::read_to_string(temp.path().join("asset")).unwrap(), "good");
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[async_std::test]
async fn test_write_failure_surfaces_as_local_io() {
    let temp = TempDir::new().unwrap();
    // A regular file where a directory is needed.
    fs::write(temp.path().join("blocker"), "not a dir").unwrap();

    let remote = StubTransport::new();
    remote.set(url(PRIMARY, "blocker/asset"), Reply::Body(b"data".to_vec()));

    let fetcher = ContentFetcher::new(remote.clone(), LocalRoot::new(temp.path()));
    let err = fetcher
        .fetch(&primary(), "blocker/asset", HashAlgorithm::Md5, &md5(b"data"))
        .await.unwrap_err();

    assert!(matches!(err, MirrorError::LocalIo { .. }));
    assert_eq!(remote.hits(&url(PRIMARY, "blocker/asset")), 1);
}

#[async_std::test]
async fn test_unsafe_name_is_refused_before_any_request() {
    let temp = TempDir::new().unwrap();
    let remote = StubTransport::new();

    let fetcher = ContentFetcher::new(remote.clone(), LocalRoot::new(temp.path()));
    let err = fetcher
        .fetch(&primary(), "../outside", HashAlgorithm::Md5, &md5(b""))
        .await.unwrap_err();

    assert!(matches!(err, MirrorError::UnsafePath(_)));
    assert_eq!(remote.total_hits(), 0);
}

#[async_std::test]
async fn test_retrieve_does_not_touch_disk() {
    let temp = TempDir::new().unwrap();
    let remote = StubTransport::new();
    remote.set(url(PRIMARY, "hashes.json"), Reply::Body(b"{}".to_vec()));

    let fetcher = ContentFetcher::new(remote.clone(), LocalRoot::new(temp.path()));
    let body = fetcher.retrieve(&primary(), "hashes.json").await.unwrap();

    assert_eq!(body, b"{}");
    assert!(!temp.path().join("hashes.json").exists());
}
