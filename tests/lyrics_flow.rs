mod support;

use std::time::Duration;

use spotlyrics::lyrics::LyricsCache;
use spotlyrics::{Error, LyricsClient, Payload};
use support::{
    LYRICS_BODY, LYRICS_PREFIX, Reply, SERVER_TIME_PATH, StubServer, TOKEN_PATH, token_body,
};

const TRACK: &str = "5f8eCNwTlr0RJopE9vQ6mB";

async fn setup() -> (StubServer, tempfile::TempDir) {
    let server = StubServer::start().await;
    server.with_token_routes();
    server.route_prefix(LYRICS_PREFIX, vec![Reply::json(200, LYRICS_BODY)]);
    (server, tempfile::tempdir().unwrap())
}

#[tokio::test]
async fn fetches_then_serves_from_cache() {
    let (server, dir) = setup().await;
    let client = LyricsClient::new(server.options(dir.path())).unwrap();

    let lyrics = client.get_lyrics(TRACK).await.unwrap();
    assert_eq!(lyrics.sync_type, "LINE_SYNCED");
    assert_eq!(lyrics.lines.len(), 2);
    assert_eq!(lyrics.lines[1].words, "b");

    let reqs = server.requests_to(LYRICS_PREFIX);
    assert_eq!(reqs.len(), 1);
    assert_eq!(reqs[0].path, format!("{LYRICS_PREFIX}{TRACK}"));
    assert_eq!(reqs[0].query, "format=json&market=from_token");
    assert_eq!(reqs[0].header("authorization"), Some("Bearer tok-1"));
    assert_eq!(reqs[0].header("app-platform"), Some("WebPlayer"));

    let before = server.requests().len();
    let again = client
        .get_lyrics(&format!("https://open.spotify.com/track/{TRACK}?si=x"))
        .await
        .unwrap();
    assert_eq!(again, lyrics);
    assert_eq!(server.requests().len(), before);
}

#[tokio::test]
async fn cached_token_is_reused_across_tracks() {
    let (server, dir) = setup().await;
    let client = LyricsClient::new(server.options(dir.path())).unwrap();

    client.get_lyrics("spotify:track:aaa").await.unwrap();
    client.get_lyrics("bbb").await.unwrap();
    assert_eq!(server.requests_to(TOKEN_PATH).len(), 1);
    assert_eq!(server.requests_to(LYRICS_PREFIX).len(), 2);
}

#[tokio::test]
async fn invalid_reference_fails_before_network() {
    let (server, dir) = setup().await;
    let client = LyricsClient::new(server.options(dir.path())).unwrap();

    let err = client
        .get_lyrics("https://open.spotify.com/album/xyz")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidTrackReference(_)), "{err:?}");
    let err = client.get_lyrics("  ").await.unwrap_err();
    assert!(matches!(err, Error::InvalidTrackReference(_)), "{err:?}");
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn error_statuses_invalidate_token_and_force_new_exchange() {
    let cases: [(u16, fn(&Error) -> bool); 3] = [
        (404, |e| matches!(e, Error::LyricsNotFound)),
        (429, |e| matches!(e, Error::RateLimited)),
        (500, |e| matches!(e, Error::Upstream { status: 500 })),
    ];

    for (status, check) in cases {
        let (server, dir) = setup().await;
        let opts = server.options(dir.path());
        let token_path = opts.token_cache_path.clone();
        let client = LyricsClient::new(opts).unwrap();

        server.route_prefix(LYRICS_PREFIX, vec![Reply::status(status)]);
        let err = client.get_lyrics(TRACK).await.unwrap_err();
        assert!(check(&err), "{status}: {err:?}");
        assert!(!token_path.exists(), "{status}: token cache kept");

        server.route_prefix(LYRICS_PREFIX, vec![Reply::json(200, LYRICS_BODY)]);
        client.get_lyrics(TRACK).await.unwrap();
        assert_eq!(server.requests_to(TOKEN_PATH).len(), 2, "{status}");
        assert!(token_path.exists());
    }
}

#[tokio::test]
async fn malformed_body_invalidates_token_and_skips_cache() {
    let (server, dir) = setup().await;
    let opts = server.options(dir.path());
    let token_path = opts.token_cache_path.clone();
    let cache = LyricsCache::new(&opts.lyrics_cache_dir);
    let client = LyricsClient::new(opts).unwrap();

    server.route_prefix(
        LYRICS_PREFIX,
        vec![Reply::json(200, r#"{"lyrics":{"syncType":"LINE_SYNCED"}}"#)],
    );
    let err = client.get_lyrics(TRACK).await.unwrap_err();
    assert!(matches!(err, Error::MalformedLyricsResponse(_)), "{err:?}");
    assert!(!token_path.exists());
    assert!(!cache.entry_path(TRACK).exists());
}

#[tokio::test]
async fn disabled_cache_always_hits_network() {
    let (server, dir) = setup().await;
    let mut opts = server.options(dir.path());
    opts.lyrics_cache_enabled = false;
    let cache_dir = opts.lyrics_cache_dir.clone();
    let client = LyricsClient::new(opts).unwrap();

    client.get_lyrics(TRACK).await.unwrap();
    client.get_lyrics(TRACK).await.unwrap();
    assert_eq!(server.requests_to(LYRICS_PREFIX).len(), 2);
    assert!(!cache_dir.exists());
}

#[tokio::test]
async fn deadline_elapses_without_partial_cache_writes() {
    let (server, dir) = setup().await;
    server.route(
        SERVER_TIME_PATH,
        vec![Reply::json(200, r#"{"serverTime":1700000000}"#).delayed(Duration::from_secs(2))],
    );
    let opts = server.options(dir.path());
    let token_path = opts.token_cache_path.clone();
    let client = LyricsClient::new(opts).unwrap();

    let err = client
        .get_lyrics_within(TRACK, Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout), "{err:?}");
    assert!(!token_path.exists());
}

#[tokio::test]
async fn payload_reports_success_and_failure() {
    let (server, dir) = setup().await;
    let opts = server.options(dir.path());

    let ok = spotlyrics::payload::get_lyrics_payload_with_options(opts.clone(), TRACK).await;
    let json: serde_json::Value = serde_json::from_str(&ok.to_json()).unwrap();
    assert_eq!(json["error"], false);
    assert_eq!(json["syncType"], "LINE_SYNCED");
    assert_eq!(json["lines"][0]["startTimeMs"], "1000");

    server.route_prefix(LYRICS_PREFIX, vec![Reply::status(429)]);
    let err = spotlyrics::payload::get_lyrics_payload_with_options(opts, "other-track").await;
    assert!(err.is_error());
    match err {
        Payload::Err { message, .. } => assert!(message.contains("rate limited")),
        other => panic!("unexpected payload {other:?}"),
    }
}

#[tokio::test]
async fn cached_token_file_round_trips_between_clients() {
    let (server, dir) = setup().await;
    let opts = server.options(dir.path());
    std::fs::write(&opts.token_cache_path, token_body("from-disk")).unwrap();

    let a = LyricsClient::new(opts.clone()).unwrap();
    a.get_lyrics(TRACK).await.unwrap();
    let reqs = server.requests_to(LYRICS_PREFIX);
    assert_eq!(reqs[0].header("authorization"), Some("Bearer from-disk"));
    assert!(server.requests_to(TOKEN_PATH).is_empty());

    // A second client on the same cache dir sees the lyrics entry too.
    let b = LyricsClient::new(opts).unwrap();
    b.get_lyrics(TRACK).await.unwrap();
    assert_eq!(server.requests_to(LYRICS_PREFIX).len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_clients_share_cache_files_safely() {
    let (server, dir) = setup().await;
    let opts = server.options(dir.path());

    let mut tasks = Vec::new();
    for i in 0..8 {
        let client = LyricsClient::new(opts.clone()).unwrap();
        let reference = if i % 2 == 0 {
            TRACK.to_string()
        } else {
            format!("spotify:track:{TRACK}")
        };
        tasks.push(tokio::spawn(async move { client.get_lyrics(&reference).await }));
    }
    for task in tasks {
        let lyrics = task.await.unwrap().unwrap();
        assert_eq!(lyrics.lines.len(), 2);
    }

    // Redundant exchanges may have raced; whichever wrote last left a usable token.
    let raw = std::fs::read(&opts.token_cache_path).unwrap();
    let token: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    assert_eq!(token["accessToken"], "tok-1");

    let cache = LyricsCache::new(&opts.lyrics_cache_dir);
    let cached = cache.read(TRACK, Duration::from_secs(60)).unwrap();
    assert_eq!(cached.sync_type, "LINE_SYNCED");
    let raw = std::fs::read(&opts.secret_cache_path).unwrap();
    serde_json::from_slice::<serde_json::Value>(&raw).unwrap();
}
