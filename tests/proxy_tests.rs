//! End-to-end tests through a real listening proxy and real backends.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use round_robin_proxy::config::{ProxyConfig, TimeoutConfig, UpstreamConfig};
use round_robin_proxy::lifecycle::startup::build_server;
use round_robin_proxy::upstream::{build_client, FixedUpstream, HttpUpstream, Upstream, UpstreamHealth};
use round_robin_proxy::{HttpServer, UpstreamPool};
use url::Url;

mod common;

fn config_for(addrs: &[String]) -> ProxyConfig {
    ProxyConfig {
        upstreams: addrs.iter().map(UpstreamConfig::new).collect(),
        ..Default::default()
    }
}

async fn get_body(client: &reqwest::Client, url: &str) -> (u16, String) {
    let res = client.get(url).send().await.expect("proxy unreachable");
    let status = res.status().as_u16();
    (status, res.text().await.unwrap())
}

#[tokio::test]
async fn rotates_across_backends_in_order() {
    let a = common::start_mock_backend("A").await;
    let b = common::start_mock_backend("B").await;
    let c = common::start_mock_backend("C").await;

    let config = config_for(&[format!("http://{}", a), format!("http://{}", b), format!("http://{}", c)]);
    let (proxy, shutdown) = common::spawn_proxy(build_server(&config).unwrap()).await;
    let client = common::client();

    let mut bodies = Vec::new();
    for _ in 0..6 {
        let (status, body) = get_body(&client, &format!("http://{}/", proxy)).await;
        assert_eq!(status, 200);
        bodies.push(body);
    }
    assert_eq!(bodies, ["A", "B", "C", "A", "B", "C"]);

    shutdown.trigger();
}

#[tokio::test]
async fn dead_upstream_is_never_selected() {
    let addrs = [
        common::start_mock_backend("A").await,
        common::start_mock_backend("B").await,
        common::start_mock_backend("C").await,
    ];

    let timeouts = TimeoutConfig::default();
    let client = build_client(&timeouts).unwrap();
    let b_health = Arc::new(UpstreamHealth::new());

    let upstreams: Vec<Arc<dyn Upstream>> = addrs
        .iter()
        .enumerate()
        .map(|(i, addr)| {
            let address = format!("http://{}", addr);
            let target = Url::parse(&address).unwrap();
            let mut upstream = HttpUpstream::new(address, target, client.clone(), &timeouts);
            if i == 1 {
                upstream = upstream.with_health(b_health.clone());
            }
            Arc::new(upstream) as Arc<dyn Upstream>
        })
        .collect();
    b_health.set_alive(false);

    let server = HttpServer::new(Arc::new(UpstreamPool::new(upstreams).unwrap()));
    let (proxy, shutdown) = common::spawn_proxy(server).await;
    let client = common::client();

    let mut bodies = Vec::new();
    for _ in 0..6 {
        bodies.push(get_body(&client, &format!("http://{}/", proxy)).await.1);
    }
    assert_eq!(bodies, ["A", "C", "A", "C", "A", "C"]);

    shutdown.trigger();
}

#[tokio::test]
async fn all_upstreams_down_returns_503_promptly() {
    let a = Arc::new(FixedUpstream::new("A"));
    let b = Arc::new(FixedUpstream::new("B"));
    a.set_alive(false);
    b.set_alive(false);

    let upstreams: Vec<Arc<dyn Upstream>> = vec![a.clone(), b.clone()];
    let server = HttpServer::new(Arc::new(UpstreamPool::new(upstreams).unwrap()));
    let (proxy, shutdown) = common::spawn_proxy(server).await;

    let started = Instant::now();
    let (status, _) = get_body(&common::client(), &format!("http://{}/", proxy)).await;
    assert_eq!(status, 503);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(a.served() + b.served(), 0);

    // Recovery is picked up on the next request.
    b.set_alive(true);
    let (status, body) = get_body(&common::client(), &format!("http://{}/", proxy)).await;
    assert_eq!(status, 200);
    assert_eq!(body, "B");

    shutdown.trigger();
}

#[tokio::test]
async fn unreachable_upstream_returns_502() {
    let config = config_for(&[format!("http://{}", common::closed_addr())]);
    let (proxy, shutdown) = common::spawn_proxy(build_server(&config).unwrap()).await;

    let (status, _) = get_body(&common::client(), &format!("http://{}/", proxy)).await;
    assert_eq!(status, 502);

    shutdown.trigger();
}

#[tokio::test]
async fn slow_upstream_returns_504() {
    let mut config = config_for(&[format!("http://{}", common::start_silent_backend().await)]);
    config.timeouts.request_secs = 1;
    let (proxy, shutdown) = common::spawn_proxy(build_server(&config).unwrap()).await;

    let started = Instant::now();
    let (status, _) = get_body(&common::client(), &format!("http://{}/", proxy)).await;
    assert_eq!(status, 504);
    assert!(started.elapsed() < Duration::from_secs(5));

    shutdown.trigger();
}

#[tokio::test]
async fn backend_status_and_body_pass_through() {
    let backend = common::start_programmable_backend(|_| async { (404, "missing thing".to_string()) }).await;
    let config = config_for(&[format!("http://{}", backend)]);
    let (proxy, shutdown) = common::spawn_proxy(build_server(&config).unwrap()).await;

    let (status, body) = get_body(&common::client(), &format!("http://{}/nope", proxy)).await;
    assert_eq!(status, 404);
    assert_eq!(body, "missing thing");

    shutdown.trigger();
}

#[tokio::test]
async fn request_is_rewritten_onto_upstream() {
    let backend = common::start_programmable_backend(|head| async move { (200, head) }).await;
    let config = config_for(&[format!("http://{}/base", backend)]);
    let (proxy, shutdown) = common::spawn_proxy(build_server(&config).unwrap()).await;

    let (status, head) = get_body(&common::client(), &format!("http://{}/items/7?full=1", proxy)).await;
    assert_eq!(status, 200);

    let head = head.to_ascii_lowercase();
    assert!(head.starts_with("get /base/items/7?full=1 http/1.1\r\n"), "{}", head);
    assert!(head.contains(&format!("host: {}\r\n", backend)), "{}", head);
    assert!(head.contains("x-forwarded-for: 127.0.0.1\r\n"), "{}", head);

    shutdown.trigger();
}

#[tokio::test]
async fn passive_health_takes_failing_upstream_out_of_rotation() {
    let failing_hits = Arc::new(AtomicU32::new(0));
    let hits = failing_hits.clone();
    let failing = common::start_programmable_backend(move |_| {
        let hits = hits.clone();
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            (503, "down".to_string())
        }
    })
    .await;
    let healthy = common::start_mock_backend("ok").await;

    let mut config = config_for(&[format!("http://{}", failing), format!("http://{}", healthy)]);
    config.health.passive_enabled = true;
    config.health.unhealthy_threshold = 1;
    let (proxy, shutdown) = common::spawn_proxy(build_server(&config).unwrap()).await;
    let client = common::client();

    // First request hits the failing upstream and is relayed as-is.
    let (status, _) = get_body(&client, &format!("http://{}/", proxy)).await;
    assert_eq!(status, 503);

    for _ in 0..4 {
        let (status, body) = get_body(&client, &format!("http://{}/", proxy)).await;
        assert_eq!(status, 200);
        assert_eq!(body, "ok");
    }
    assert_eq!(failing_hits.load(Ordering::SeqCst), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn passive_health_returns_recovered_upstream_to_rotation() {
    let failing = Arc::new(AtomicBool::new(true));
    let hits = Arc::new(AtomicU32::new(0));
    let (flag, counter) = (failing.clone(), hits.clone());
    let backend = common::start_programmable_backend(move |_| {
        let (flag, counter) = (flag.clone(), counter.clone());
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            if flag.load(Ordering::SeqCst) {
                (503, "down".to_string())
            } else {
                (200, "back".to_string())
            }
        }
    })
    .await;

    let mut config = config_for(&[format!("http://{}", backend)]);
    config.health.passive_enabled = true;
    config.health.unhealthy_threshold = 1;
    config.health.healthy_threshold = 1;
    config.health.retry_after_ms = 300;
    let (proxy, shutdown) = common::spawn_proxy(build_server(&config).unwrap()).await;
    let client = common::client();
    let url = format!("http://{}/", proxy);

    // The backend's own 503 takes it out of rotation.
    let (status, body) = get_body(&client, &url).await;
    assert_eq!((status, body.as_str()), (503, "down"));

    // While down, the proxy answers without contacting it.
    let (status, _) = get_body(&client, &url).await;
    assert_eq!(status, 503);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    failing.store(false, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(400)).await;

    for _ in 0..3 {
        let (status, body) = get_body(&client, &url).await;
        assert_eq!((status, body.as_str()), (200, "back"));
    }
    assert_eq!(hits.load(Ordering::SeqCst), 4);

    shutdown.trigger();
}

#[tokio::test]
async fn empty_pool_never_builds_a_server() {
    assert!(build_server(&ProxyConfig::default()).is_err());
}
