//! Regional dispatcher tests: local fallback, edge delegation and per-region
//! failure isolation

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use edgeprobe::{ProbeRequest, ProbeResponse, Region};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use uppe_health::monitoring::{
    EdgeExecutor, MonitorStatus, RegionSummary, RegionalDispatcher, TimingSource, aggregate,
};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serve one HEAD request over TLS with a self-signed localhost certificate
async fn serve_tls_once() -> SocketAddr {
    let cert = CertificateDer::from(include_bytes!("fixtures/localhost.cert.der").to_vec());
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(
        include_bytes!("fixtures/localhost.key.der").to_vec(),
    ));
    let config = rustls::ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(vec![cert], key)
        .unwrap();
    let acceptor = TlsAcceptor::from(Arc::new(config));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut stream = acceptor.accept(socket).await.unwrap();
        let mut request = [0u8; 1024];
        let _ = stream.read(&mut request).await;
        stream
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let _ = stream.shutdown().await;
    });
    addr
}

fn dispatcher() -> RegionalDispatcher {
    RegionalDispatcher::new("uppe-test/1.0", Duration::from_secs(5), 5_000).unwrap()
}

/// Edge executor that always answers from Frankfurt
struct FrankfurtEdge {
    calls: AtomicUsize,
}

#[async_trait]
impl EdgeExecutor for FrankfurtEdge {
    async fn probe(&self, request: &ProbeRequest) -> anyhow::Result<ProbeResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(request.method, "HEAD");
        Ok(ProbeResponse {
            status: Some(200),
            duration: 42,
            colo: Some("FRA".to_string()),
            resolved_ip: Some("203.0.113.10".to_string()),
            dns_lookup_time: Some(3),
            connect_time: Some(8),
            tls_handshake_time: Some(12),
            ..Default::default()
        })
    }
}

/// Edge executor that is down
struct DownEdge;

#[async_trait]
impl EdgeExecutor for DownEdge {
    async fn probe(&self, _request: &ProbeRequest) -> anyhow::Result<ProbeResponse> {
        Err(anyhow!("Edge executor returned status 502"))
    }
}

/// Edge executor whose task dies for one region
struct PanickingEdge {
    broken: Region,
}

#[async_trait]
impl EdgeExecutor for PanickingEdge {
    async fn probe(&self, request: &ProbeRequest) -> anyhow::Result<ProbeResponse> {
        if request.region == self.broken {
            panic!("probe worker crashed");
        }
        Ok(ProbeResponse { status: Some(200), duration: 50, colo: Some("IAD".to_string()), ..Default::default() })
    }
}

#[tokio::test]
async fn test_local_fallback_approximates_timings() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD")).respond_with(ResponseTemplate::new(200)).mount(&server).await;

    let result = dispatcher().check_region(&server.uri(), Region::EuWest).await;

    assert!(result.success());
    assert_eq!(result.region, Region::EuWest);
    assert_eq!(result.status, MonitorStatus::Online);
    assert_eq!(result.timing_source, TimingSource::Approximated);
    assert_eq!(result.dns_lookup_time_ms, Some(20));
    assert!(result.response_time_ms() >= 20);
    assert_eq!(result.connect_time_ms, Some(result.response_time_ms() / 5));
    // Plain HTTP target, no TLS phase
    assert_eq!(result.tls_handshake_time_ms, None);
    assert_eq!(result.resolved_ip.as_deref(), Some("127.0.0.1"));
}

#[tokio::test]
async fn test_local_fallback_classifies_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD")).respond_with(ResponseTemplate::new(502)).mount(&server).await;

    let result = dispatcher().check_region(&server.uri(), Region::UsEast).await;

    assert!(result.success());
    assert_eq!(result.check.status_code, Some(502));
    assert_eq!(result.status, MonitorStatus::Offline);
}

#[tokio::test]
async fn test_unreachable_region_is_offline() {
    let result = dispatcher().check_region("http://127.0.0.1:1/", Region::SaEast).await;

    assert!(!result.success());
    assert!(!result.check.validation_passed);
    assert_eq!(result.status, MonitorStatus::Offline);
    assert!(result.check.error_message.is_some());
    assert_eq!(result.timing_source, TimingSource::Approximated);
    assert_eq!(result.dns_lookup_time_ms, Some(40));
}

#[tokio::test]
async fn test_https_fallback_estimates_tls_handshake() {
    let addr = serve_tls_once().await;
    let client = reqwest::Client::builder().danger_accept_invalid_certs(true).build().unwrap();
    let dispatcher = dispatcher().with_client(client);

    let result = dispatcher.check_region(&format!("https://{addr}/"), Region::UsEast).await;

    assert!(result.success(), "unexpected failure: {:?}", result.check.error_message);
    assert_eq!(result.check.status_code, Some(200));
    assert_eq!(result.timing_source, TimingSource::Approximated);
    assert_eq!(result.connect_time_ms, Some(result.response_time_ms() / 5));
    assert_eq!(result.tls_handshake_time_ms, Some(result.response_time_ms() * 15 / 100));
}

#[tokio::test]
async fn test_edge_reports_requested_region() {
    let edge = Arc::new(FrankfurtEdge { calls: AtomicUsize::new(0) });
    let dispatcher = dispatcher().with_edge(edge.clone());

    let result = dispatcher.check_region("https://shop.example.com", Region::ApNortheast).await;

    assert_eq!(edge.calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.region, Region::ApNortheast);
    assert_eq!(result.edge_region, Some(Region::EuCentral));
    assert_eq!(result.timing_source, TimingSource::Edge);
    assert_eq!(result.response_time_ms(), 42);
    assert_eq!(result.tls_handshake_time_ms, Some(12));
    assert_eq!(result.status, MonitorStatus::Online);
}

#[tokio::test]
async fn test_edge_outage_falls_back_to_local_check() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD")).respond_with(ResponseTemplate::new(200)).expect(1).mount(&server).await;

    let dispatcher = dispatcher().with_edge(Arc::new(DownEdge));
    let result = dispatcher.check_region(&server.uri(), Region::UsWest).await;

    assert!(result.success());
    assert_eq!(result.timing_source, TimingSource::Approximated);
    assert_eq!(result.edge_colo, None);
}

#[tokio::test]
async fn test_all_regions_keep_input_order() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD")).respond_with(ResponseTemplate::new(200)).mount(&server).await;

    // Longest simulated DNS delay first
    let regions = [Region::SaEast, Region::UsEast, Region::ApSoutheast, Region::EuCentral];
    let results = dispatcher().check_all_regions(&server.uri(), &regions).await;

    let order: Vec<Region> = results.iter().map(|r| r.region).collect();
    assert_eq!(order, regions);
    assert!(results.iter().all(|r| r.success()));
    assert_eq!(aggregate(&results), MonitorStatus::Online);

    let summary = RegionSummary::from_results(&results);
    assert!(summary.average_response_time_ms.is_some());
    assert!(summary.fastest_region.is_some());
}

#[tokio::test]
async fn test_crashed_region_does_not_affect_siblings() {
    let dispatcher = dispatcher().with_edge(Arc::new(PanickingEdge { broken: Region::EuWest }));
    let regions = [Region::UsEast, Region::EuWest, Region::ApSoutheast];

    let results = dispatcher.check_all_regions("https://shop.example.com", &regions).await;

    assert_eq!(results.len(), 3);
    assert!(results[0].success());
    assert!(!results[1].success());
    assert_eq!(results[1].region, Region::EuWest);
    assert_eq!(results[1].status, MonitorStatus::Offline);
    assert!(results[1].check.error_message.as_deref().unwrap().contains("Region check failed"));
    assert_eq!(results[1].timing_source, TimingSource::Unmeasured);
    assert_eq!(results[1].dns_lookup_time_ms, None);
    assert_eq!(results[1].connect_time_ms, None);
    assert_eq!(results[1].tls_handshake_time_ms, None);
    assert!(results[2].success());

    // One of three offline is not a majority
    assert_eq!(aggregate(&results), MonitorStatus::Degraded);
}
