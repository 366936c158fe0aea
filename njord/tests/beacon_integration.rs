//! Integration tests for the beacon.
//!
//! These tests drive the full tick pipeline against scripted collaborators:
//! - Configuration loaded from a JSON file on disk
//! - Source selection between gateway GNSS and WiFi
//! - Delivery to real loopback UDP/TCP sockets and a captured console
//! - Configuration refresh and runtime shutdown

use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use njord::beacon::{BeaconRuntime, BeaconScheduler, ConfigRefresher, RefreshOutcome, TickPhase};
use njord::catalog::{ApiCredentials, ScanObservation};
use njord::config::{ConfigLoader, ConfigOverrides, ConfigSource, SharedConfig};
use njord::gateway::{GatewayClient, RadioScanner, SourceError};
use njord::position::{FixSource, GatewayFix};
use njord::sink::{Dispatcher, DispatcherConfig};
use njord::wire;
use tempfile::TempDir;
use tokio::net::UdpSocket;

// =============================================================================
// Test Helpers
// =============================================================================

/// Gateway returning a fixed reading.
struct FixedGateway {
    fix: GatewayFix,
    reads: AtomicUsize,
}

impl FixedGateway {
    fn new(latitude: f64, longitude: f64, hdop: f64, valid: bool) -> Self {
        Self {
            fix: GatewayFix::new(latitude, longitude, hdop, valid, Utc::now()),
            reads: AtomicUsize::new(0),
        }
    }

    fn with_unit(mut self, unit_id: u32) -> Self {
        self.fix = self.fix.with_unit_id(unit_id);
        self
    }
}

impl GatewayClient for FixedGateway {
    async fn read_fix(&self) -> Result<GatewayFix, SourceError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(GatewayFix {
            timestamp: Utc::now(),
            ..self.fix.clone()
        })
    }
}

/// Scanner reporting the same access points on every scan.
struct FixedScanner {
    bssids: Vec<&'static str>,
    scans: AtomicUsize,
}

impl FixedScanner {
    fn new(bssids: &[&'static str]) -> Self {
        Self {
            bssids: bssids.to_vec(),
            scans: AtomicUsize::new(0),
        }
    }
}

impl RadioScanner for FixedScanner {
    async fn scan(&self, _ssids: &[String]) -> Result<Vec<ScanObservation>, SourceError> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .bssids
            .iter()
            .map(|b| ScanObservation::new(b.parse().unwrap()).with_ssid("dock"))
            .collect())
    }
}

/// Console writer capturing output for assertions.
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A loopback port with no listener.
fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn config_document(interval: f64, sinks: &str) -> String {
    format!(
        r#"{{
            "KnownAps": [
                {{"Ssid": "dock", "Bssid": "aa:bb:cc:dd:ee:01", "Latitude": 40.71, "Longitude": -74.01}}
            ],
            "LastUpdated": "2024-06-10T00:00:00Z",
            "ApiUser": {{"Username": "user", "Password": "secret"}},
            "Beacon": {{
                "Interval": {interval},
                "HdopExcellent": 2.0,
                "HdopPoor": 6.0,
                "NumWifiScan": 2,
                "WifiScanDelay": 0.0,
                "SourceTimeout": 1.0
            }},
            "Sinks": [{sinks}]
        }}"#
    )
}

async fn load(path: &Path) -> (ConfigLoader, SharedConfig) {
    let loader = ConfigLoader::new(
        ConfigSource::Local(path.to_path_buf()),
        ConfigOverrides::default(),
    )
    .unwrap();
    let shared = SharedConfig::new(loader.load_initial().await.unwrap());
    (loader, shared)
}

fn dispatcher(buffer: &SharedBuffer) -> Arc<Dispatcher> {
    Arc::new(Dispatcher::with_console(
        DispatcherConfig {
            connect_timeout: Duration::from_millis(500),
            write_timeout: Duration::from_millis(500),
        },
        Box::new(buffer.clone()),
    ))
}

async fn recv_sentence(socket: &UdpSocket) -> String {
    let mut buf = [0u8; 256];
    let len = tokio::time::timeout(Duration::from_secs(2), socket.recv(&mut buf))
        .await
        .expect("datagram should arrive")
        .unwrap();
    String::from_utf8(buf[..len].to_vec()).unwrap()
}

// =============================================================================
// End-to-end tick
// =============================================================================

#[tokio::test]
async fn test_poor_gateway_fix_replaced_by_wifi_position() {
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let udp_port = receiver.local_addr().unwrap().port();
    let sinks = format!(
        r#"{{"Message": "NMEA_RMC", "Protocol": "udp", "Host": "127.0.0.1", "Port": {udp_port}}},
           {{"Message": "TAIP_PV", "Protocol": "stdout", "Alias": "+2"}}"#
    );

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    std::fs::write(&path, config_document(1.0, &sinks)).unwrap();
    let (_, shared) = load(&path).await;

    let gateway = Arc::new(FixedGateway::new(40.70, -74.00, 8.0, true).with_unit(100));
    let scanner = Arc::new(FixedScanner::new(&["AA:BB:CC:DD:EE:01", "11:22:33:44:55:66"]));
    let buffer = SharedBuffer::default();
    let mut scheduler = BeaconScheduler::new(gateway, Arc::clone(&scanner), shared, dispatcher(&buffer));

    let report = scheduler.tick().await;

    assert_eq!(scanner.scans.load(Ordering::SeqCst), 2);
    assert_eq!(
        report.phases,
        vec![
            TickPhase::Idle,
            TickPhase::Scanning,
            TickPhase::Selecting,
            TickPhase::Encoding,
            TickPhase::Dispatching,
            TickPhase::Idle
        ]
    );

    let fix = report.fix().expect("WiFi match should yield a fix");
    assert_eq!(fix.source, FixSource::Wifi);
    assert_eq!((fix.latitude, fix.longitude), (40.71, -74.01));

    let rmc = recv_sentence(&receiver).await;
    assert!(wire::verify_nmea(&rmc), "bad checksum: {rmc}");
    let fields: Vec<&str> = rmc.split(',').collect();
    assert_eq!(fields[2], "A");
    assert_eq!(&fields[3..7], &["4042.6000", "N", "07400.6000", "W"]);

    let console = buffer.contents();
    assert!(console.starts_with(">RPV"));
    assert!(console.contains(";ID=0102;"));
}

#[tokio::test]
async fn test_excellent_gateway_fix_needs_no_scan() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    std::fs::write(
        &path,
        config_document(1.0, r#"{"Message": "NMEA_RMC", "Protocol": "stdout"}"#),
    )
    .unwrap();
    let (_, shared) = load(&path).await;

    let gateway = Arc::new(FixedGateway::new(40.70, -74.00, 0.9, true));
    let scanner = Arc::new(FixedScanner::new(&["aa:bb:cc:dd:ee:01"]));
    let buffer = SharedBuffer::default();
    let mut scheduler = BeaconScheduler::new(gateway, Arc::clone(&scanner), shared, dispatcher(&buffer));

    let report = scheduler.tick().await;

    assert_eq!(scanner.scans.load(Ordering::SeqCst), 0);
    assert_eq!(report.fix().unwrap().source, FixSource::Gateway);
    let line = buffer.contents();
    assert!(line.contains("4042.0000,N,07400.0000,W"));
    assert!(wire::verify_nmea(&line));
}

#[tokio::test]
async fn test_unreachable_tcp_sink_does_not_block_others() {
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let udp_port = receiver.local_addr().unwrap().port();
    let sinks = format!(
        r#"{{"Message": "NMEA_RMC", "Protocol": "tcp", "Host": "127.0.0.1", "Port": {}}},
           {{"Message": "TAIP_PV", "Protocol": "udp", "Host": "127.0.0.1", "Port": {udp_port}}},
           {{"Message": "TAIP_PV", "Protocol": "stdout"}}"#,
        closed_port()
    );

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    std::fs::write(&path, config_document(1.0, &sinks)).unwrap();
    let (_, shared) = load(&path).await;

    let gateway = Arc::new(FixedGateway::new(40.70, -74.00, 1.0, true));
    let scanner = Arc::new(FixedScanner::new(&[]));
    let buffer = SharedBuffer::default();
    let mut scheduler = BeaconScheduler::new(gateway, scanner, shared, dispatcher(&buffer));

    let report = scheduler.tick().await;
    let dispatch = report.dispatch.expect("fix should be dispatched");

    assert_eq!(dispatch.failed(), 1);
    assert_eq!(dispatch.delivered(), 2);
    assert!(wire::verify_taip(&recv_sentence(&receiver).await));
    assert!(buffer.contents().starts_with(">RPV"));
}

// =============================================================================
// Configuration refresh
// =============================================================================

#[tokio::test]
async fn test_failed_refresh_leaves_configuration_unchanged() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    std::fs::write(
        &path,
        config_document(1.0, r#"{"Message": "TAIP_PV", "Protocol": "stdout"}"#),
    )
    .unwrap();
    let (loader, shared) = load(&path).await;
    let before = shared.current();
    let refresher = ConfigRefresher::new(loader, shared.clone());

    // HdopPoor below HdopExcellent is rejected as a whole.
    let invalid = config_document(1.0, "").replace("\"HdopPoor\": 6.0", "\"HdopPoor\": 1.0");
    std::fs::write(&path, invalid).unwrap();

    assert!(matches!(
        refresher.refresh_once().await,
        RefreshOutcome::Failed(_)
    ));
    let after = shared.current();
    assert_eq!(shared.generation(), 0);
    assert_eq!(after.beacon, before.beacon);
    assert_eq!(after.sinks, before.sinks);
    assert_eq!(after.catalog.len(), before.catalog.len());
}

#[tokio::test]
async fn test_refreshed_credentials_reach_next_tick() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    std::fs::write(&path, config_document(1.0, "")).unwrap();
    let (loader, shared) = load(&path).await;
    let refresher = ConfigRefresher::new(loader, shared.clone());

    let gateway = Arc::new(RecordingGateway::default());
    let mut scheduler = BeaconScheduler::new(
        Arc::clone(&gateway),
        Arc::new(FixedScanner::new(&[])),
        shared,
        dispatcher(&SharedBuffer::default()),
    );

    scheduler.tick().await;
    std::fs::write(
        &path,
        config_document(1.0, "").replace("\"secret\"", "\"rotated\""),
    )
    .unwrap();
    assert!(matches!(
        refresher.refresh_once().await,
        RefreshOutcome::Applied { generation: 1 }
    ));
    scheduler.tick().await;

    let pushed = gateway.pushed.lock().unwrap();
    assert_eq!(pushed.len(), 2);
    assert_eq!(pushed[1].password, "rotated");
}

#[derive(Default)]
struct RecordingGateway {
    pushed: Mutex<Vec<ApiCredentials>>,
}

impl GatewayClient for RecordingGateway {
    async fn read_fix(&self) -> Result<GatewayFix, SourceError> {
        Err(SourceError::EmptyResponse)
    }

    fn update_credentials(&self, credentials: &ApiCredentials) {
        self.pushed.lock().unwrap().push(credentials.clone());
    }
}

// =============================================================================
// Runtime lifecycle
// =============================================================================

#[tokio::test]
async fn test_runtime_beacons_until_shutdown() {
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let udp_port = receiver.local_addr().unwrap().port();
    let sinks = format!(
        r#"{{"Message": "TAIP_PV", "Protocol": "udp", "Host": "127.0.0.1", "Port": {udp_port}}}"#
    );

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    std::fs::write(&path, config_document(0.05, &sinks)).unwrap();
    let (loader, shared) = load(&path).await;

    let gateway = Arc::new(FixedGateway::new(40.70, -74.00, 1.0, true));
    let scheduler = BeaconScheduler::new(
        Arc::clone(&gateway),
        Arc::new(FixedScanner::new(&[])),
        shared.clone(),
        dispatcher(&SharedBuffer::default()),
    );
    let refresher = ConfigRefresher::new(loader, shared);

    let runtime = BeaconRuntime::start(scheduler, Some(refresher));
    assert!(runtime.is_running());

    // Two beacons on the wire.
    assert!(recv_sentence(&receiver).await.starts_with(">RPV"));
    assert!(recv_sentence(&receiver).await.starts_with(">RPV"));

    tokio::time::timeout(Duration::from_secs(2), runtime.shutdown())
        .await
        .expect("runtime should shut down promptly");

    let reads = gateway.reads.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(gateway.reads.load(Ordering::SeqCst), reads);
}
