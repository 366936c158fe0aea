//! Beacon scheduler daemon.
//!
//! Runs the beacon cycle on the configured interval. Each tick:
//!
//! 1. Reads the gateway fix (a failure or timeout counts as an invalid fix)
//! 2. Scans for known access points unless the gateway fix is excellent
//! 3. Matches the pooled observations and selects the authoritative fix
//! 4. Renders and delivers sentences to every configured sink
//!
//! A tick reads one configuration snapshot and uses it throughout, so a
//! refresh landing mid-tick takes effect on the next tick.
//!
//! # Example
//!
//! ```ignore
//! use njord::beacon::BeaconScheduler;
//!
//! let scheduler = BeaconScheduler::new(gateway, scanner, shared_config, dispatcher);
//! tokio::spawn(scheduler.run(shutdown_token));
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::phase::{TickPhase, TickReport};
use crate::catalog::{match_observations, ApiCredentials, ScanObservation};
use crate::config::{ConfigSnapshot, SharedConfig};
use crate::gateway::{GatewayClient, RadioScanner};
use crate::position::{select_fix, GatewayFix};
use crate::sink::{render, Dispatcher};

/// Shortest timer period accepted, guarding against a zero interval.
const MIN_PERIOD: Duration = Duration::from_millis(10);

/// Longest timer period accepted, keeping deadline arithmetic in range.
const MAX_PERIOD: Duration = Duration::from_secs(604_800);

/// Build a beacon timer whose first tick fires at `start`.
pub(crate) fn periodic(period: Duration, start: Instant) -> Interval {
    let mut interval = tokio::time::interval_at(start, period.clamp(MIN_PERIOD, MAX_PERIOD));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Start instant one clamped `period` from now.
pub(crate) fn one_period_from_now(period: Duration) -> Instant {
    Instant::now() + period.clamp(MIN_PERIOD, MAX_PERIOD)
}

/// Drives the beacon cycle.
pub struct BeaconScheduler<G, R> {
    /// GNSS fix source.
    gateway: Arc<G>,

    /// WiFi scan source.
    scanner: Arc<R>,

    /// Active configuration.
    config: SharedConfig,

    /// Sink delivery.
    dispatcher: Arc<Dispatcher>,

    /// Credentials last handed to the gateway.
    pushed_credentials: Option<ApiCredentials>,

    /// Configuration generation last applied to the gateway and dispatcher.
    applied_generation: Option<u64>,
}

impl<G, R> BeaconScheduler<G, R>
where
    G: GatewayClient,
    R: RadioScanner,
{
    pub fn new(
        gateway: Arc<G>,
        scanner: Arc<R>,
        config: SharedConfig,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            gateway,
            scanner,
            config,
            dispatcher,
            pushed_credentials: None,
            applied_generation: None,
        }
    }

    /// The shared configuration this scheduler reads.
    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Run one beacon cycle.
    pub async fn tick(&mut self) -> TickReport {
        let (generation, snapshot) = self.config.versioned();
        self.apply_config(generation, &snapshot);

        let beacon = &snapshot.beacon;
        let mut phases = vec![TickPhase::Idle];

        let gateway = self.read_gateway(beacon.source_timeout, Utc::now()).await;

        let mut observations = Vec::new();
        let mut scans = 0;
        if beacon.thresholds.is_excellent(&gateway) {
            debug!(hdop = gateway.hdop, "Gateway fix excellent, skipping WiFi scan");
        } else {
            phases.push(TickPhase::Scanning);
            let ssids = snapshot.ssids();
            for _ in 0..beacon.num_wifi_scan {
                observations.extend(self.scan_once(&ssids, beacon.source_timeout).await);
                scans += 1;
                if !beacon.wifi_scan_delay.is_zero() {
                    tokio::time::sleep(beacon.wifi_scan_delay).await;
                }
            }
        }

        phases.push(TickPhase::Selecting);
        let wifi = match_observations(&snapshot.catalog, &observations);
        let selection = select_fix(&gateway, wifi.as_ref(), &beacon.thresholds, Utc::now());

        let dispatch = match &selection {
            Ok(fix) => {
                phases.push(TickPhase::Encoding);
                let batch = render(fix, &snapshot.sinks, beacon.default_unit_id);

                phases.push(TickPhase::Dispatching);
                let report = self.dispatcher.deliver(&batch).await;

                info!(
                    source = %fix.source,
                    lat = fix.latitude,
                    lon = fix.longitude,
                    hdop = gateway.hdop,
                    delivered = report.delivered(),
                    failed = report.failed(),
                    "Beacon sent"
                );
                Some(report)
            }
            Err(e) => {
                warn!(error = %e, scans, observations = observations.len(), "No position this tick");
                None
            }
        };
        phases.push(TickPhase::Idle);

        TickReport {
            phases,
            generation,
            gateway,
            scans,
            selection,
            dispatch,
        }
    }

    /// Runs the beacon until shutdown is signalled.
    ///
    /// The first tick fires immediately. A tick in progress when shutdown is
    /// signalled runs to completion; no further tick starts.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let snapshot = self.config.current();
        let mut period = snapshot.beacon.interval;
        info!(
            interval_secs = period.as_secs_f64(),
            sinks = snapshot.sinks.len(),
            known_aps = snapshot.catalog.len(),
            "Beacon scheduler starting"
        );
        drop(snapshot);

        let mut interval = periodic(period, Instant::now());

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Beacon scheduler shutting down");
                    break;
                }

                _ = interval.tick() => {
                    let report = self.tick().await;
                    debug!(path = %report.path(), scans = report.scans, "Tick complete");

                    let next = self.config.current().beacon.interval;
                    if next != period {
                        info!(
                            old_secs = period.as_secs_f64(),
                            new_secs = next.as_secs_f64(),
                            "Beacon interval changed, rebuilding timer"
                        );
                        period = next;
                        interval = periodic(period, one_period_from_now(period));
                    }
                }
            }
        }
    }

    /// Push configuration changes to the collaborators.
    fn apply_config(&mut self, generation: u64, snapshot: &ConfigSnapshot) {
        if self.applied_generation == Some(generation) {
            return;
        }

        let credentials = snapshot.credentials();
        if self.pushed_credentials.as_ref() != Some(credentials) {
            self.gateway.update_credentials(credentials);
            self.pushed_credentials = Some(credentials.clone());
        }

        if self.applied_generation.is_some() {
            self.dispatcher.retain_endpoints(&snapshot.sinks);
            debug!(generation, "Applied new configuration");
        }
        self.applied_generation = Some(generation);
    }

    async fn read_gateway(&self, timeout: Duration, now: DateTime<Utc>) -> GatewayFix {
        match tokio::time::timeout(timeout, self.gateway.read_fix()).await {
            Ok(Ok(fix)) => fix,
            Ok(Err(e)) => {
                warn!(error = %e, "Gateway read failed, treating fix as invalid");
                GatewayFix::unavailable(now)
            }
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "Gateway read timed out, treating fix as invalid");
                GatewayFix::unavailable(now)
            }
        }
    }

    async fn scan_once(&self, ssids: &[String], timeout: Duration) -> Vec<ScanObservation> {
        match tokio::time::timeout(timeout, self.scanner.scan(ssids)).await {
            Ok(Ok(observations)) => {
                debug!(observations = observations.len(), "WiFi scan complete");
                observations
            }
            Ok(Err(e)) => {
                warn!(error = %e, "WiFi scan failed");
                Vec::new()
            }
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "WiFi scan timed out");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ApCatalog, KnownAccessPoint};
    use crate::config::BeaconConfig;
    use crate::gateway::SourceError;
    use crate::position::{FixSource, HdopThresholds, SelectionError};
    use crate::sink::{DispatcherConfig, SinkSpec, Transport};
    use crate::wire::MessageType;
    use std::io::{self, Write};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // =========================================================================
    // Scripted collaborators
    // =========================================================================

    struct ScriptedGateway {
        fix: Option<GatewayFix>,
        delay: Duration,
        reads: AtomicUsize,
        credential_pushes: AtomicUsize,
    }

    impl ScriptedGateway {
        fn returning(fix: GatewayFix) -> Self {
            Self {
                fix: Some(fix),
                delay: Duration::ZERO,
                reads: AtomicUsize::new(0),
                credential_pushes: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                fix: None,
                ..Self::returning(GatewayFix::unavailable(Utc::now()))
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    impl GatewayClient for ScriptedGateway {
        async fn read_fix(&self) -> Result<GatewayFix, SourceError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.fix.clone().ok_or(SourceError::EmptyResponse)
        }

        fn update_credentials(&self, _credentials: &ApiCredentials) {
            self.credential_pushes.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct ScriptedScanner {
        observations: Vec<ScanObservation>,
        scans: AtomicUsize,
    }

    impl ScriptedScanner {
        fn seeing(bssids: &[&str]) -> Self {
            Self {
                observations: bssids
                    .iter()
                    .map(|b| ScanObservation::new(b.parse().unwrap()))
                    .collect(),
                scans: AtomicUsize::new(0),
            }
        }
    }

    impl RadioScanner for ScriptedScanner {
        async fn scan(&self, _ssids: &[String]) -> Result<Vec<ScanObservation>, SourceError> {
            self.scans.fetch_add(1, Ordering::SeqCst);
            Ok(self.observations.clone())
        }
    }

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

    // =========================================================================
    // Fixtures
    // =========================================================================

    fn snapshot(num_wifi_scan: u32, credentials: ApiCredentials) -> ConfigSnapshot {
        let catalog = ApCatalog::new(
            vec![KnownAccessPoint::new(
                "dock",
                "aa:bb:cc:dd:ee:01".parse().unwrap(),
                40.71,
                -74.01,
            )],
            Utc::now(),
            credentials,
        )
        .unwrap();
        let beacon = BeaconConfig {
            interval: Duration::from_millis(20),
            thresholds: HdopThresholds::new(2.0, 6.0),
            num_wifi_scan,
            wifi_scan_delay: Duration::ZERO,
            source_timeout: Duration::from_millis(100),
            ..BeaconConfig::default()
        };
        let sinks = vec![SinkSpec::new(MessageType::NmeaRmc, Transport::Stdout)];
        ConfigSnapshot::new(catalog, beacon, sinks)
    }

    fn scheduler(
        gateway: ScriptedGateway,
        scanner: ScriptedScanner,
        num_wifi_scan: u32,
    ) -> (
        BeaconScheduler<ScriptedGateway, ScriptedScanner>,
        Arc<ScriptedGateway>,
        Arc<ScriptedScanner>,
        SharedBuffer,
    ) {
        let gateway = Arc::new(gateway);
        let scanner = Arc::new(scanner);
        let buffer = SharedBuffer::default();
        let dispatcher = Dispatcher::with_console(DispatcherConfig::default(), Box::new(buffer.clone()));
        let config = SharedConfig::new(snapshot(num_wifi_scan, ApiCredentials::new("user", "pw")));
        let scheduler = BeaconScheduler::new(
            Arc::clone(&gateway),
            Arc::clone(&scanner),
            config,
            Arc::new(dispatcher),
        );
        (scheduler, gateway, scanner, buffer)
    }

    fn gateway_fix(hdop: f64, valid: bool) -> GatewayFix {
        GatewayFix::new(40.70, -74.00, hdop, valid, Utc::now())
    }

    // =========================================================================
    // Tick behaviour
    // =========================================================================

    #[tokio::test]
    async fn test_excellent_fix_skips_scanning() {
        let (mut scheduler, _, scanner, buffer) = scheduler(
            ScriptedGateway::returning(gateway_fix(1.0, true)),
            ScriptedScanner::seeing(&["aa:bb:cc:dd:ee:01"]),
            1,
        );

        let report = scheduler.tick().await;

        assert_eq!(scanner.scans.load(Ordering::SeqCst), 0);
        assert_eq!(report.scans, 0);
        assert_eq!(
            report.phases,
            vec![
                TickPhase::Idle,
                TickPhase::Selecting,
                TickPhase::Encoding,
                TickPhase::Dispatching,
                TickPhase::Idle
            ]
        );
        assert_eq!(report.fix().unwrap().source, FixSource::Gateway);
        assert!(buffer.contents().contains("4042.0000,N,07400.0000,W"));
    }

    #[tokio::test]
    async fn test_poor_fix_scans_and_uses_wifi() {
        let (mut scheduler, _, scanner, buffer) = scheduler(
            ScriptedGateway::returning(gateway_fix(8.0, true)),
            ScriptedScanner::seeing(&["aa:bb:cc:dd:ee:01"]),
            3,
        );

        let report = scheduler.tick().await;

        assert_eq!(scanner.scans.load(Ordering::SeqCst), 3);
        assert_eq!(report.scans, 3);
        assert!(report.visited(TickPhase::Scanning));
        let fix = report.fix().unwrap();
        assert_eq!(fix.source, FixSource::Wifi);
        assert_eq!((fix.latitude, fix.longitude), (40.71, -74.01));
        assert!(buffer.contents().contains("4042.6000,N,07400.6000,W"));
        assert_eq!(report.dispatch.unwrap().delivered(), 1);
    }

    #[tokio::test]
    async fn test_no_fix_returns_to_idle_without_dispatch() {
        let (mut scheduler, _, _, buffer) = scheduler(
            ScriptedGateway::returning(gateway_fix(8.0, false)),
            ScriptedScanner::seeing(&["11:22:33:44:55:66"]),
            1,
        );

        let report = scheduler.tick().await;

        assert_eq!(
            report.phases,
            vec![
                TickPhase::Idle,
                TickPhase::Scanning,
                TickPhase::Selecting,
                TickPhase::Idle
            ]
        );
        assert!(matches!(
            report.selection,
            Err(SelectionError::NoFixAvailable { valid: false, .. })
        ));
        assert!(report.dispatch.is_none());
        assert!(buffer.contents().is_empty());
    }

    #[tokio::test]
    async fn test_gateway_failure_counts_as_invalid_fix() {
        let (mut scheduler, _, scanner, _) = scheduler(
            ScriptedGateway::failing(),
            ScriptedScanner::seeing(&["aa:bb:cc:dd:ee:01"]),
            1,
        );

        let report = scheduler.tick().await;

        assert!(!report.gateway.valid);
        assert!(report.gateway.hdop.is_infinite());
        assert_eq!(scanner.scans.load(Ordering::SeqCst), 1);
        assert_eq!(report.fix().unwrap().source, FixSource::Wifi);
    }

    #[tokio::test]
    async fn test_gateway_timeout_counts_as_invalid_fix() {
        let (mut scheduler, gateway, _, _) = scheduler(
            ScriptedGateway::returning(gateway_fix(1.0, true)).with_delay(Duration::from_secs(5)),
            ScriptedScanner::seeing(&[]),
            1,
        );

        let report = scheduler.tick().await;

        assert_eq!(gateway.reads.load(Ordering::SeqCst), 1);
        assert!(!report.gateway.valid);
        assert!(report.fix().is_none());
    }

    // =========================================================================
    // Configuration changes
    // =========================================================================

    #[tokio::test]
    async fn test_credentials_pushed_only_when_changed() {
        let (mut scheduler, gateway, _, _) = scheduler(
            ScriptedGateway::returning(gateway_fix(1.0, true)),
            ScriptedScanner::seeing(&[]),
            1,
        );

        scheduler.tick().await;
        scheduler.tick().await;
        assert_eq!(gateway.credential_pushes.load(Ordering::SeqCst), 1);

        // Same credentials in a new generation: nothing to push.
        let config = scheduler.config().clone();
        config.replace(snapshot(1, ApiCredentials::new("user", "pw")));
        scheduler.tick().await;
        assert_eq!(gateway.credential_pushes.load(Ordering::SeqCst), 1);

        config.replace(snapshot(1, ApiCredentials::new("user", "rotated")));
        let report = scheduler.tick().await;
        assert_eq!(report.generation, 2);
        assert_eq!(gateway.credential_pushes.load(Ordering::SeqCst), 2);
    }

    // =========================================================================
    // Run loop
    // =========================================================================

    #[tokio::test]
    async fn test_run_ticks_until_cancelled() {
        let (scheduler, gateway, _, _) = scheduler(
            ScriptedGateway::returning(gateway_fix(1.0, true)),
            ScriptedScanner::seeing(&[]),
            1,
        );
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(shutdown.clone()));

        tokio::time::sleep(Duration::from_millis(150)).await;
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("scheduler should stop after cancellation")
            .unwrap();

        let reads = gateway.reads.load(Ordering::SeqCst);
        assert!(reads >= 2, "expected several ticks, got {reads}");

        // No tick after shutdown.
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(gateway.reads.load(Ordering::SeqCst), reads);
    }

    #[tokio::test]
    async fn test_in_flight_tick_completes_on_shutdown() {
        let (scheduler, gateway, _, buffer) = scheduler(
            ScriptedGateway::returning(gateway_fix(1.0, true)).with_delay(Duration::from_millis(60)),
            ScriptedScanner::seeing(&[]),
            1,
        );
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(shutdown.clone()));

        // Cancel while the first gateway read is still pending.
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(gateway.reads.load(Ordering::SeqCst), 1);
        assert!(buffer.contents().starts_with("$GPRMC"));
    }

    #[tokio::test]
    async fn test_timer_periods_are_clamped() {
        assert_eq!(periodic(Duration::ZERO, Instant::now()).period(), MIN_PERIOD);
        assert_eq!(periodic(Duration::MAX, Instant::now()).period(), MAX_PERIOD);

        let start = one_period_from_now(Duration::MAX);
        assert!(start <= Instant::now() + MAX_PERIOD);
    }
}
