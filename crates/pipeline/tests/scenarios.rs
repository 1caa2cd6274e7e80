//! End-to-end scenarios through the full pipeline.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use vigil_core::config::GeofenceConfig;
use vigil_core::{
    ingest, AlertType, Coordinates, Ingested, Metric, Responder, ResponderClass, SafeZone, Sample,
    SampleValue, StaticRegistry, SubjectStatus,
};
use vigil_geofence::ZoneEventKind;
use vigil_notify::{Dispatcher, Notification, Notifier, NotifyError, TemplateRenderer};
use vigil_pipeline::{
    ChannelSink, Engine, EventSink, FanoutSink, NotifyingSink, Pipeline, PipelineEvent,
    PipelineSettings, WorkerPool,
};
use vigil_rules::{AuditLog, AuditPhase, AuditQuery, EscalationAction, LocationRisk};
use vigil_vitals::Severity;

const HOME: Coordinates = Coordinates { lat: 6.9271, lng: 79.8612 };
/// Roughly 1.1 km north of home.
const AWAY: Coordinates = Coordinates { lat: 6.9371, lng: 79.8612 };

// ── Fixtures ────────────────────────────────────────────────────────

fn home_zone() -> SafeZone {
    SafeZone {
        id: "home".to_string(),
        name: "Home".to_string(),
        center: HOME,
        radius_meters: 200.0,
        active: true,
        trusted: false,
    }
}

fn responder(id: &str, class: ResponderClass, lat_offset: f64) -> Responder {
    Responder {
        id: id.to_string(),
        name: format!("Unit {id}"),
        class,
        location: Coordinates::new(HOME.lat + lat_offset, HOME.lng),
        contact: format!("{id}@example.org"),
    }
}

/// Emergency after 300s continuously outside.
fn settings() -> PipelineSettings {
    PipelineSettings {
        geofence: GeofenceConfig {
            emergency_after_secs: 300,
            sampling_interval_secs: 60,
        },
        ..Default::default()
    }
}

fn pipeline_with(registry: StaticRegistry, audit: AuditLog) -> Arc<Pipeline> {
    Arc::new(Pipeline::new(settings(), Arc::new(registry), audit))
}

fn engine_with(registry: StaticRegistry) -> (Engine, AuditLog) {
    let audit = AuditLog::new();
    let pipeline = pipeline_with(registry, audit.clone());
    let (sink, _rx) = ChannelSink::channel(16);
    (Engine::new(pipeline, Arc::new(sink)), audit)
}

fn night() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 23, 0, 0).unwrap()
}

fn day() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

/// Fix timestamps one minute apart.
struct Minutes {
    next: DateTime<Utc>,
}

impl Minutes {
    fn from(start: DateTime<Utc>) -> Self {
        Self { next: start }
    }

    fn next(&mut self) -> DateTime<Utc> {
        let at = self.next;
        self.next = at + Duration::seconds(60);
        at
    }
}

fn heart_rate(subject: &str, bpm: f64, at: DateTime<Utc>) -> Ingested {
    ingest(Sample::Vitals {
        subject_id: subject.to_string(),
        metric: Metric::HeartRate,
        value: SampleValue::Number(bpm),
        timestamp: Some(at),
    })
    .unwrap()
}

fn location(subject: &str, at_pos: Coordinates, at: DateTime<Utc>) -> Ingested {
    ingest(Sample::Location {
        subject_id: subject.to_string(),
        lat: at_pos.lat,
        lng: at_pos.lng,
        timestamp: Some(at),
    })
    .unwrap()
}

fn alert(
    subject: &str,
    alert_type: AlertType,
    status: Option<SubjectStatus>,
    at_pos: Option<Coordinates>,
    at: DateTime<Utc>,
) -> Ingested {
    ingest(Sample::Alert {
        subject_id: subject.to_string(),
        alert_type,
        status,
        lat: at_pos.map(|p| p.lat),
        lng: at_pos.map(|p| p.lng),
        timestamp: Some(at),
    })
    .unwrap()
}

fn zone_kinds(events: &[PipelineEvent]) -> Vec<ZoneEventKind> {
    events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::Zone(z) => Some(z.kind),
            _ => None,
        })
        .collect()
}

fn incidents(events: &[PipelineEvent]) -> Vec<&vigil_pipeline::Incident> {
    events
        .iter()
        .filter_map(|e| match e {
            PipelineEvent::Incident(i) => Some(i),
            _ => None,
        })
        .collect()
}

// ── Vitals ──────────────────────────────────────────────────────────

#[test]
fn heart_rate_spike_escalates_from_warning_to_danger() {
    let (mut engine, audit) = engine_with(StaticRegistry::default());

    for bpm in [70.0, 71.0, 69.0, 70.0, 72.0] {
        let events = engine.process(heart_rate("s1", bpm, day()));
        assert!(!events.iter().any(|e| matches!(e, PipelineEvent::Anomaly(_))));
        assert!(events.iter().any(|e| matches!(e, PipelineEvent::Risk(_))));
    }

    let events = engine.process(heart_rate("s1", 118.0, day()));
    let anomaly = events
        .iter()
        .find_map(|e| match e {
            PipelineEvent::Anomaly(a) => Some(a),
            _ => None,
        })
        .expect("118 bpm should be flagged");
    assert_eq!(anomaly.result.severity, Severity::Warning);
    let warned = incidents(&events);
    assert_eq!(warned.len(), 1);
    assert_eq!(warned[0].descriptor.alert_type, AlertType::Heartbeat);
    assert_eq!(warned[0].descriptor.subject_status, SubjectStatus::Normal);
    assert_eq!(warned[0].action, EscalationAction::NotifyDashboard);

    // 125 is past the 120 bpm danger row of the heart-rate table, not a warning.
    let events = engine.process(heart_rate("s1", 125.0, day()));
    let danger = incidents(&events);
    assert_eq!(danger.len(), 1);
    assert_eq!(danger[0].descriptor.subject_status, SubjectStatus::Distress);
    assert!(danger[0].dispatches.is_empty());

    let anomalies = audit.query(
        "s1",
        &AuditQuery {
            phase: Some(AuditPhase::Anomaly),
            ..Default::default()
        },
    );
    assert_eq!(anomalies.len(), 2);
}

#[test]
fn insufficient_history_never_flags() {
    let (mut engine, _) = engine_with(StaticRegistry::default());
    for bpm in [70.0, 71.0, 180.0] {
        let events = engine.process(heart_rate("s1", bpm, day()));
        assert!(incidents(&events).is_empty());
    }
}

// ── Geofence ────────────────────────────────────────────────────────

#[tokio::test]
async fn emergency_fires_once_and_survives_reentry_until_cleared() {
    let mut t = Minutes::from(day());
    let (mut engine, audit) = engine_with(StaticRegistry::new(vec![home_zone()], Vec::new()));

    let events = engine.process(location("s1", HOME, t.next()));
    assert!(zone_kinds(&events).is_empty());

    let events = engine.process(location("s1", AWAY, t.next()));
    assert_eq!(zone_kinds(&events), vec![ZoneEventKind::ZoneExit]);
    assert_eq!(incidents(&events).len(), 1);

    let mut emergencies = 0;
    for _ in 0..8 {
        let events = engine.process(location("s1", AWAY, t.next()));
        emergencies += zone_kinds(&events)
            .iter()
            .filter(|k| **k == ZoneEventKind::Emergency)
            .count();
    }
    assert_eq!(emergencies, 1);

    let events = engine.process(location("s1", HOME, t.next()));
    assert_eq!(zone_kinds(&events), vec![ZoneEventKind::ZoneEnter]);
    assert!(engine.subject("s1").unwrap().geofence.emergency_active());

    // A latched subject that leaves again does not fire a second emergency.
    engine.process(location("s1", AWAY, t.next()));
    for _ in 0..6 {
        let events = engine.process(location("s1", AWAY, t.next()));
        assert!(!zone_kinds(&events).contains(&ZoneEventKind::Emergency));
    }

    engine.process(location("s1", HOME, t.next()));
    engine.clear_emergency("s1").await;
    assert!(!engine.subject("s1").unwrap().geofence.emergency_active());

    let acked = audit.query(
        "s1",
        &AuditQuery {
            phase: Some(AuditPhase::Acknowledge),
            ..Default::default()
        },
    );
    assert_eq!(acked.len(), 1);

    // Clearing again is a no-op.
    engine.clear_emergency("s1").await;
    assert_eq!(
        audit
            .query(
                "s1",
                &AuditQuery {
                    phase: Some(AuditPhase::Acknowledge),
                    ..Default::default()
                }
            )
            .len(),
        1
    );
}

#[tokio::test]
async fn clearing_starts_a_fresh_emergency_cycle() {
    let mut t = Minutes::from(day());
    let (mut engine, _) = engine_with(StaticRegistry::new(vec![home_zone()], Vec::new()));

    engine.process(location("s1", HOME, t.next()));
    engine.process(location("s1", AWAY, t.next()));
    for _ in 0..5 {
        engine.process(location("s1", AWAY, t.next()));
    }
    assert!(engine.subject("s1").unwrap().geofence.emergency_active());

    engine.process(location("s1", HOME, t.next()));
    engine.clear_emergency("s1").await;
    assert!(!engine.subject("s1").unwrap().geofence.emergency_active());

    let events = engine.process(location("s1", AWAY, t.next()));
    assert_eq!(zone_kinds(&events), vec![ZoneEventKind::ZoneExit]);
    let mut fired = Vec::new();
    for _ in 0..5 {
        fired.extend(zone_kinds(&engine.process(location("s1", AWAY, t.next()))));
    }
    assert_eq!(fired, vec![ZoneEventKind::Emergency]);
}

#[test]
fn sparse_fixes_reach_the_emergency_on_elapsed_time() {
    let audit = AuditLog::new();
    let pipeline = Arc::new(Pipeline::new(
        PipelineSettings::default(),
        Arc::new(StaticRegistry::new(vec![home_zone()], Vec::new())),
        audit,
    ));
    let (sink, _rx) = ChannelSink::channel(16);
    let mut engine = Engine::new(pipeline, Arc::new(sink));
    let t0 = day();

    engine.process(location("s1", HOME, t0));
    let events = engine.process(location("s1", AWAY, t0 + Duration::seconds(10)));
    assert_eq!(zone_kinds(&events), vec![ZoneEventKind::ZoneExit]);

    let events = engine.process(location("s1", AWAY, t0 + Duration::seconds(3600)));
    assert_eq!(zone_kinds(&events), vec![ZoneEventKind::Emergency]);
    assert_eq!(incidents(&events).len(), 1);
    assert_eq!(
        engine.subject("s1").unwrap().geofence.membership().outside_since_seconds,
        3590
    );
}

#[test]
fn quiet_device_outside_escalates_on_the_clock() {
    let (mut engine, audit) = engine_with(StaticRegistry::new(vec![home_zone()], Vec::new()));
    let t0 = day();

    engine.process(location("s1", HOME, t0));
    engine.process(location("s1", AWAY, t0 + Duration::seconds(30)));

    assert!(engine.advance_clock(t0 + Duration::seconds(200)).is_empty());
    let events = engine.advance_clock(t0 + Duration::seconds(400));
    assert_eq!(zone_kinds(&events), vec![ZoneEventKind::Emergency]);
    let raised = incidents(&events);
    assert_eq!(raised.len(), 1);
    assert_eq!(raised[0].descriptor.alert_type, AlertType::SafetyZone);
    assert_eq!(raised[0].location, Some(AWAY));

    // Latched: more quiet time adds nothing.
    assert!(engine.advance_clock(t0 + Duration::seconds(4000)).is_empty());

    let zone_audit = audit.query(
        "s1",
        &AuditQuery {
            phase: Some(AuditPhase::Zone),
            ..Default::default()
        },
    );
    assert_eq!(zone_audit.len(), 2);
}

#[test]
fn clock_ticks_leave_subjects_at_home_alone() {
    let (mut engine, _) = engine_with(StaticRegistry::new(vec![home_zone()], Vec::new()));
    engine.process(location("s1", HOME, day()));
    assert!(engine.advance_clock(day() + Duration::hours(6)).is_empty());
    assert!(!engine.subject("s1").unwrap().geofence.emergency_active());
}

#[test]
fn emergency_at_night_dispatches_responders() {
    let mut t = Minutes::from(night());
    let registry = StaticRegistry::new(
        vec![home_zone()],
        vec![
            responder("sec-1", ResponderClass::Security, 0.02),
            responder("pol-1", ResponderClass::Police, 0.001),
        ],
    );
    let (mut engine, _) = engine_with(registry);

    engine.process(location("s1", HOME, t.next()));
    engine.process(location("s1", AWAY, t.next()));
    let mut last = Vec::new();
    for _ in 0..5 {
        last = engine.process(location("s1", AWAY, t.next()));
    }
    let raised = incidents(&last);
    assert_eq!(raised.len(), 1);
    assert_eq!(raised[0].descriptor.alert_type, AlertType::SafetyZone);
    assert_eq!(raised[0].descriptor.location_risk, LocationRisk::High);
    assert_eq!(raised[0].action, EscalationAction::NotifyResponder);
    // Police are not sent for a responder-level incident.
    let ids: Vec<&str> = raised[0].dispatches.iter().map(|d| d.responder_id.as_str()).collect();
    assert_eq!(ids, vec!["sec-1"]);
}

#[test]
fn missing_registry_treats_subject_as_outside() {
    struct Unloaded;
    impl vigil_core::RegistrySource for Unloaded {
        fn zones(&self) -> vigil_core::Result<Arc<[SafeZone]>> {
            Err(vigil_core::VigilError::StaleZoneConfiguration("not loaded".into()))
        }
        fn responders(&self) -> Arc<[Responder]> {
            Vec::<Responder>::new().into()
        }
    }

    let pipeline = Arc::new(Pipeline::new(settings(), Arc::new(Unloaded), AuditLog::new()));
    let (sink, _rx) = ChannelSink::channel(4);
    let mut engine = Engine::new(pipeline, Arc::new(sink));

    let events = engine.process(location("s1", HOME, day()));
    assert_eq!(zone_kinds(&events), vec![ZoneEventKind::ZoneExit]);
    assert!(!engine.subject("s1").unwrap().geofence.membership().inside_active_zone);
}

// ── Classification and dispatch ─────────────────────────────────────

#[test]
fn panic_in_distress_at_night_escalates_to_authorities() {
    let registry = StaticRegistry::new(
        vec![home_zone()],
        vec![
            responder("sec-1", ResponderClass::Security, 0.0005),
            responder("pol-1", ResponderClass::Police, 0.002),
            responder("med-1", ResponderClass::Medical, 0.001),
        ],
    );
    let (mut engine, audit) = engine_with(registry);

    let events = engine.process(alert(
        "s1",
        AlertType::Panic,
        Some(SubjectStatus::Distress),
        Some(HOME),
        night(),
    ));
    let raised = incidents(&events);
    assert_eq!(raised.len(), 1);
    assert_eq!(raised[0].action, EscalationAction::EscalateAuthorities);
    assert_eq!(raised[0].rule, "panic_with_distress");

    let ids: Vec<&str> = raised[0].dispatches.iter().map(|d| d.responder_id.as_str()).collect();
    assert_eq!(ids, vec!["med-1", "pol-1"]);

    let classified = audit.query(
        "s1",
        &AuditQuery {
            phase: Some(AuditPhase::Classification),
            ..Default::default()
        },
    );
    assert_eq!(classified.len(), 1);
    assert_eq!(classified[0].message, "panic -> escalate_authorities");
}

#[test]
fn dispatch_is_capped_and_sorted_by_distance() {
    let registry = StaticRegistry::new(
        vec![home_zone()],
        vec![
            responder("r5", ResponderClass::Security, 0.05),
            responder("r2", ResponderClass::Medical, 0.002),
            responder("r4", ResponderClass::Security, 0.04),
            responder("r1", ResponderClass::Security, 0.001),
            responder("r3", ResponderClass::Medical, 0.03),
        ],
    );
    let (mut engine, _) = engine_with(registry);

    let events = engine.process(alert(
        "s1",
        AlertType::Fall,
        Some(SubjectStatus::Unresponsive),
        Some(HOME),
        day(),
    ));
    let raised = incidents(&events);
    assert_eq!(raised[0].action, EscalationAction::NotifyResponder);
    let ids: Vec<&str> = raised[0].dispatches.iter().map(|d| d.responder_id.as_str()).collect();
    assert_eq!(ids, vec!["r1", "r2"]);
    assert!(raised[0].dispatches[0].distance_km <= raised[0].dispatches[1].distance_km);
}

#[test]
fn dispatch_without_location_is_skipped_but_incident_recorded() {
    let registry = StaticRegistry::new(
        vec![home_zone()],
        vec![responder("pol-1", ResponderClass::Police, 0.001)],
    );
    let (mut engine, audit) = engine_with(registry);

    let events = engine.process(alert("s1", AlertType::Panic, Some(SubjectStatus::Distress), None, day()));
    let raised = incidents(&events);
    assert_eq!(raised[0].action, EscalationAction::EscalateAuthorities);
    assert!(raised[0].location.is_none());
    assert!(raised[0].dispatches.is_empty());

    let dispatch = audit.query(
        "s1",
        &AuditQuery {
            phase: Some(AuditPhase::Dispatch),
            ..Default::default()
        },
    );
    assert_eq!(dispatch[0].message, "no known location, dispatch skipped");
}

#[test]
fn fall_without_status_goes_to_dashboard() {
    let (mut engine, _) = engine_with(StaticRegistry::new(vec![home_zone()], Vec::new()));
    let events = engine.process(alert("s1", AlertType::Fall, None, Some(HOME), night()));
    assert_eq!(incidents(&events)[0].action, EscalationAction::NotifyDashboard);
}

// ── Rejection and delivery ──────────────────────────────────────────

#[tokio::test]
async fn invalid_sample_is_rejected_before_any_stage() {
    let audit = AuditLog::new();
    let pipeline = pipeline_with(StaticRegistry::default(), audit.clone());
    let (sink, mut rx) = ChannelSink::channel(4);
    let mut engine = Engine::new(pipeline, Arc::new(sink));

    engine
        .submit_sample(
            Sample::Vitals {
                subject_id: "s1".to_string(),
                metric: Metric::HeartRate,
                value: SampleValue::Number(f64::NAN),
                timestamp: None,
            },
            Some(7),
        )
        .await;

    match rx.recv().await {
        Some(PipelineEvent::Rejected(r)) => {
            assert_eq!(r.subject_id.as_deref(), Some("s1"));
            assert_eq!(r.line, Some(7));
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert!(engine.subject("s1").is_none());
    assert_eq!(
        audit
            .query(
                "s1",
                &AuditQuery {
                    phase: Some(AuditPhase::Ingestion),
                    ..Default::default()
                }
            )
            .len(),
        1
    );
}

struct FailingNotifier {
    calls: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _notification: &Notification) -> Result<(), NotifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(NotifyError::Delivery("connection refused".into()))
    }

    fn channel_name(&self) -> &str {
        "failing"
    }
}

#[tokio::test]
async fn classification_is_audited_even_when_delivery_fails() {
    let registry: Arc<StaticRegistry> = Arc::new(StaticRegistry::new(
        vec![home_zone()],
        vec![responder("pol-1", ResponderClass::Police, 0.001)],
    ));
    let audit = AuditLog::new();
    let pipeline = Arc::new(Pipeline::new(settings(), registry.clone(), audit.clone()));

    let calls = Arc::new(AtomicUsize::new(0));
    let notifying = NotifyingSink::new(
        Dispatcher::with_defaults(vec![Box::new(FailingNotifier { calls: calls.clone() })]),
        TemplateRenderer::new(),
        registry,
        audit.clone(),
    );
    let (channel, mut rx) = ChannelSink::channel(16);
    let sink: Arc<dyn EventSink> = Arc::new(FanoutSink::new(vec![Arc::new(channel), Arc::new(notifying)]));
    let mut engine = Engine::new(pipeline, sink);

    engine
        .submit(alert("s1", AlertType::Panic, Some(SubjectStatus::Distress), Some(HOME), night()))
        .await;

    assert!(matches!(rx.recv().await, Some(PipelineEvent::Incident(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Newest first: the delivery failure comes after the classification.
    let entries = audit.query("s1", &AuditQuery::default());
    let failed = entries.iter().position(|e| e.phase == AuditPhase::NotifyError);
    let classified = entries.iter().position(|e| e.phase == AuditPhase::Classification);
    match (failed, classified) {
        (Some(f), Some(c)) => assert!(f < c),
        other => panic!("missing audit entries: {other:?}"),
    }
}

// ── Worker pool ─────────────────────────────────────────────────────

#[tokio::test]
async fn worker_pool_keeps_per_subject_order() {
    let mut t = Minutes::from(day());
    let pipeline = pipeline_with(StaticRegistry::new(vec![home_zone()], Vec::new()), AuditLog::new());
    let (sink, mut rx) = ChannelSink::channel(256);
    let mut pool = WorkerPool::new(pipeline, Arc::new(sink), 8);

    for subject in ["a", "b"] {
        pool.submit(location(subject, HOME, t.next())).await.unwrap();
        pool.submit(location(subject, AWAY, t.next())).await.unwrap();
        for _ in 0..5 {
            pool.submit(location(subject, AWAY, t.next())).await.unwrap();
        }
        pool.submit(location(subject, HOME, t.next())).await.unwrap();
        // Queued behind the re-entry, so it clears a latched emergency.
        pool.clear_emergency(subject).await.unwrap();
    }
    assert_eq!(pool.worker_count(), 2);
    pool.shutdown().await;

    let mut per_subject: std::collections::HashMap<String, Vec<&'static str>> = Default::default();
    while let Ok(event) = rx.try_recv() {
        let tag = match &event {
            PipelineEvent::Zone(z) => match z.kind {
                ZoneEventKind::ZoneEnter => "enter",
                ZoneEventKind::ZoneExit => "exit",
                ZoneEventKind::Emergency => "emergency",
            },
            PipelineEvent::EmergencyCleared(_) => "cleared",
            _ => continue,
        };
        per_subject
            .entry(event.subject_id().unwrap_or_default().to_string())
            .or_default()
            .push(tag);
    }

    for subject in ["a", "b"] {
        assert_eq!(
            per_subject.get(subject).map(Vec::as_slice),
            Some(["exit", "emergency", "enter", "cleared"].as_slice()),
            "subject {subject}"
        );
    }
}

#[tokio::test]
async fn worker_pool_ignores_clear_for_unknown_subject() {
    let pipeline = pipeline_with(StaticRegistry::default(), AuditLog::new());
    let (sink, _rx) = ChannelSink::channel(4);
    let mut pool = WorkerPool::new(pipeline, Arc::new(sink), 4);
    pool.clear_emergency("nobody").await.unwrap();
    assert_eq!(pool.worker_count(), 0);
    pool.shutdown().await;
}

#[tokio::test]
async fn worker_pool_tick_escalates_a_quiet_subject() {
    let pipeline = pipeline_with(StaticRegistry::new(vec![home_zone()], Vec::new()), AuditLog::new());
    let (sink, mut rx) = ChannelSink::channel(64);
    let mut pool = WorkerPool::new(pipeline, Arc::new(sink), 8);
    let t0 = day();

    pool.submit(location("a", HOME, t0)).await.unwrap();
    pool.submit(location("a", AWAY, t0 + Duration::seconds(10))).await.unwrap();
    pool.submit(location("b", HOME, t0)).await.unwrap();
    pool.tick(t0 + Duration::seconds(600)).await.unwrap();
    pool.tick(t0 + Duration::seconds(1200)).await.unwrap();
    pool.shutdown().await;

    let mut emergencies = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let PipelineEvent::Zone(z) = &event {
            if z.kind == ZoneEventKind::Emergency {
                emergencies.push(z.subject_id.clone());
            }
        }
    }
    assert_eq!(emergencies, vec!["a".to_string()]);
}

// ── Registry file ───────────────────────────────────────────────────

#[test]
fn registry_rewrite_changes_zone_membership() {
    use vigil_core::RegistrySnapshot;
    use vigil_rules::RegistryLoader;

    let dir = tempfile::tempdir().unwrap();
    let loader = Arc::new(RegistryLoader::new(dir.path().join("registry.yml")));
    let pipeline = Arc::new(Pipeline::new(settings(), loader.clone(), AuditLog::new()));
    let (sink, _rx) = ChannelSink::channel(4);
    let mut engine = Engine::new(pipeline, Arc::new(sink));

    // Nothing loaded yet: stale, so the subject is outside.
    let events = engine.process(location("s1", HOME, day()));
    assert_eq!(zone_kinds(&events), vec![ZoneEventKind::ZoneExit]);

    loader
        .write_snapshot(&RegistrySnapshot {
            zones: vec![home_zone()],
            responders: Vec::new(),
        })
        .unwrap();

    let events = engine.process(location("s1", HOME, day()));
    assert_eq!(zone_kinds(&events), vec![ZoneEventKind::ZoneEnter]);
    assert_eq!(engine.subject("s1").unwrap().geofence.last_zone(), Some("Home"));
}
