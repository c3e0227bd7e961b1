//! Integrationstests: Broadcast-Loop, Registries und gezaehlter Shutdown

use std::sync::Arc;
use std::time::Duration;

use levelcast_audio::{
    frame_relay, quelle_auswaehlen, CaptureConfig, Frame, ProcessorConfig, QuellenArt,
    SignalProcessor,
};
use levelcast_broadcast::{
    BroadcastConfig, BroadcastLoop, EchoCounters, EchoErgebnis, Schliessbar, ShutdownAusgang,
    ShutdownConfig, ShutdownCoordinator, SubscriberRegistry,
};
use levelcast_protocol::{ShutdownPhase, WaveformUpdate};

struct Pipeline {
    audio: SubscriberRegistry<String>,
    waveform: SubscriberRegistry<WaveformUpdate>,
    koordinator: ShutdownCoordinator,
    lp: BroadcastLoop,
    producer: levelcast_audio::FrameProducer,
}

fn pipeline(schwelle: Option<u64>) -> Pipeline {
    let audio = SubscriberRegistry::<String>::neu("audio");
    let waveform = SubscriberRegistry::<WaveformUpdate>::neu("waveform");
    let zaehler = Arc::new(EchoCounters::neu());
    let registries: Vec<Arc<dyn Schliessbar>> =
        vec![Arc::new(audio.clone()), Arc::new(waveform.clone())];
    let koordinator = ShutdownCoordinator::neu(
        ShutdownConfig {
            echo_schwelle: schwelle,
            report_timeout: Duration::from_secs(5),
        },
        Arc::clone(&zaehler),
        registries,
    );

    let (producer, consumer) = frame_relay(10, 8);
    let lp = BroadcastLoop::neu(
        BroadcastConfig {
            tick: Duration::from_millis(250),
            pop_timeout: Duration::from_millis(50),
            meter_intervall: Duration::from_secs(5),
        },
        consumer,
        SignalProcessor::new(ProcessorConfig::default()),
        audio.clone(),
        zaehler,
        koordinator.stop_signal(),
    );

    Pipeline {
        audio,
        waveform,
        koordinator,
        lp,
        producer,
    }
}

#[tokio::test(start_paused = true)]
async fn drei_bestaetigungen_loesen_shutdown_aus() {
    let p = pipeline(Some(3));
    let mut a = p.audio.hinzufuegen(Some("a".into())).unwrap();
    let mut b = p.audio.hinzufuegen(Some("b".into())).unwrap();
    let mut w = p.waveform.hinzufuegen(None).unwrap();
    p.producer.push(Frame::from(vec![0.4; 8]));

    let loop_task = tokio::spawn(p.lp.starten());

    // Drei Nachrichten pro Subscriber abwarten und jeweils bestaetigen
    for _ in 0..3 {
        assert!(a.naechste().await.is_some());
        assert!(b.naechste().await.is_some());
    }
    let k = &p.koordinator;
    assert!(matches!(k.echo_erfassen(0.1), EchoErgebnis::Gezaehlt { echoed: 1 }));
    assert!(matches!(k.echo_erfassen(0.2), EchoErgebnis::Gezaehlt { echoed: 2 }));
    assert!(matches!(
        k.echo_erfassen(0.3),
        EchoErgebnis::SchwelleErreicht(_)
    ));
    assert_ne!(k.phase(), ShutdownPhase::Running);

    // Loop endet innerhalb eines Ticks
    let statistik = tokio::time::timeout(Duration::from_millis(300), loop_task)
        .await
        .expect("Broadcast-Loop sollte nach einem Tick enden")
        .unwrap();
    assert!(statistik.ticks >= 3);

    // Alle Verbindungen beider Registries sind getrennt
    assert!(p.audio.ist_leer());
    assert!(p.waveform.ist_leer());
    assert_eq!(a.naechste().await, None);
    assert_eq!(b.naechste().await, None);
    assert!(w.naechste().await.is_none());

    let zusammenfassung = k.zaehler().zusammenfassung();
    assert_eq!(zusammenfassung.events_echoed, 3);
    assert!(zusammenfassung.events_fired >= 6);
    assert_eq!(zusammenfassung.excess_echoes, 0);
    assert_eq!(zusammenfassung.duration_min, Some(0.1));
    assert_eq!(zusammenfassung.duration_max, Some(0.3));
}

#[tokio::test(start_paused = true)]
async fn ohne_abschlussbericht_endet_nach_timeout() {
    let p = pipeline(Some(1));
    let k = p.koordinator.clone();
    let loop_task = tokio::spawn(p.lp.starten());

    let start = tokio::time::Instant::now();
    k.zaehler().fired_addieren(1);
    assert!(matches!(k.echo_erfassen(0.5), EchoErgebnis::SchwelleErreicht(_)));

    k.beendet().await;
    assert!(start.elapsed() >= Duration::from_secs(5));
    assert_eq!(k.ausgang(), Some(ShutdownAusgang::OhneAbschlussbericht));
    assert_eq!(k.phase(), ShutdownPhase::Terminated);
    loop_task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn abschlussbericht_verkuerzt_wartezeit() {
    let p = pipeline(Some(1));
    let k = p.koordinator.clone();
    let _loop_task = tokio::spawn(p.lp.starten());

    let start = tokio::time::Instant::now();
    k.echo_erfassen(0.5);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(k.phase(), ShutdownPhase::AwaitingFinalReport);

    k.final_report_empfangen(serde_json::json!({"events_received": 12}));
    k.beendet().await;

    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(k.ausgang(), Some(ShutdownAusgang::MitAbschlussbericht));
    let bericht = k.final_report().unwrap();
    assert_eq!(bericht.inhalt["events_received"], 12);
}

#[tokio::test(start_paused = true)]
async fn ohne_schwelle_laeuft_pipeline_weiter() {
    let p = pipeline(None);
    let mut a = p.audio.hinzufuegen(None).unwrap();
    let _loop_task = tokio::spawn(p.lp.starten());

    for _ in 0..10 {
        assert!(a.naechste().await.is_some());
        p.koordinator.echo_erfassen(0.1);
    }
    assert_eq!(p.koordinator.phase(), ShutdownPhase::Running);
    assert_eq!(p.audio.anzahl(), 1);
}

#[tokio::test(start_paused = true)]
async fn neue_verbindungen_nach_shutdown_abgewiesen() {
    let p = pipeline(Some(1));
    let _loop_task = tokio::spawn(p.lp.starten());
    p.koordinator.echo_erfassen(0.1);
    tokio::task::yield_now().await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(p.audio.hinzufuegen(None).is_err());
    assert!(p.waveform.hinzufuegen(None).is_err());
}

#[tokio::test(start_paused = true)]
async fn entfernen_waehrend_broadcast_liefert_nichts_mehr() {
    let p = pipeline(None);
    let mut bleibt = p.audio.hinzufuegen(None).unwrap();
    let mut geht = p.audio.hinzufuegen(None).unwrap();
    let _loop_task = tokio::spawn(p.lp.starten());

    assert!(geht.naechste().await.is_some());
    p.audio.entfernen(&geht.id());

    for _ in 0..4 {
        assert!(bleibt.naechste().await.is_some());
    }
    assert_eq!(geht.naechste().await, None);
    assert_eq!(p.audio.anzahl(), 1);
}

// Echte Threads: hier laeuft die Zeit nicht pausiert
#[tokio::test]
async fn sinusquelle_liefert_hoerbaren_pegel() {
    let audio = SubscriberRegistry::<String>::neu("audio");
    let zaehler = Arc::new(EchoCounters::neu());
    let (_stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    let config = CaptureConfig::default();
    let (producer, consumer) = frame_relay(10, config.frame_size);

    let quelle = quelle_auswaehlen(QuellenArt::Sine, &config).unwrap();
    let capture = quelle.starten(producer).unwrap();

    let mut lp = BroadcastLoop::neu(
        BroadcastConfig {
            tick: Duration::from_millis(100),
            pop_timeout: Duration::from_millis(100),
            meter_intervall: Duration::from_secs(5),
        },
        consumer,
        SignalProcessor::new(ProcessorConfig::default()),
        audio.clone(),
        zaehler,
        stop_rx,
    )
    .mit_capture(capture);

    let mut empfang = audio.hinzufuegen(None).unwrap();
    let ergebnis = lp.tick().await;
    // Normalisierter Sinus: RMS etwa 1/sqrt(2) -> Pegel um 354
    assert!((340..=370).contains(&ergebnis.sample.volume_level));

    let text = empfang.naechste().await.unwrap();
    let wert: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert!(wert["volume"].as_u64().unwrap() > 0);
    assert!(wert["rms"].as_f64().unwrap() > 0.6);
}
