//! Tests fuer die WaveformLibrary

use levelcast_broadcast::SubscriberRegistry;
use levelcast_protocol::{WaveformUpdate, WaveformUpload};

use crate::{LibraryError, WaveformLibrary};

fn upload(name: Option<&str>, data: Option<Vec<f64>>) -> WaveformUpload {
    WaveformUpload {
        name: name.map(str::to_string),
        data,
    }
}

fn bibliothek() -> std::sync::Arc<WaveformLibrary> {
    WaveformLibrary::neu(SubscriberRegistry::<WaveformUpdate>::neu("waveform"))
}

#[test]
fn leere_bibliothek() {
    let lib = bibliothek();
    assert!(lib.auflisten().is_empty());
    assert_eq!(lib.anzahl(), 0);
}

#[test]
fn hinzufuegen_haengt_an() {
    let lib = bibliothek();
    lib.hinzufuegen(upload(Some("a"), Some(vec![0.1, 0.2]))).unwrap();
    lib.hinzufuegen(upload(Some("b"), Some(vec![0.3]))).unwrap();

    let liste = lib.auflisten();
    assert_eq!(liste.len(), 2);
    assert_eq!(liste[0].name, "a");
    assert_eq!(liste[1].data, vec![0.3]);
}

#[test]
fn fehlende_oder_leere_felder_abgelehnt() {
    let lib = bibliothek();
    let faelle = [
        upload(None, Some(vec![1.0])),
        upload(Some("x"), None),
        upload(Some(""), Some(vec![1.0])),
        upload(Some("x"), Some(vec![])),
        upload(None, None),
    ];
    for fall in faelle {
        assert!(matches!(
            lib.hinzufuegen(fall),
            Err(LibraryError::FehlendeDaten)
        ));
    }
    assert_eq!(lib.anzahl(), 0);
}

#[test]
fn fehlermeldung_entspricht_api() {
    assert_eq!(LibraryError::FehlendeDaten.to_string(), "Missing name or data");
}

#[tokio::test]
async fn abonnent_bekommt_initialen_stand_und_updates() {
    let lib = bibliothek();
    lib.hinzufuegen(upload(Some("alt"), Some(vec![1.0]))).unwrap();

    let (mut empfang, initial) = lib.abonnieren(Some("peer".into())).unwrap();
    assert_eq!(initial.typ, "update");
    assert_eq!(initial.waveforms.len(), 1);

    let erreicht = lib.hinzufuegen(upload(Some("neu"), Some(vec![2.0]))).unwrap();
    assert_eq!(erreicht, 1);

    let update = empfang.naechste().await.unwrap();
    assert_eq!(update.waveforms.len(), 2);
    assert_eq!(update.waveforms[1].name, "neu");
}

#[tokio::test]
async fn abgemeldeter_abonnent_bekommt_nichts() {
    let lib = bibliothek();
    let (mut empfang, _) = lib.abonnieren(None).unwrap();
    lib.registry().entfernen(&empfang.id());

    let erreicht = lib.hinzufuegen(upload(Some("x"), Some(vec![1.0]))).unwrap();
    assert_eq!(erreicht, 0);
    assert!(empfang.naechste().await.is_none());
}

#[test]
fn geschlossene_registry_weist_abonnenten_ab() {
    let lib = bibliothek();
    lib.registry().alle_schliessen();
    assert!(matches!(
        lib.abonnieren(None),
        Err(LibraryError::Broadcast(_))
    ));
    // Anhaengen funktioniert weiter
    assert!(lib.hinzufuegen(upload(Some("x"), Some(vec![1.0]))).is_ok());
}
