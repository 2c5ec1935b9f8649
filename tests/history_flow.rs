use toodi::chart::RaceChart;
use toodi::{AggregateSettings, EntityKind, Error, HistorySource, load, spawn_load};

const PART_ZERO: &str = r#"[
    {"artistName": "Iskender", "trackName": "Ruido", "endTime": "2023-01-01 10:00", "msPlayed": 180000},
    {"artistName": "Enol", "trackName": "Verano", "endTime": "2023-01-01 10:04", "msPlayed": 15000},
    {"artistName": "Enol", "trackName": "Verano", "endTime": "2023-01-01 10:08", "msPlayed": 200000}
]"#;

const PART_ONE: &str = r#"[
    {"artistName": "Iskender", "trackName": "Ruido", "endTime": "2023-01-02 09:00", "msPlayed": 180000},
    {"artistName": "Lluc", "trackName": "Mar", "endTime": "2023-01-02 09:30", "msPlayed": 90000}
]"#;

#[test]
fn export_directory_loads_into_complete_aggregate() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("StreamingHistory0.json"), PART_ZERO).expect("write");
    std::fs::write(dir.path().join("StreamingHistory1.json"), PART_ONE).expect("write");

    let source = HistorySource::parse(dir.path().to_str().expect("utf8 path"));
    let result = load(&source, AggregateSettings::default()).expect("load");

    let artists: Vec<_> = result
        .top_artists
        .iter()
        .map(|artist| (artist.name.as_str(), artist.ms_played))
        .collect();
    assert_eq!(
        artists,
        [("Iskender", 360000), ("Enol", 200000), ("Lluc", 90000)]
    );
    assert_eq!(result.top_tracks[0].name, "Ruido_Iskender");
    assert_eq!(result.total_playtime_top_track, 360000);

    let json: serde_json::Value = serde_json::to_value(&result).expect("json");
    let days: Vec<_> = json["topForDay"]["artists"]
        .as_object()
        .expect("object")
        .keys()
        .cloned()
        .collect();
    assert_eq!(days, ["2023-01-01", "2023-01-02"]);
    assert_eq!(
        json["topForDay"]["tracks"]["2023-01-02"][1],
        serde_json::json!({"name": "Mar_Lluc", "msPlayed": 90000, "type": "trackName"})
    );

    let frames: Vec<_> = RaceChart::new(&result, EntityKind::Artist, 10).collect();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[1].bars[0].name, "Iskender");
    assert_eq!(frames[1].bars[0].minutes, 6);
}

#[test]
fn background_load_surfaces_format_errors() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("StreamingHistory.json");
    std::fs::write(&path, r#"[{"artistName": "Enol", "msPlayed": 30000}]"#).expect("write");

    let outcome = spawn_load(HistorySource::File(path), AggregateSettings::default()).wait();
    assert!(matches!(outcome, Err(Error::DataFormat { .. })));
}
