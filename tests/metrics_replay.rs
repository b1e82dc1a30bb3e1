//! Replaying a trainer results log into an event file.

use std::fs;

use endoyolo::metrics::events::{decode_records, Event, EventPayload, SummaryPayload};
use endoyolo::metrics::{replay_results_csv, EventFileWriter, ScalarEvent};
use prost::Message;

const RESULTS: &str = "\
               epoch,      train/box_loss,      train/obj_loss,   metrics/precision,    metrics/mAP_0.5
                   0,             0.11368,            0.028718,             0.00213,            0.01342
                   1,            0.092563,            0.031266,              0.1347,            0.08291
                   2,            0.078314,            0.029113,             0.41872,            0.31005
";

fn scalars(events: &[Event]) -> Vec<(String, f32, i64)> {
    let mut out = Vec::new();
    for event in events {
        let Some(EventPayload::Summary(summary)) = &event.payload else {
            continue;
        };
        for value in &summary.value {
            if let Some(SummaryPayload::SimpleValue(v)) = &value.payload {
                out.push((value.tag.clone(), *v, event.step));
            }
        }
    }
    out
}

#[test]
fn results_log_replays_into_event_file() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let results = temp.path().join("results.csv");
    fs::write(&results, RESULTS).expect("write results");
    let log_dir = temp.path().join("tb");

    let mut writer = EventFileWriter::create(&log_dir).expect("create event writer");
    let summary = replay_results_csv(&results, &mut writer).expect("replay");

    assert_eq!(summary.rows, 3);
    assert_eq!(summary.events, 12);
    assert_eq!(summary.metric_columns.len(), 4);

    let file_name = writer
        .path()
        .file_name()
        .and_then(|n| n.to_str())
        .expect("file name")
        .to_string();
    assert!(file_name.starts_with("events.out.tfevents."), "{file_name}");
    assert!(writer.path().starts_with(&log_dir));

    let bytes = fs::read(writer.path()).expect("read event file");
    let events: Vec<Event> = decode_records(&bytes)
        .expect("decode records")
        .iter()
        .map(|payload| Event::decode(payload.as_slice()).expect("decode event"))
        .collect();

    // Version header plus one event per scalar.
    assert_eq!(events.len(), 13);
    let scalars = scalars(&events);
    assert_eq!(scalars.len(), 12);
    assert_eq!(scalars[0], ("train/box_loss".to_string(), 0.11368_f32, 0));
    assert_eq!(
        scalars.last().cloned(),
        Some(("metrics/mAP_0.5".to_string(), 0.31005_f32, 2))
    );
}

#[test]
fn in_memory_sink_sees_the_same_scalars() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let results = temp.path().join("results.csv");
    fs::write(&results, RESULTS).expect("write results");

    let mut events: Vec<ScalarEvent> = Vec::new();
    replay_results_csv(&results, &mut events).expect("replay");

    let map50: Vec<(i64, f64)> = events
        .iter()
        .filter(|e| e.tag == "metrics/mAP_0.5")
        .map(|e| (e.step, e.value))
        .collect();
    assert_eq!(map50, vec![(0, 0.01342), (1, 0.08291), (2, 0.31005)]);
}
