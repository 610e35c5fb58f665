use casefeed::{pipeline, write::WriteOutcome, Config, PipelineError};
use httpmock::prelude::*;
use serde_json::{json, Value};

fn row(region: &str, province: &str, cases: i64, date: &str) -> Value {
    json!({
        "data": date,
        "stato": "ITA",
        "codice_regione": 9,
        "denominazione_regione": region,
        "codice_provincia": 48,
        "denominazione_provincia": province,
        "sigla_provincia": "FI",
        "lat": 43.76923077,
        "long": 11.25588885,
        "totale_casi": cases
    })
}

struct Harness {
    feed: MockServer,
    influx: MockServer,
}

impl Harness {
    fn new(rows: Value) -> Self {
        let feed = MockServer::start();
        feed.mock(|when, then| {
            when.method(GET).path("/province.json");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(rows);
        });
        Self {
            feed,
            influx: MockServer::start(),
        }
    }

    fn ping_ok(&self) -> httpmock::Mock<'_> {
        self.influx.mock(|when, then| {
            when.method(GET).path("/ping");
            then.status(204).header("X-Influxdb-Version", "1.8.10");
        })
    }

    fn config(&self) -> Config {
        let mut config = Config::default();
        config.feed_url = self.feed.url("/province.json");
        config.influx.url = self.influx.base_url();
        config
    }
}

#[test]
fn test_single_matching_province_is_written() {
    let h = Harness::new(json!([
        row("Toscana", "Firenze", 5, "2020-03-01 18:00:00"),
        row("Lazio", "Roma", 10, "2020-03-01 18:00:00"),
    ]));
    h.ping_ok();
    let write = h.influx.mock(|when, then| {
        when.method(POST)
            .path("/write")
            .query_param("db", "MyDB")
            .body("all_touscany_case Firenze=5i 1583085600000000000");
        then.status(204);
    });

    let summary = pipeline::run(&h.config()).unwrap();

    write.assert();
    assert_eq!(summary.fetched, 2);
    assert_eq!(summary.retained, 1);
    assert!(matches!(summary.outcome, WriteOutcome::Written { points: 1, .. }));
}

#[test]
fn test_zero_count_records_are_excluded() {
    let h = Harness::new(json!([
        row("Toscana", "Firenze", 0, "2020-02-24 18:00:00"),
        row("Toscana", "Firenze", 5, "2020-03-01 18:00:00"),
    ]));
    h.ping_ok();
    let write = h.influx.mock(|when, then| {
        when.method(POST)
            .path("/write")
            .body("all_touscany_case Firenze=5i 1583085600000000000");
        then.status(204);
    });

    let summary = pipeline::run(&h.config()).unwrap();
    write.assert();
    assert_eq!(summary.retained, 1);
}

#[test]
fn test_malformed_date_aborts_before_write() {
    let h = Harness::new(json!([
        row("Toscana", "Firenze", 5, "2020-03-01 18:00:00"),
        row("Toscana", "Pisa", 3, "not-a-date"),
    ]));
    let ping = h.ping_ok();
    let write = h.influx.mock(|when, then| {
        when.method(POST).path("/write");
        then.status(204);
    });

    let err = pipeline::run(&h.config()).unwrap_err();

    assert!(matches!(err, PipelineError::Parse { ref value, .. } if value == "not-a-date"));
    ping.assert_hits(0);
    write.assert_hits(0);
}

#[test]
fn test_no_match_still_writes_empty_batch() {
    let h = Harness::new(json!([row("Lazio", "Roma", 10, "2020-03-01 18:00:00")]));
    h.ping_ok();
    let write = h.influx.mock(|when, then| {
        when.method(POST).path("/write").body("");
        then.status(204);
    });

    let summary = pipeline::run(&h.config()).unwrap();

    write.assert();
    assert_eq!(summary.retained, 0);
    assert!(matches!(summary.outcome, WriteOutcome::Written { points: 0, .. }));
}

#[test]
fn test_no_match_with_skip_sends_nothing() {
    let h = Harness::new(json!([row("Lazio", "Roma", 10, "2020-03-01 18:00:00")]));
    h.ping_ok();
    let write = h.influx.mock(|when, then| {
        when.method(POST).path("/write");
        then.status(204);
    });

    let mut config = h.config();
    config.skip_empty_batch = true;
    let summary = pipeline::run(&config).unwrap();

    write.assert_hits(0);
    assert_eq!(summary.outcome, WriteOutcome::Skipped);
}

#[test]
fn test_unreachable_database_prevents_write() {
    let h = Harness::new(json!([row("Toscana", "Firenze", 5, "2020-03-01 18:00:00")]));
    h.influx.mock(|when, then| {
        when.method(GET).path("/ping");
        then.status(503);
    });
    let write = h.influx.mock(|when, then| {
        when.method(POST).path("/write");
        then.status(204);
    });

    let err = pipeline::run(&h.config()).unwrap_err();

    assert!(matches!(err, PipelineError::Connectivity(_)), "{err:?}");
    write.assert_hits(0);
}

#[test]
fn test_rejected_write_is_fatal() {
    let h = Harness::new(json!([row("Toscana", "Firenze", 5, "2020-03-01 18:00:00")]));
    h.ping_ok();
    h.influx.mock(|when, then| {
        when.method(POST).path("/write");
        then.status(400)
            .header("content-type", "application/json")
            .body(r#"{"error":"partial write: field type conflict"}"#);
    });

    let err = pipeline::run(&h.config()).unwrap_err();
    match err {
        PipelineError::Write { reason, .. } => assert!(reason.contains("field type conflict")),
        other => panic!("expected write error, got {other:?}"),
    }
}

#[test]
fn test_feed_with_wrong_schema_is_decode_error() {
    let h = Harness::new(json!({ "message": "rate limited" }));
    h.ping_ok();

    let err = pipeline::run(&h.config()).unwrap_err();
    assert!(matches!(err, PipelineError::Decode { .. }), "{err:?}");
}

#[test]
fn test_bad_database_url_fails_before_fetch() {
    let feed = MockServer::start();
    let feed_mock = feed.mock(|when, then| {
        when.method(GET).path("/province.json");
        then.status(200).json_body(json!([]));
    });

    let mut config = Config::default();
    config.feed_url = feed.url("/province.json");
    config.influx.url = "localhost:8086".to_string();

    let err = pipeline::run(&config).unwrap_err();
    assert!(matches!(err, PipelineError::Connectivity(_)), "{err:?}");
    feed_mock.assert_hits(0);
}

#[test]
fn test_points_match_retained_records() {
    let rows: Vec<Value> = (1..=6)
        .map(|day| {
            let region = if day % 2 == 0 { "Toscana" } else { "Umbria" };
            row(region, "Firenze", day, &format!("2020-03-0{} 18:00:00", day))
        })
        .collect();
    let h = Harness::new(Value::Array(rows));
    h.ping_ok();
    h.influx.mock(|when, then| {
        when.method(POST).path("/write");
        then.status(204);
    });

    let summary = pipeline::run(&h.config()).unwrap();
    assert_eq!(summary.retained, 3);
    assert!(matches!(summary.outcome, WriteOutcome::Written { points: 3, .. }));
}
