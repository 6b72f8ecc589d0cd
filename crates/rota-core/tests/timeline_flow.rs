use std::fs;

use clap::Parser;
use rota_core::cli::GlobalCli;
use rota_core::execute;
use tempfile::tempdir;

const ITEMS: &str = r#"[
  {"id": "A", "kind": "booking", "start": "2025-01-05", "end": "2025-01-10", "label": "Atlas"},
  {"id": "B", "kind": "booking", "start": "2025-01-08", "end": "2025-01-12", "label": "Borealis"},
  {"id": "C", "kind": "booking", "start": "2025-01-11", "end": "2025-01-15", "label": "Cygnus"},
  {"id": "T", "kind": "reservation", "start": "2025-01-28T09:00:00Z", "end": "2025-02-05", "label": "Trip"},
  {"id": "X", "kind": "booking", "start": "2025-03-01", "end": "2025-03-04", "label": "Later"}
]"#;

fn run_to_string(args: &[&str]) -> String {
    let cli = GlobalCli::try_parse_from(args).expect("parse args");
    let mut out = Vec::new();
    execute(cli, &mut out).expect("execute");
    String::from_utf8(out).expect("utf8 output")
}

#[test]
fn lanes_report_matches_allocation_rules() {
    let temp = tempdir().expect("tempdir");
    let items = temp.path().join("items.json");
    fs::write(&items, ITEMS).expect("write items");
    let config = temp.path().join("rota.toml");
    fs::write(&config, "[calendar]\nweekend = \"fri-sat\"\n").expect("write config");

    let output = run_to_string(&[
        "rota",
        "--config",
        config.to_str().expect("utf8 path"),
        "lanes",
        "--items",
        items.to_str().expect("utf8 path"),
        "--from",
        "2025-01-01",
        "--to",
        "2025-01-31",
    ]);
    let report: serde_json::Value = serde_json::from_str(&output).expect("json report");

    assert_eq!(report["lane_count"], 2);
    assert_eq!(report["dropped"], 1);
    assert_eq!(report["window_end"], "2025-01-31");

    let first_lane = report["lanes"][0].as_array().expect("lane 0");
    let ids = first_lane
        .iter()
        .map(|entry| entry["id"].as_str().expect("id"))
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["A", "C", "T"]);

    let trip = &first_lane[2];
    assert_eq!(trip["start"], "2025-01-28");
    assert_eq!(trip["end"], "2025-01-31");
    assert_eq!(trip["clipped_end"], true);
    assert_eq!(report["lanes"][1][0]["id"], "B");
}

#[test]
fn render_draws_selection_with_overrides() {
    let temp = tempdir().expect("tempdir");
    let items = temp.path().join("items.toml");
    fs::write(
        &items,
        "[[items]]\nid = \"A\"\nkind = \"booking\"\nstart = \"2025-03-03\"\nend = \"2025-03-07\"\nlabel = \"Atlas\"\n",
    )
    .expect("write items");

    let output = run_to_string(&[
        "rota",
        "render",
        "--items",
        items.to_str().expect("utf8 path"),
        "--from",
        "2025-03-01",
        "--to",
        "2025-03-31",
        "--today",
        "2025-03-15",
        "--select",
        "2025-03-10..2025-03-05",
        "--no-color",
        "--set",
        "calendar.timezone=\"Europe/Berlin\"",
    ]);

    assert!(output.contains("March"));
    assert!(output.contains("[Atlas"));
    assert!(output.contains("2025-03-05 – 2025-03-10 (6 days)"));
    assert!(output.contains("1 item(s) in 1 lane(s)"));
}

#[test]
fn unparseable_window_renders_nothing() {
    let temp = tempdir().expect("tempdir");
    let items = temp.path().join("items.json");
    fs::write(&items, ITEMS).expect("write items");

    let output = run_to_string(&[
        "rota",
        "render",
        "--items",
        items.to_str().expect("utf8 path"),
        "--from",
        "2025-01-01",
        "--to",
        "sometime",
        "--no-color",
    ]);
    assert_eq!(output.trim(), "(empty window)");
}

#[test]
fn missing_items_file_is_reported() {
    let temp = tempdir().expect("tempdir");
    let missing = temp.path().join("missing.json");
    let cli = GlobalCli::try_parse_from([
        "rota",
        "lanes",
        "--items",
        missing.to_str().expect("utf8 path"),
        "--from",
        "2025-01-01",
        "--to",
        "2025-01-31",
    ])
    .expect("parse args");
    let err = execute(cli, &mut Vec::new()).expect_err("missing file");
    assert!(format!("{err:#}").contains("missing.json"));
}
