/// Output of each subcommand on the fixture corpus, in text and JSON form.
mod helpers;

use helpers::{cli_with_home, corpus, dictionary, json_output, sandbox};
use predicates::prelude::*;

// ============================================================
// connectors
// ============================================================

#[test]
fn connectors_lists_entries_longest_first() {
    let tmp = sandbox();
    cli_with_home(&tmp)
        .args(["--dictionary", &dictionary("connecteurs.json"), "connectors"])
        .assert()
        .success()
        .stdout(predicate::str::contains("8 of 8 connectors"))
        .stdout(predicate::str::contains("ou bien"))
        .stdout(predicate::str::contains("\\n"));
}

#[test]
fn connectors_json_reports_sorted_labels_and_pattern() {
    let tmp = sandbox();
    let json = json_output(cli_with_home(&tmp).args([
        "--dictionary",
        &dictionary("connecteurs.json"),
        "--format",
        "json",
        "connectors",
        "--labels",
        "ALTERNATIVE,CONDITION",
    ]));

    assert_eq!(json["labels"], serde_json::json!(["ALTERNATIVE", "CONDITION"]));
    let entries = json["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["surface"], "ou bien");
    assert_eq!(entries[0]["kind"], "simple");
    assert!(json["pattern"].as_str().unwrap().starts_with("(?i)"));
}

// ============================================================
// count
// ============================================================

#[test]
fn count_json_totals_every_row() {
    let tmp = sandbox();
    let json = json_output(cli_with_home(&tmp).args([
        "--dictionary",
        &dictionary("connecteurs.json"),
        "--format",
        "json",
        "count",
        "--corpus",
        &corpus("models.jsonl"),
    ]));

    assert_eq!(json["responses"], 9);
    assert_eq!(json["total"], 18);
    assert_eq!(json["byLabel"]["ADDITION"], 8);
    assert_eq!(json["byLabel"]["ALTERNATIVE"], 3);
    // the newline after the metadata header is not counted
    assert!(json["byLabel"].get("RETOUR").is_none());

    let ou_bien = json["byConnector"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["connector"] == "ou bien")
        .unwrap();
    assert_eq!(ou_bien["occurrences"], 2);
}

#[test]
fn count_text_by_label() {
    let tmp = sandbox();
    cli_with_home(&tmp)
        .args([
            "--dictionary",
            &dictionary("connecteurs.json"),
            "count",
            "--corpus",
            &corpus("models.jsonl"),
            "--labels",
            "OPPOSITION",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 connector occurrences"))
        .stdout(predicate::str::contains("OPPOSITION"));
}

// ============================================================
// density
// ============================================================

#[test]
fn density_per_modality_sums_rows() {
    let tmp = sandbox();
    let json = json_output(cli_with_home(&tmp).args([
        "--dictionary",
        &dictionary("connecteurs.json"),
        "--format",
        "json",
        "density",
        "--corpus",
        &corpus("models.jsonl"),
        "--variable",
        "model",
    ]));

    assert_eq!(json["base"], 1000.0);
    let modalities = json["modalities"].as_array().unwrap();
    let names: Vec<&str> = modalities.iter().map(|m| m["modality"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["claude", "gpt", "mistral"]);

    let gpt = &modalities[1];
    assert_eq!(gpt["wordCount"], 26);
    assert_eq!(gpt["connectorCount"], 7);
    let density = gpt["density"].as_f64().unwrap();
    assert!((density - 7.0 / 26.0 * 1000.0).abs() < 1e-9);

    let mistral = &modalities[2];
    assert_eq!(mistral["wordCount"], 15);
    assert_eq!(mistral["connectorCount"], 5);
    assert!(json.get("responses").is_none());
}

#[test]
fn density_per_response_and_label_with_filters() {
    let tmp = sandbox();
    let json = json_output(cli_with_home(&tmp).args([
        "--dictionary",
        &dictionary("connecteurs.json"),
        "--format",
        "json",
        "density",
        "--corpus",
        &corpus("models.jsonl"),
        "--variable",
        "model",
        "--modalities",
        "gpt",
        "--base",
        "100",
        "--per-response",
        "--by-label",
    ]));

    let responses = json["responses"].as_array().unwrap();
    assert_eq!(responses.len(), 3);
    assert_eq!(responses[2]["unit"], "g3");
    assert!((responses[2]["density"].as_f64().unwrap() - 25.0).abs() < 1e-9);

    let labels = json["labels"].as_array().unwrap();
    let condition = labels.iter().find(|l| l["label"] == "CONDITION").unwrap();
    assert_eq!(condition["connectorCount"], 1);
    // every label gets a row, even without occurrences
    assert!(labels.iter().any(|l| l["label"] == "RETOUR" && l["connectorCount"] == 0));
}

#[test]
fn density_text_table() {
    let tmp = sandbox();
    cli_with_home(&tmp)
        .args([
            "--dictionary",
            &dictionary("connecteurs.json"),
            "density",
            "--corpus",
            &corpus("models.jsonl"),
            "--variable",
            "model",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Connector density per 1000 words, by model"))
        .stdout(predicate::str::contains("mistral"));
}

// ============================================================
// segments
// ============================================================

#[test]
fn segments_newline_connector_without_punctuation() {
    let tmp = sandbox();
    let json = json_output(cli_with_home(&tmp).args([
        "--dictionary",
        &dictionary("connecteurs.json"),
        "--format",
        "json",
        "segments",
        "--corpus",
        &corpus("lines.jsonl"),
        "--variable",
        "model",
        "--show",
    ]));

    let shown = json["segments"].as_array().unwrap();
    let l1 = shown.iter().find(|r| r["id"] == "l1").unwrap();
    let texts: Vec<&str> = l1["segments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["Première ligne", "Deuxième ligne", "Troisième ligne"]);

    // connector-free response has no segment
    let l3 = shown.iter().find(|r| r["id"] == "l3").unwrap();
    assert!(l3["segments"].as_array().unwrap().is_empty());
}

#[test]
fn segments_with_punctuation_drop_unbounded_spans() {
    let tmp = sandbox();
    let json = json_output(cli_with_home(&tmp).args([
        "--dictionary",
        &dictionary("connecteurs.json"),
        "--format",
        "json",
        "segments",
        "--corpus",
        &corpus("lines.jsonl"),
        "--variable",
        "model",
        "--mode",
        "connectors-and-punctuation",
        "--show",
    ]));

    let shown = json["segments"].as_array().unwrap();
    let l2 = shown.iter().find(|r| r["id"] == "l2").unwrap();
    let texts: Vec<&str> = l2["segments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["Ensuite", "tu veux"]);

    let lms = json["lms"].as_array().unwrap();
    assert_eq!(lms[0]["modality"], "claude");
    assert_eq!(lms[0]["segmentCount"], 2);
    assert!((lms[0]["lms"].as_f64().unwrap() - 1.5).abs() < 1e-9);
}

#[test]
fn segments_keep_unbounded_text() {
    let tmp = sandbox();
    let json = json_output(cli_with_home(&tmp).args([
        "--dictionary",
        &dictionary("connecteurs.json"),
        "--format",
        "json",
        "segments",
        "--corpus",
        &corpus("lines.jsonl"),
        "--variable",
        "model",
        "--mode",
        "connectors-and-punctuation",
        "--keep-unbounded",
    ]));

    let lms = json["lms"].as_array().unwrap();
    assert_eq!(lms[0]["segmentCount"], 3);
    let responses = json["responses"].as_array().unwrap();
    assert!(responses.iter().any(|r| r["id"] == "l3" && r["segmentCount"] == 1));
}

#[test]
fn segments_text_shows_markers() {
    let tmp = sandbox();
    cli_with_home(&tmp)
        .args([
            "--dictionary",
            &dictionary("connecteurs.json"),
            "segments",
            "--corpus",
            &corpus("models.jsonl"),
            "--variable",
            "model",
            "--show",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("LMS"))
        .stdout(predicate::str::contains("[et] il fait froid [donc]"));
}

#[test]
fn segments_compare_runs_every_pair() {
    let tmp = sandbox();
    let json = json_output(cli_with_home(&tmp).args([
        "--dictionary",
        &dictionary("connecteurs.json"),
        "--format",
        "json",
        "segments",
        "--corpus",
        &corpus("models.jsonl"),
        "--variable",
        "model",
        "--compare",
        "--correction",
        "holm",
    ]));

    let distribution = &json["distribution"];
    assert_eq!(distribution["status"], "performed");
    assert_eq!(distribution["correction"], "holm");
    let pairs = distribution["pairwise"].as_array().unwrap();
    assert_eq!(pairs.len(), 3);
    for pair in pairs {
        let d = pair["statistic"].as_f64().unwrap();
        let p_raw = pair["pRaw"].as_f64().unwrap();
        let p_adjusted = pair["pAdjusted"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&d));
        assert!(p_raw <= p_adjusted && p_adjusted <= 1.0);
        assert!(pair["modalityA"].as_str().unwrap() < pair["modalityB"].as_str().unwrap());
        assert!(pair.get("pPermutation").is_none());
    }
}

#[test]
fn segments_compare_permutations_are_seeded() {
    let tmp = sandbox();
    let run = || {
        json_output(cli_with_home(&tmp).args([
            "--dictionary",
            &dictionary("connecteurs.json"),
            "--format",
            "json",
            "segments",
            "--corpus",
            &corpus("models.jsonl"),
            "--variable",
            "model",
            "--compare",
            "--permutations",
            "200",
            "--seed",
            "11",
        ]))
    };
    let (first, second) = (run(), run());
    assert_eq!(first["distribution"], second["distribution"]);
    assert_eq!(first["distribution"]["seed"], 11);
    let pairs = first["distribution"]["pairwise"].as_array().unwrap();
    assert!(pairs.iter().all(|p| p["pPermutation"].is_f64()));
}

#[test]
fn segments_compare_single_modality_is_not_performed() {
    let tmp = sandbox();
    let json = json_output(cli_with_home(&tmp).args([
        "--dictionary",
        &dictionary("connecteurs.json"),
        "--format",
        "json",
        "segments",
        "--corpus",
        &corpus("models.jsonl"),
        "--variable",
        "model",
        "--modalities",
        "gpt",
        "--compare",
    ]));
    assert_eq!(json["distribution"]["status"], "notPerformed");
    assert_eq!(json["distribution"]["reason"]["validGroups"], 1);

    cli_with_home(&tmp)
        .args([
            "--dictionary",
            &dictionary("connecteurs.json"),
            "segments",
            "--corpus",
            &corpus("models.jsonl"),
            "--variable",
            "model",
            "--compare",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Kolmogorov-Smirnov on segment lengths"));
}
