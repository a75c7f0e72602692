/// Failure paths: missing inputs, malformed files, invalid options and
/// constrained connectors without annotation.
mod helpers;

use helpers::{cli_with_home, corpus, dictionary, json_output, lexicon, sandbox};
use predicates::prelude::*;

#[test]
fn missing_dictionary_is_reported() {
    let tmp = sandbox();
    cli_with_home(&tmp)
        .args(["connectors"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no connector dictionary configured"));
}

#[test]
fn dictionary_must_be_an_object() {
    let tmp = sandbox();
    cli_with_home(&tmp)
        .args(["--dictionary", &dictionary("not_an_object.json"), "connectors"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected a JSON object"));
}

#[test]
fn unknown_labels_list_the_available_ones() {
    let tmp = sandbox();
    cli_with_home(&tmp)
        .args([
            "--dictionary",
            &dictionary("connecteurs.json"),
            "connectors",
            "--labels",
            "CAUSE",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown connector label(s): CAUSE"))
        .stderr(predicate::str::contains("ADDITION"));

    // one valid label does not hide an unknown one
    cli_with_home(&tmp)
        .args([
            "--dictionary",
            &dictionary("connecteurs.json"),
            "density",
            "--corpus",
            &corpus("models.jsonl"),
            "--variable",
            "model",
            "--labels",
            "ADDITION,BOGUS",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown connector label(s): BOGUS ("))
        .stderr(predicate::str::contains("available: ADDITION"));
}

#[test]
fn malformed_corpus_line_is_located() {
    let tmp = sandbox();
    cli_with_home(&tmp)
        .args([
            "--dictionary",
            &dictionary("connecteurs.json"),
            "count",
            "--corpus",
            &corpus("malformed.jsonl"),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 2"));
}

#[test]
fn invalid_options_are_rejected() {
    let tmp = sandbox();
    let dict = dictionary("connecteurs.json");
    let data = corpus("models.jsonl");
    let base = ["--dictionary", dict.as_str(), "compare", "--corpus", data.as_str(), "--variable", "model"];

    cli_with_home(&tmp)
        .args(base)
        .args(["--correction", "sidak"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid correction 'sidak'"));

    cli_with_home(&tmp)
        .args(base)
        .args(["--alpha", "1.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("alpha must be between 0 and 1"));

    cli_with_home(&tmp)
        .args(["--format", "xml", "--dictionary", dict.as_str(), "connectors"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid format 'xml'"));
}

#[test]
fn density_base_must_be_positive() {
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
            "--base",
            "0",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("density base must be a positive number"));
}

#[test]
fn compare_base_must_be_positive() {
    let tmp = sandbox();
    let dict = dictionary("connecteurs.json");
    let data = corpus("models.jsonl");
    for base in ["--base=0", "--base=-1000", "--base=NaN"] {
        cli_with_home(&tmp)
            .args([
                "--dictionary",
                dict.as_str(),
                "compare",
                "--corpus",
                data.as_str(),
                "--variable",
                "model",
                base,
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("density base must be a positive number"));
    }
}

#[test]
fn segment_comparison_options_need_compare() {
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
            "--permutations",
            "10",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--compare"));
}

#[test]
fn constrained_connectors_need_an_annotator() {
    let tmp = sandbox();
    cli_with_home(&tmp)
        .args([
            "--dictionary",
            &dictionary("constrained.json"),
            "count",
            "--corpus",
            &corpus("models.jsonl"),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("annotation unavailable"));
}

#[test]
fn constrained_connector_matches_with_expected_pos() {
    let tmp = sandbox();
    let json = json_output(cli_with_home(&tmp).args([
        "--dictionary",
        &dictionary("constrained.json"),
        "--lexicon",
        &lexicon("conjunctions.json"),
        "--format",
        "json",
        "count",
        "--corpus",
        &corpus("models.jsonl"),
    ]));
    assert_eq!(json["byLabel"]["CONDITION"], 1);
    assert_eq!(json["byLabel"]["ADDITION"], 8);
}

#[test]
fn constrained_connector_rejected_with_other_pos() {
    let tmp = sandbox();
    let json = json_output(cli_with_home(&tmp).args([
        "--dictionary",
        &dictionary("constrained.json"),
        "--lexicon",
        &lexicon("adverbs.json"),
        "--format",
        "json",
        "count",
        "--corpus",
        &corpus("models.jsonl"),
    ]));
    assert!(json["byLabel"].get("CONDITION").is_none());
    assert_eq!(json["total"], 8);
}

#[test]
fn linguistic_tokenizer_needs_an_annotator() {
    let tmp = sandbox();
    cli_with_home(&tmp)
        .args([
            "--dictionary",
            &dictionary("connecteurs.json"),
            "segments",
            "--corpus",
            &corpus("lines.jsonl"),
            "--variable",
            "model",
            "--tokenizer",
            "linguistic",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("annotation unavailable"));
}

#[test]
fn linguistic_tokenizer_with_lexicon() {
    let tmp = sandbox();
    let json = json_output(cli_with_home(&tmp).args([
        "--dictionary",
        &dictionary("connecteurs.json"),
        "--lexicon",
        &lexicon("conjunctions.json"),
        "--format",
        "json",
        "segments",
        "--corpus",
        &corpus("lines.jsonl"),
        "--variable",
        "model",
        "--tokenizer",
        "linguistic",
    ]));
    assert_eq!(json["tokenizer"], "linguistic");
    let gpt = json["lms"].as_array().unwrap().iter().find(|m| m["modality"] == "gpt").unwrap();
    assert_eq!(gpt["segmentCount"], 3);
    assert!((gpt["lms"].as_f64().unwrap() - 2.0).abs() < 1e-9);
}
