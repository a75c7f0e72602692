/// Group comparison from the command line, including the not-performed path
/// and project configuration.
mod helpers;

use helpers::{cli_with_home, corpus, dictionary, json_output, sandbox};
use predicates::prelude::*;

fn compare_json(tmp: &tempfile::TempDir, extra: &[&str]) -> serde_json::Value {
    let dict = dictionary("connecteurs.json");
    let data = corpus("models.jsonl");
    let mut args = vec![
        "--dictionary",
        dict.as_str(),
        "--format",
        "json",
        "compare",
        "--corpus",
        data.as_str(),
        "--variable",
        "model",
    ];
    args.extend_from_slice(extra);
    json_output(cli_with_home(tmp).args(&args))
}

#[test]
fn compare_three_models_with_holm() {
    let tmp = sandbox();
    let json = compare_json(&tmp, &["--correction", "holm"]);

    // x1 has no model and is left out
    assert_eq!(json["responses"], 8);
    let outcome = &json["outcome"];
    assert_eq!(outcome["status"], "performed");
    assert_eq!(outcome["test"], "parametric");
    assert_eq!(outcome["correction"], "holm");
    assert_eq!(outcome["correctionApplied"], true);

    let omnibus = &outcome["omnibus"];
    assert_eq!(omnibus["groups"], 3);
    assert_eq!(omnibus["total"], 8);
    assert_eq!(omnibus["dfBetween"], 2);
    assert_eq!(omnibus["dfWithin"], 5);
    let p = omnibus["pValue"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&p));

    let pairs = outcome["pairwise"].as_array().unwrap();
    assert_eq!(pairs.len(), 3);
    for pair in pairs {
        let raw = pair["pRaw"].as_f64().unwrap();
        let adjusted = pair["pAdjusted"].as_f64().unwrap();
        assert!(adjusted >= raw - 1e-12);
        assert!(adjusted <= 1.0);
    }
    let adjusted: Vec<f64> = pairs.iter().map(|p| p["pAdjusted"].as_f64().unwrap()).collect();
    assert!(adjusted.windows(2).all(|w| w[0] <= w[1]));
    assert!(outcome["skippedPairs"].as_array().unwrap().is_empty());
}

#[test]
fn compare_without_correction_keeps_raw_p_values() {
    let tmp = sandbox();
    let json = compare_json(&tmp, &[]);
    let outcome = &json["outcome"];
    assert_eq!(outcome["correction"], "none");
    assert_eq!(outcome["correctionApplied"], false);
    for pair in outcome["pairwise"].as_array().unwrap() {
        assert_eq!(pair["pRaw"], pair["pAdjusted"]);
    }
}

#[test]
fn compare_nonparametric() {
    let tmp = sandbox();
    let json = compare_json(&tmp, &["--nonparametric", "--correction", "bonferroni"]);
    let outcome = &json["outcome"];
    assert_eq!(outcome["test"], "nonparametric");
    assert_eq!(outcome["omnibus"]["dfBetween"], 2);
    assert_eq!(outcome["pairwise"].as_array().unwrap().len(), 3);
}

#[test]
fn compare_single_group_is_not_performed() {
    let tmp = sandbox();
    cli_with_home(&tmp)
        .args([
            "--dictionary",
            &dictionary("connecteurs.json"),
            "compare",
            "--corpus",
            &corpus("models.jsonl"),
            "--variable",
            "model",
            "--modalities",
            "gpt",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "test not performed: 1 group(s) with data, at least 2 required",
        ));
}

#[test]
fn compare_not_performed_json() {
    let tmp = sandbox();
    let json = compare_json(&tmp, &["--modalities", "claude"]);
    assert_eq!(json["outcome"]["status"], "notPerformed");
    assert_eq!(json["outcome"]["reason"]["kind"], "insufficientGroups");
    assert_eq!(json["outcome"]["reason"]["validGroups"], 1);
}

#[test]
fn compare_text_report() {
    let tmp = sandbox();
    cli_with_home(&tmp)
        .args([
            "--dictionary",
            &dictionary("connecteurs.json"),
            "compare",
            "--corpus",
            &corpus("models.jsonl"),
            "--variable",
            "model",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("ANOVA: F(2, 5)"))
        .stdout(predicate::str::contains("none (adjusted = raw)"));
}

#[test]
fn project_config_supplies_dictionary_and_correction() {
    let tmp = sandbox();
    std::fs::write(
        tmp.path().join(".connector-lens.yaml"),
        format!(
            "dictionary: {}\ncomparison:\n  correction: bonferroni\n  alpha: 0.1\n",
            dictionary("connecteurs.json")
        ),
    )
    .unwrap();

    let json = json_output(cli_with_home(&tmp).args([
        "--format",
        "json",
        "compare",
        "--corpus",
        &corpus("models.jsonl"),
        "--variable",
        "model",
    ]));
    assert_eq!(json["outcome"]["correction"], "bonferroni");
    assert_eq!(json["outcome"]["alpha"], 0.1);

    // the command line wins over the file
    let json = json_output(cli_with_home(&tmp).args([
        "--format",
        "json",
        "compare",
        "--corpus",
        &corpus("models.jsonl"),
        "--variable",
        "model",
        "--correction",
        "fdr-bh",
    ]));
    assert_eq!(json["outcome"]["correction"], "fdr-bh");
}

#[test]
fn config_command_shows_merged_settings() {
    let tmp = sandbox();
    std::fs::write(
        tmp.path().join(".connector-lens.yaml"),
        "density:\n  base: 100\nsegmentation:\n  mode: connectors-and-punctuation\n",
    )
    .unwrap();

    let json = json_output(cli_with_home(&tmp).args(["--format", "json", "config"]));
    assert_eq!(json["density"]["base"], 100.0);
    assert_eq!(json["segmentation"]["mode"], "connectors-and-punctuation");
    assert_eq!(json["comparison"]["correction"], "none");
}
