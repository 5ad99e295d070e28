//! Integration tests for the transformation pass.

use pretty_assertions::assert_eq;
use pwaff::prelude::*;
use std::io::Write;

/// Two consecutive loops over `0 <= i < N`, optionally with dependences.
fn two_loops(n: i64, deps: Option<&str>) -> Scop {
    let deps = match deps {
        Some(rel) => format!(
            r#", "dependences": {{ "relations": [ {{ "kind": "RAW", "relation": "{}" }} ] }}"#,
            rel
        ),
        None => String::new(),
    };
    let text = format!(
        r#"{{
            "name": "two_loops",
            "params": {{ "N": {} }},
            "statements": [
                {{ "name": "S0", "domain": "[N] -> {{ S0[i] : 0 <= i < N }}", "schedule": "{{ S0[i] -> [0, i, 0] }}" }},
                {{ "name": "S1", "domain": "[N] -> {{ S1[i] : 0 <= i < N }}", "schedule": "{{ S1[i] -> [1, i, 0] }}" }}
            ]{}
        }}"#,
        n, deps
    );
    Scop::from_json(&text, &TransformConfig::default()).expect("valid SCoP")
}

/// A 2-deep nest `S[i, j]` over `0 <= i, j < N`.
fn nest(n: i64) -> Scop {
    let text = format!(
        r#"{{
            "name": "nest",
            "params": {{ "N": {} }},
            "statements": [
                {{ "name": "S", "domain": "[N] -> {{ S[i, j] : 0 <= i < N and 0 <= j < N }}",
                   "schedule": "{{ S[i, j] -> [0, i, 0, j, 0] }}" }}
            ],
            "dependences": {{ "relations": [] }}
        }}"#,
        n
    );
    Scop::from_json(&text, &TransformConfig::default()).expect("valid SCoP")
}

fn run(scop: &mut Scop, script: &str) -> PassReport {
    run_on_scop_with_script(scop, &TransformConfig::default(), script).expect("pass runs")
}

#[test]
fn test_identity_script() {
    let mut scop = two_loops(4, Some("{ S0[i] -> S1[i] }"));
    let before = scop.statements.clone();
    let report = run(&mut scop, "// nothing to do\n\n// at all\n");

    assert_eq!(report.transform(), &scop.transform_domain().identity());
    assert_eq!(report.status, PassStatus::Committed);
    assert_eq!(scop.statements, before);
    assert!(scop.optimized);
}

#[test]
fn test_realign_past_schedule_width_rejected() {
    // band 2 lies outside the width-3 schedule: the gap gets no unit step,
    // so S1 is moved exactly onto S0's points
    let mut scop = two_loops(3, None);
    let before = scop.statements.clone();
    let report = run(&mut scop, "realign(S0, S1, 2)");
    assert!(report.transform().contains(&[1, 2, 0], &[0, 2, 0]));

    let legality = report.legality.as_ref().unwrap();
    assert!(!legality.injective);
    assert!(!legality.collisions.is_empty());
    assert_eq!(legality.dependences, DependenceVerdict::Unchecked);
    assert_eq!(report.status, PassStatus::Rejected);
    assert_eq!(scop.statements, before);
    assert!(scop.optimized);
}

#[test]
fn test_dependence_preserved_by_fusion() {
    let mut scop = two_loops(4, Some("{ S0[i] -> S1[i] }"));
    let report = run(&mut scop, "realign(S0, S1, 1)");

    assert_eq!(report.status, PassStatus::Committed);
    assert_eq!(report.legality.as_ref().unwrap().dependences, DependenceVerdict::Preserved);
    let s0 = &scop.statement("S0").unwrap().schedule;
    let s1 = &scop.statement("S1").unwrap().schedule;
    for i in 0..4 {
        assert!(s0.contains(&[i], &[0, i, 0]));
        assert!(s1.contains(&[i], &[0, i, 1]));
    }
    // the dependence still points forward in the committed schedule
    let validity = scop.validity().unwrap();
    assert!(validity.iter().all(|(src, tgt)| src < tgt));
}

#[test]
fn test_dependence_violated_by_fusion() {
    let mut scop = two_loops(4, Some("{ S0[1] -> S1[0] }"));
    let before = scop.statements.clone();
    let report = run(&mut scop, "realign(S0, S1, 1)");

    assert_eq!(report.status, PassStatus::Rejected);
    assert_eq!(scop.statements, before);
    match &report.legality.as_ref().unwrap().dependences {
        DependenceVerdict::Violated { counter_examples } => {
            let expected = PointRelation::from_pairs(3, 3, vec![(vec![0, 1, 0], vec![0, 0, 1])]);
            assert_eq!(counter_examples, &expected);
        }
        other => panic!("expected a violation, got {:?}", other),
    }
    let summary = report.summary(&scop);
    assert_eq!(summary.dependences, "violated");
    assert_eq!(summary.counter_examples.len(), 1);
}

#[test]
fn test_shifted_dependence_violated() {
    let mut scop = two_loops(4, Some("[N] -> { S0[i] -> S1[i - 1] : i >= 1 }"));
    let report = run(&mut scop, "realign(S0, S1, 1)");
    assert_eq!(report.status, PassStatus::Rejected);
}

#[test]
fn test_index_split_partition() {
    for predicate in ["{ [i, j] : i < 2 }", "{ [i, j] : i + j <= 3 }", "{ [i, j] : i < 0 }"] {
        let mut scop = nest(4);
        let original = scop.labels.get("S").unwrap().domain.clone();
        let script = format!("isplit(S, A, B, {}, 1)", predicate);
        let report = run(&mut scop, &script);
        assert_eq!(report.pipeline.applied(), 1, "{}", predicate);
        assert_eq!(report.status, PassStatus::Committed, "{}", predicate);

        // labels were moved through the transform on commit; pull them back
        let t = report.transform().reverse();
        let a = t.image(&scop.labels.get("A").unwrap().domain);
        let b = t.image(&scop.labels.get("B").unwrap().domain);
        assert!(a.is_disjoint(&b), "{}", predicate);
        assert_eq!(a.union(b), original, "{}", predicate);
    }
}

#[test]
fn test_affine_remap_depth_and_padding() {
    let mut scop = two_loops(3, None);
    let report = run(&mut scop, "affine(S0, { [i] -> [i, 0] })");

    assert_eq!(report.status, PassStatus::Committed);
    assert_eq!(report.transform().n_out(), 5);
    assert_eq!(scop.labels.get("S0").unwrap().depth, 2);
    assert_eq!(scop.labels.get("S1").unwrap().depth, 1);
    for i in 0..3 {
        assert!(scop.statement("S0").unwrap().schedule.contains(&[i], &[0, i, 0, 0, 0]));
        assert!(scop.statement("S1").unwrap().schedule.contains(&[i], &[1, i, 0, 0, 0]));
    }
}

#[test]
fn test_affine_remap_strip_mine() {
    let mut scop = nest(4);
    let report = run(&mut scop, "affine(S, { [i, j] -> [floor(i / 2), i, j] })");
    assert_eq!(report.status, PassStatus::Committed);
    assert_eq!(scop.labels.get("S").unwrap().depth, 3);
    assert!(scop.statement("S").unwrap().schedule.contains(&[3, 1], &[0, 1, 0, 3, 0, 1, 0]));
}

#[test]
fn test_lift_is_idempotent() {
    let mut scop = two_loops(3, None);
    let original = scop.labels.get("S0").unwrap().domain.clone();
    let report = run(&mut scop, "lift(S0, R, 1)");

    assert_eq!(report.transform(), &scop.transform_domain().identity());
    assert_eq!(scop.labels.get("R").unwrap().domain, original);
}

#[test]
fn test_unknown_label_skipped() {
    let mut scop = two_loops(3, None);
    let report = run(&mut scop, "realign(S0, Missing, 1)\nnot a directive");

    assert_eq!(
        report.pipeline.steps[0].status,
        StepStatus::Skipped(SkipReason::UnknownLabel("Missing".into()))
    );
    assert_eq!(report.pipeline.steps[1].status, StepStatus::Unrecognized);
    assert_eq!(report.status, PassStatus::Committed);
    assert!(report.diagnostics.iter().any(|d| d.to_string().contains("Missing")));
}

#[test]
fn test_unknown_label_strict() {
    let mut scop = two_loops(3, None);
    let config = TransformConfig::new().with_unknown_labels(UnknownLabelPolicy::Error);
    let before = scop.statements.clone();
    assert!(run_on_scop_with_script(&mut scop, &config, "lift(Missing, R, 0)").is_err());
    assert_eq!(scop.statements, before);
}

#[test]
fn test_script_file_and_summary() {
    let mut scop = two_loops(2, Some("{ S0[i] -> S1[i] }"));
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "// fuse").unwrap();
    writeln!(file, "realign(S0, S1, 1)").unwrap();
    let config = TransformConfig::new().with_script(file.path());

    let report = run_on_scop(&mut scop, &config).unwrap();
    let summary = report.summary(&scop);
    assert_eq!(summary.status, PassStatus::Committed);
    assert_eq!(summary.applied, 1);
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["status"], "committed");
    assert_eq!(json["dependences"], "preserved");
}

#[test]
fn test_missing_script_is_identity() {
    let mut scop = two_loops(2, None);
    let before = scop.statements.clone();
    let dir = tempfile::tempdir().unwrap();
    let config = TransformConfig::new().with_script(dir.path().join("absent.txt"));
    let report = run_on_scop(&mut scop, &config).unwrap();
    assert_eq!(report.status, PassStatus::Committed);
    assert_eq!(scop.statements, before);
}

#[test]
fn test_empty_region() {
    let mut scop = two_loops(0, None);
    let report = run(&mut scop, "realign(S0, S1, 1)");
    assert_eq!(report.status, PassStatus::EmptyRegion);
    assert!(report.legality.is_none());
    assert!(scop.optimized);
}

#[test]
fn test_parameter_override() {
    let text = r#"{ "name": "p", "params": { "N": 10 }, "statements": [
        { "name": "S0", "domain": "[N] -> { S0[i] : 0 <= i < N }", "schedule": "{ S0[i] -> [0, i, 0] }" }
    ] }"#;
    let config = TransformConfig::new().with_param("N", 3).with_max_points(64);
    let mut scop = Scop::from_json(text, &config).unwrap();
    assert_eq!(scop.transform_domain().len(), 3);
    assert_eq!(scop.context.max_points(), 64);

    // the same config runs the pass on the region it loaded
    let report = run_on_scop_with_script(&mut scop, &config, "").unwrap();
    assert_eq!(report.transform().len(), 3);
}

#[test]
fn test_parameter_mismatch_is_an_error() {
    let mut scop = two_loops(4, None);
    let before = scop.statements.clone();
    let config = TransformConfig::new().with_param("N", 2);
    let err = run_on_scop_with_script(&mut scop, &config, "").unwrap_err();
    assert!(err.to_string().contains("N"), "{}", err);
    assert_eq!(scop.statements, before);
    assert!(!scop.optimized);
}
