//! End-to-end runs of every operation through the analyzer with scripted host answers.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tabula::app::{
    Analyzer, Decision, DecisionKind, DecisionProvider, DecisionRequest, Operation,
    OperationOutcome,
};
use tabula::config::KMeansSettings;
use tabula::data::{Cell, RowLimit, Session, TableParser};
use tabula::stats::FixedSampler;
use tabula::AnalyticsError;

/// Replays queued answers and records every request it was asked.
#[derive(Default)]
struct Scripted {
    answers: Mutex<VecDeque<Decision>>,
    asked: Mutex<Vec<DecisionKind>>,
}

impl Scripted {
    fn new(answers: &[&str]) -> Self {
        Self {
            answers: Mutex::new(
                answers
                    .iter()
                    .map(|a| Decision::Chosen(a.to_string()))
                    .collect(),
            ),
            asked: Mutex::new(Vec::new()),
        }
    }

    fn cancel_after(answers: &[&str]) -> Self {
        let s = Self::new(answers);
        s.answers.lock().unwrap().push_back(Decision::Cancelled);
        s
    }

    fn asked(&self) -> Vec<DecisionKind> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl DecisionProvider for Scripted {
    async fn request_decision(&self, request: DecisionRequest) -> Decision {
        self.asked.lock().unwrap().push(request.kind);
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Decision::Cancelled)
    }
}

fn session(text: &str) -> Session {
    let mut session = Session::new(TableParser::new());
    session.load_str(text).unwrap();
    session
}

fn analyzer(answers: &[&str]) -> Analyzer<Scripted> {
    Analyzer::new(Scripted::new(answers), KMeansSettings::default())
}

#[tokio::test]
async fn descriptive_needs_no_decisions() {
    let mut s = session("a,b\n1,2\n3,4\n5,6");
    let mut an = analyzer(&[]);
    let out = an.run(&mut s, Operation::Descriptive, RowLimit::ALL).await.unwrap();
    match out.outcome {
        OperationOutcome::Descriptive { stats } => {
            assert_eq!(stats.len(), 2);
            assert_eq!(stats[0].column, "a");
            assert_eq!(stats[0].mean, 3.0);
            assert!((stats[0].variance - 2.667).abs() < 0.01);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(!out.kept);
    assert!(an.decisions().asked().is_empty());
}

#[tokio::test]
async fn regression_resolves_labels_and_indices() {
    let mut s = session("x,y\n1,2\n2,4\n3,6");
    let mut an = analyzer(&["1", "y"]);
    let out = an.run(&mut s, Operation::Regression, RowLimit::ALL).await.unwrap();
    match out.outcome {
        OperationOutcome::Regression { x, y, result } => {
            assert_eq!((x.as_str(), y.as_str()), ("x", "y"));
            assert!((result.slope - 2.0).abs() < 1e-12);
            assert!(result.intercept.abs() < 1e-12);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn unknown_column_aborts() {
    let mut s = session("x,y\n1,2\n2,4");
    let mut an = analyzer(&["x", "zz"]);
    let err = an.run(&mut s, Operation::Correlation, RowLimit::ALL).await.unwrap_err();
    assert!(matches!(err, AnalyticsError::UnknownColumn { .. }));
}

#[tokio::test]
async fn kept_cleaning_replaces_session_table() {
    let mut s = session("a,b\n1,\n3,4\n5,6");
    let mut an = analyzer(&["replace", "keep"]);
    let out = an.run(&mut s, Operation::Cleaning, RowLimit::ALL).await.unwrap();
    assert!(out.kept);
    assert_eq!(s.table().unwrap().rows()[0][1], Cell::Number(5.0));
    assert_eq!(
        an.decisions().asked(),
        vec![DecisionKind::CleaningPolicy, DecisionKind::KeepTable]
    );
}

#[tokio::test]
async fn discarded_result_leaves_session_untouched() {
    let mut s = session("v\n1\n4\n9");
    let mut an = analyzer(&["v", "sqrt", "discard"]);
    let out = an.run(&mut s, Operation::Transform, RowLimit::ALL).await.unwrap();
    assert!(!out.kept);
    assert_eq!(out.outcome.table().unwrap().numeric_values(0), vec![1.0, 2.0, 3.0]);
    assert_eq!(s.table().unwrap().numeric_values(0), vec![1.0, 4.0, 9.0]);
}

#[tokio::test]
async fn cancellation_aborts_without_side_effects() {
    let mut s = session("a,b\n1,\n3,4");
    let before = s.table().unwrap().clone();

    let mut an = Analyzer::new(Scripted::cancel_after(&[]), KMeansSettings::default());
    let err = an.run(&mut s, Operation::Cleaning, RowLimit::ALL).await.unwrap_err();
    assert!(matches!(err, AnalyticsError::Cancelled { .. }));

    // cancelled at the keep prompt: result computed but never applied
    let mut an = Analyzer::new(Scripted::cancel_after(&["remove"]), KMeansSettings::default());
    let err = an.run(&mut s, Operation::Cleaning, RowLimit::ALL).await.unwrap_err();
    assert!(matches!(err, AnalyticsError::Cancelled { .. }));
    assert_eq!(s.table().unwrap(), &before);
}

#[tokio::test]
async fn failed_operation_keeps_previous_table() {
    let mut s = session("v\n2\n0\n5");
    let mut an = analyzer(&["v", "log", "keep"]);
    let err = an.run(&mut s, Operation::Transform, RowLimit::ALL).await.unwrap_err();
    match err {
        AnalyticsError::Domain { row, .. } => assert_eq!(row, 1),
        other => panic!("expected Domain, got {other:?}"),
    }
    assert_eq!(s.table().unwrap().numeric_values(0), vec![2.0, 0.0, 5.0]);
}

#[tokio::test]
async fn outlier_defaults_to_last_column_on_blank_answer() {
    let mut s = session("id,v\na,1\nb,2\nc,3\nd,4\ne,100");
    let mut an = analyzer(&["", "keep"]);
    let out = an.run(&mut s, Operation::Outlier, RowLimit::ALL).await.unwrap();
    match &out.outcome {
        OperationOutcome::Outlier(report) => {
            assert_eq!(report.column, "v");
            assert_eq!(report.outlier_rows, vec![4]);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(s.table().unwrap().row_count(), 4);
}

#[tokio::test]
async fn normalize_with_row_limit() {
    let mut s = session("v\n10\n20\n30\n1000");
    let mut an = analyzer(&["keep"]);
    let limit = RowLimit::parse(Some("3"));
    let out = an.run(&mut s, Operation::Normalize, limit).await.unwrap();
    assert_eq!(out.outcome.table().unwrap().numeric_values(0), vec![0.0, 0.5, 1.0]);
    assert_eq!(s.table().unwrap().row_count(), 3);
}

#[tokio::test]
async fn clustering_with_pinned_seeds() {
    let mut s = session("x,y\n0,0\n0,1\n10,10\n10,11");
    let mut an = analyzer(&["2"]).with_sampler(FixedSampler(vec![0, 2]));
    let out = an.run(&mut s, Operation::Clustering, RowLimit::ALL).await.unwrap();
    match out.outcome {
        OperationOutcome::Clustering(result) => {
            let clusters: Vec<usize> = result.assignments.iter().map(|a| a.cluster).collect();
            assert_eq!(clusters, vec![0, 0, 1, 1]);
            assert!(result.iterations <= 2);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn clustering_rejects_bad_k() {
    for answer in ["0", "9", "-1", "two"] {
        let mut s = session("x\n1\n2\n3");
        let mut an = analyzer(&[answer]);
        let err = an.run(&mut s, Operation::Clustering, RowLimit::ALL).await.unwrap_err();
        assert!(
            matches!(err, AnalyticsError::InvalidParameter { .. }),
            "k = {answer}: {err:?}"
        );
    }
}

#[tokio::test]
async fn outcome_serializes_for_renderer() {
    let mut s = session("x,y\n1,2\n2,4\n3,7");
    let mut an = analyzer(&["x", "y"]);
    let out = an.run(&mut s, Operation::Correlation, RowLimit::ALL).await.unwrap();
    let json = serde_json::to_value(&out).unwrap();
    assert_eq!(json["outcome"]["operation"], "correlation");
    assert_eq!(json["outcome"]["x"], "x");
    assert!(json["outcome"]["r"].as_f64().unwrap() > 0.9);
    assert_eq!(json["kept"], false);
}

#[tokio::test]
async fn no_table_loaded() {
    let mut s = Session::new(TableParser::new());
    let mut an = analyzer(&[]);
    let err = an.run(&mut s, Operation::Descriptive, RowLimit::ALL).await.unwrap_err();
    assert!(matches!(err, AnalyticsError::NoData));
}
