//! End-to-end tests of the command line app against a temporary library file.

mod common;

use common::TestContext;
use studydeck_cli::error::CliError;

/// Test management commands are persisted between invocations.
#[tokio::test]
async fn test_manage_and_list() {
    let ctx = TestContext::new();
    ctx.seed(2).await;

    let listing = ctx.run(&["list"]).await;
    assert_eq!(listing, "Biology\n  Cells (2 cards, 2 due)\n");

    ctx.run(&["deck", "rename", "biology", "cells", "Organelles"])
        .await;
    let snapshot = ctx.snapshot();
    assert_eq!(snapshot.decks[0].name, "Organelles");
    assert_eq!(snapshot.cards.len(), 2);
}

/// Test duplicate subject names are rejected regardless of case.
#[tokio::test]
async fn test_duplicate_subject() {
    let ctx = TestContext::new();
    ctx.run(&["subject", "add", "Biology"]).await;

    let result = ctx.run_with_input(&["subject", "add", "biology"], "").await;
    assert!(matches!(result, Err(CliError::Repository(_))));
    assert_eq!(ctx.snapshot().subjects.len(), 1);
}

/// Test a scripted study session schedules every card and records history.
#[tokio::test]
async fn test_study_session() {
    let ctx = TestContext::new();
    ctx.seed(2).await;

    let output = ctx
        .run_with_input(&["study"], "\n4\n\n1\n")
        .await
        .unwrap();
    assert!(output.contains("[1/2]"));
    assert!(output.contains("[2/2]"));
    assert!(output.contains("Session complete!"));
    assert!(output.contains("Accuracy: 50%"));

    let snapshot = ctx.snapshot();
    assert_eq!(snapshot.review_history.len(), 2);
    for card in &snapshot.cards {
        assert_eq!(card.review_state.interval, 1);
    }

    let again = ctx.run_with_input(&["study"], "").await.unwrap();
    assert!(again.contains("No cards are due"));
}

/// Test studying one deck leaves other decks untouched.
#[tokio::test]
async fn test_study_single_deck() {
    let ctx = TestContext::new();
    ctx.seed(1).await;
    ctx.run(&["deck", "add", "Biology", "Genetics"]).await;
    ctx.run(&["card", "add", "Biology", "Genetics", "DNA", "helix"])
        .await;

    let output = ctx
        .run_with_input(
            &["study", "--subject", "Biology", "--deck", "Genetics", "--durable"],
            "\n5\n",
        )
        .await
        .unwrap();
    assert!(output.contains("[1/1] DNA"));

    let snapshot = ctx.snapshot();
    assert_eq!(snapshot.review_history.len(), 1);
    let untouched = snapshot.cards.iter().find(|c| c.front == "front 0").unwrap();
    assert_eq!(untouched.review_state.repetition, 0);
}

/// Test abandoning a session keeps the reviews made so far.
#[tokio::test]
async fn test_study_abandon() {
    let ctx = TestContext::new();
    ctx.seed(3).await;

    let output = ctx.run_with_input(&["study"], "\n5\nq\n").await.unwrap();
    assert!(output.contains("Session abandoned after 1 reviews."));
    assert_eq!(ctx.snapshot().review_history.len(), 1);
}

/// Test a deck exported as CSV imports into another library.
#[tokio::test]
async fn test_export_import_csv() {
    let source = TestContext::new();
    source.seed(2).await;
    let file = source.path("cells.csv");
    let file_arg = file.to_str().unwrap();

    source
        .run(&["export", "Biology", "Cells", "--format", "csv", "--out", file_arg])
        .await;

    let target = TestContext::new();
    let output = target
        .run(&["import", file_arg, "--subject", "Science", "--deck", "Cells"])
        .await;
    assert_eq!(output, "Imported 2 cards into Science / Cells\n");
    assert_eq!(target.snapshot().cards.len(), 2);
}

/// Test JSON export is printed to stdout when no file is given.
#[tokio::test]
async fn test_export_json_stdout() {
    let ctx = TestContext::new();
    ctx.seed(1).await;

    let output = ctx.run(&["export", "Biology", "Cells"]).await;
    let body: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(body["version"], 1);
    assert_eq!(body["deck"]["name"], "Cells");
    assert_eq!(body["cards"][0]["reviewState"]["easeFactor"], 2.5);
}

/// Test exporting an unknown deck reports not found.
#[tokio::test]
async fn test_export_missing_deck() {
    let ctx = TestContext::new();
    ctx.seed(0).await;
    let result = ctx
        .run_with_input(&["export", "Biology", "Genetics"], "")
        .await;
    assert!(matches!(result, Err(CliError::NotFound(_))));
}

/// Test stats reflect completed reviews.
#[tokio::test]
async fn test_stats_after_study() {
    let ctx = TestContext::new();
    ctx.seed(1).await;
    ctx.run_with_input(&["study"], "\n5\n").await.unwrap();

    let output = ctx.run(&["stats", "--days", "1"]).await;
    assert!(output.contains("Total reviews: 1"));
    assert!(output.contains("Accuracy: 100%"));
    assert!(output.contains("Cells: 1 reviews, 100% accuracy"));
}

/// Test a corrupt library file is reported instead of overwritten.
#[tokio::test]
async fn test_corrupt_library() {
    let ctx = TestContext::new();
    std::fs::write(ctx.library_path(), "{ not json").unwrap();

    let result = ctx.run_with_input(&["list"], "").await;
    assert!(matches!(result, Err(CliError::CorruptLibrary { .. })));
    assert_eq!(
        std::fs::read_to_string(ctx.library_path()).unwrap(),
        "{ not json"
    );
}

/// Test renaming a subject keeps its decks reachable under the new name.
#[tokio::test]
async fn test_subject_rename() {
    let ctx = TestContext::new();
    ctx.seed(1).await;

    let output = ctx.run(&["subject", "rename", "biology", "Life Science"]).await;
    assert_eq!(output, "Renamed subject to Life Science\n");
    let listing = ctx.run(&["list"]).await;
    assert_eq!(listing, "Life Science\n  Cells (1 cards, 1 due)\n");
}

/// Test editing a card changes its text but not its schedule.
#[tokio::test]
async fn test_card_edit() {
    let ctx = TestContext::new();
    ctx.seed(1).await;
    let before = ctx.snapshot().cards[0].clone();

    ctx.run(&[
        "card", "edit", "Biology", "Cells", "front 0", "--front", "What is ATP?", "--back",
        "Energy",
    ])
    .await;

    let after = &ctx.snapshot().cards[0];
    assert_eq!(after.id, before.id);
    assert_eq!(after.front, "What is ATP?");
    assert_eq!(after.back, "Energy");
    assert_eq!(after.review_state, before.review_state);

    let listing = ctx.run(&["card", "list", "Biology", "Cells"]).await;
    assert!(listing.starts_with("What is ATP? -> Energy (due "));
}

/// Test deleting a reviewed card also removes its review history.
#[tokio::test]
async fn test_card_delete() {
    let ctx = TestContext::new();
    ctx.seed(1).await;
    ctx.run_with_input(&["study"], "\n4\n").await.unwrap();
    assert_eq!(ctx.snapshot().review_history.len(), 1);

    ctx.run(&["card", "delete", "Biology", "Cells", "FRONT 0"]).await;
    let snapshot = ctx.snapshot();
    assert!(snapshot.cards.is_empty());
    assert!(snapshot.review_history.is_empty());

    let result = ctx
        .run_with_input(&["card", "delete", "Biology", "Cells", "front 0"], "")
        .await;
    assert!(matches!(result, Err(CliError::NotFound(_))));
}

/// Test plain text notes are chunked into cards.
#[tokio::test]
async fn test_import_text_notes() {
    let ctx = TestContext::new();
    let file = ctx.path("notes.txt");
    std::fs::write(
        &file,
        "1. What is ATP? The energy currency. 2. Where is DNA? In the nucleus.",
    )
    .unwrap();

    let output = ctx
        .run(&[
            "import",
            file.to_str().unwrap(),
            "--subject",
            "Biology",
            "--deck",
            "Notes",
        ])
        .await;
    assert_eq!(output, "Imported 2 cards into Biology / Notes\n");
    let fronts: Vec<String> = ctx.snapshot().cards.into_iter().map(|c| c.front).collect();
    assert_eq!(fronts, vec!["What is ATP?", "Where is DNA?"]);
}

/// Test an oversized stats window is rejected instead of crashing.
#[tokio::test]
async fn test_stats_days_out_of_range() {
    let ctx = TestContext::new();
    let result = ctx
        .run_with_input(&["stats", "--days", "200000000"], "")
        .await;
    assert!(matches!(result, Err(CliError::BadRequest(_))));
}
