//! # Bot Tests Module
//!
//! Exercises the photo pipeline, the feedback handler and the commands
//! against a fake classifier and a recording monitor.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dog_breed_bot::bot::command_handler::{start_reply, stats_reply};
use dog_breed_bot::bot::{analyze_photo, apply_feedback, finish_photo, FeedbackAction};
use dog_breed_bot::classifier::{BreedClassifier, Prediction};
use dog_breed_bot::config::BotConfig;
use dog_breed_bot::context::AppContext;
use dog_breed_bot::errors::{ClassifierError, PhotoError};
use dog_breed_bot::monitoring::{Level, Monitor};
use teloxide::types::InlineKeyboardButtonKind;
use tempfile::{tempdir, TempDir};

/// Classifier returning fixed scores, or failing on files named `*.broken`
struct FakeClassifier {
    classes: Vec<String>,
    scores: Vec<f32>,
}

impl BreedClassifier for FakeClassifier {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn predict(&self, image_path: &Path) -> Result<Prediction, ClassifierError> {
        if image_path.extension().is_some_and(|ext| ext == "broken") {
            return Err(ClassifierError::Inference("cannot decode image".to_string()));
        }
        Prediction::from_scores(&self.classes, self.scores.clone())
    }
}

#[derive(Default)]
struct RecordingMonitor {
    messages: Mutex<Vec<(String, Level)>>,
    errors: Mutex<Vec<String>>,
}

#[async_trait]
impl Monitor for RecordingMonitor {
    fn report_message(&self, message: &str, level: Level) {
        self.messages
            .lock()
            .unwrap()
            .push((message.to_string(), level));
    }

    fn report_error(&self, error: &anyhow::Error, context: &str) {
        self.errors
            .lock()
            .unwrap()
            .push(format!("{context}: {error}"));
    }
}

fn dog_classifier() -> FakeClassifier {
    FakeClassifier {
        classes: ["golden_retriever", "labrador", "poodle", "beagle", "pug"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        scores: vec![0.92, 0.04, 0.02, 0.015, 0.005],
    }
}

fn setup(classifier: FakeClassifier) -> (TempDir, Arc<RecordingMonitor>, AppContext) {
    let dir = tempdir().unwrap();
    let config = BotConfig {
        bot_token: Some("123:test".to_string()),
        data_path: dir.path().to_path_buf(),
        ..Default::default()
    };
    let monitor = Arc::new(RecordingMonitor::default());
    let ctx = AppContext::new(config, Arc::new(classifier), monitor.clone()).unwrap();
    (dir, monitor, ctx)
}

fn button_payload(kind: &InlineKeyboardButtonKind) -> &str {
    match kind {
        InlineKeyboardButtonKind::CallbackData(data) => data,
        other => panic!("unexpected button kind: {other:?}"),
    }
}

#[tokio::test]
async fn test_photo_reply_with_alternatives() {
    let (dir, _monitor, ctx) = setup(dog_classifier());
    let image = dir.path().join("file_7.jpg");
    fs::write(&image, b"jpeg").unwrap();

    let reply = analyze_photo(&ctx, image, "file_7.jpg").await.unwrap();

    assert_eq!(reply.text, "It looks like a Golden retriever!");

    let rows = &reply.keyboard.inline_keyboard;
    let labels: Vec<&str> = rows.iter().map(|row| row[0].text.as_str()).collect();
    assert_eq!(labels, vec!["Yep!", "Labrador", "Poodle", "Beagle"]);
    assert!(rows.iter().all(|row| row.len() == 1));

    let payloads: Vec<&str> = rows.iter().map(|row| button_payload(&row[0].kind)).collect();
    assert_eq!(
        payloads,
        vec![
            "correct",
            "file_7.jpg,labrador",
            "file_7.jpg,poodle",
            "file_7.jpg,beagle"
        ]
    );
}

#[tokio::test]
async fn test_alternatives_never_repeat_top_label() {
    let classifier = FakeClassifier {
        classes: ["a", "b", "c", "d", "e", "f"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        scores: vec![0.1, 0.05, 0.3, 0.2, 0.25, 0.1],
    };
    let (dir, _monitor, ctx) = setup(classifier);

    let reply = analyze_photo(&ctx, dir.path().join("file_1.jpg"), "file_1.jpg")
        .await
        .unwrap();

    let alternatives: Vec<&str> = reply.keyboard.inline_keyboard[1..]
        .iter()
        .map(|row| row[0].text.as_str())
        .collect();
    assert_eq!(reply.text, "It looks like a C!");
    assert_eq!(alternatives, vec!["E", "D", "A"]);
}

#[tokio::test]
async fn test_undecodable_image_is_an_inference_failure() {
    let (dir, _monitor, ctx) = setup(dog_classifier());

    let result = analyze_photo(&ctx, dir.path().join("file_9.broken"), "file_9.broken").await;

    assert!(matches!(result, Err(PhotoError::InferenceFailed(_))));
    assert!(!ctx.labels.labels_path().exists());
}

#[tokio::test]
async fn test_failed_photo_apologizes_and_reports_one_error() {
    let (dir, monitor, ctx) = setup(dog_classifier());

    let result = analyze_photo(&ctx, dir.path().join("file_9.broken"), "file_9.broken")
        .await
        .map(|_| ());
    let apology = finish_photo(&ctx, result);

    assert_eq!(apology.as_deref(), Some("That was a bit too hard for me ;-("));
    let errors = monitor.errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("photo: Inference failed"));
    assert!(monitor.messages.lock().unwrap().is_empty());
    assert!(!ctx.labels.labels_path().exists());
}

#[tokio::test]
async fn test_successful_photo_reports_processed_picture() {
    let (dir, monitor, ctx) = setup(dog_classifier());
    let image = dir.path().join("file_7.jpg");
    fs::write(&image, b"jpeg").unwrap();

    let result = analyze_photo(&ctx, image, "file_7.jpg").await.map(|_| ());
    let apology = finish_photo(&ctx, result);

    assert_eq!(apology, None);
    assert_eq!(
        monitor.messages.lock().unwrap().as_slice(),
        &[("Processed a picture".to_string(), Level::Info)]
    );
    assert!(monitor.errors.lock().unwrap().is_empty());
}

#[test]
fn test_failed_reply_still_apologizes_and_reports() {
    let (_dir, monitor, ctx) = setup(dog_classifier());

    let result = Err(PhotoError::ReplyFailed("Bad Request: chat not found".to_string()));
    let apology = finish_photo(&ctx, result);

    assert_eq!(apology.as_deref(), Some("That was a bit too hard for me ;-("));
    assert_eq!(
        monitor.errors.lock().unwrap().as_slice(),
        &["photo: Sending the reply failed: Bad Request: chat not found".to_string()]
    );
    assert!(monitor.messages.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_mismatched_score_vector_is_rejected() {
    let classifier = FakeClassifier {
        classes: vec!["beagle".to_string(), "pug".to_string()],
        scores: vec![0.5, 0.3, 0.2],
    };
    let (dir, _monitor, ctx) = setup(classifier);

    let result = analyze_photo(&ctx, dir.path().join("file_2.jpg"), "file_2.jpg").await;
    assert!(matches!(result, Err(PhotoError::InferenceFailed(_))));
}

#[test]
fn test_confirm_writes_nothing() {
    let (_dir, monitor, ctx) = setup(dog_classifier());

    let reply = apply_feedback(&ctx, &FeedbackAction::Confirm).unwrap();

    assert_eq!(reply, "💙");
    assert!(!ctx.labels.labels_path().exists());
    assert!(monitor.messages.lock().unwrap().is_empty());
}

#[test]
fn test_correction_appends_exactly_one_line() {
    let (_dir, monitor, ctx) = setup(dog_classifier());
    let payload = "file_7.jpg,poodle";

    let action = FeedbackAction::parse(payload).unwrap();
    let reply = apply_feedback(&ctx, &action).unwrap();

    assert_eq!(reply, "Thanks!");
    assert_eq!(
        fs::read_to_string(ctx.labels.labels_path()).unwrap(),
        format!("{payload}\n")
    );
    assert_eq!(
        monitor.messages.lock().unwrap().as_slice(),
        &[("Made an incorrect prediction".to_string(), Level::Info)]
    );
}

#[test]
fn test_correction_with_unknown_class_is_trusted() {
    let (_dir, _monitor, ctx) = setup(dog_classifier());

    let action = FeedbackAction::parse("file_7.jpg,not_a_dog").unwrap();
    apply_feedback(&ctx, &action).unwrap();

    assert_eq!(
        fs::read_to_string(ctx.labels.labels_path()).unwrap(),
        "file_7.jpg,not_a_dog\n"
    );
}

#[test]
fn test_start_greeting() {
    let (_dir, _monitor, ctx) = setup(dog_classifier());
    assert_eq!(
        start_reply(&ctx, "Ada"),
        "Howdy Ada! Send me your doggie pic."
    );
}

#[test]
fn test_stats_only_for_designated_user() {
    let (dir, _monitor, ctx) = setup(dog_classifier());
    fs::write(dir.path().join("file_1.jpg"), b"jpeg").unwrap();
    fs::write(dir.path().join("file_2.jpg"), b"jpeg").unwrap();
    ctx.labels.append("file_1.jpg,pug").unwrap();

    assert_eq!(
        stats_reply(&ctx, Some("xnutsive")).unwrap().as_deref(),
        Some("Processed 2 pictures")
    );
    assert_eq!(stats_reply(&ctx, Some("someone_else")).unwrap(), None);
    assert_eq!(stats_reply(&ctx, None).unwrap(), None);
}
