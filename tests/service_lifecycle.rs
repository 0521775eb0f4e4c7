mod support;

use std::sync::Arc;

use intentwise::calibration::ConfidenceBand;
use intentwise::persistence::{ARTIFACT_KEY, FsStore, MemoryStore};
use intentwise::{CategorySchema, IntentError, TrainingExample};
use support::{memory_service, open_service, pricing_contact_schema};
use tempfile::tempdir;

const UTTERANCES: &[&str] = &[
    "what is the cost",
    "give me your phone number",
    "price list please",
    "xyz completely unrelated gibberish",
];

#[test]
fn same_schema_and_seed_train_identically() {
    let (_, first) = memory_service();
    let (_, second) = memory_service();
    let schema = pricing_contact_schema();
    let a = first.train(&schema).unwrap();
    let b = second.train(&schema).unwrap();
    assert_eq!(a.accuracy, b.accuracy);
    assert_eq!(a.per_category, b.per_category);
    for utterance in UTTERANCES {
        assert_eq!(first.predict(utterance), second.predict(utterance), "{utterance}");
    }
}

#[test]
fn untrained_service_predicts_unknown() {
    let (_, service) = memory_service();
    let prediction = service.predict("anything");
    assert_eq!(prediction.category, "unknown");
    assert_eq!(prediction.confidence, 0.0);
    assert_eq!(prediction.band, ConfidenceBand::VeryLow);
    assert!(!service.status().is_trained);
}

#[test]
fn empty_schema_is_rejected() {
    let (store, service) = memory_service();
    let err = service.train(&CategorySchema::new()).unwrap_err();
    assert!(matches!(err, IntentError::InsufficientData { .. }));
    assert!(!service.status().is_trained);
    assert!(store.keys().is_empty());
}

#[test]
fn additional_examples_alone_can_train() {
    let (_, service) = memory_service();
    let extra = vec![
        TrainingExample::supplied("when do you open", "hours"),
        TrainingExample::supplied("opening hours on sunday", "hours"),
        TrainingExample::supplied("where is your office", "location"),
        TrainingExample::supplied("directions to the shop", "location"),
    ];
    let result = service.train_with(&CategorySchema::new(), &extra).unwrap();
    assert_eq!(result.sample_count, 4);
    assert_eq!(service.status().categories, vec!["hours", "location"]);
}

#[test]
fn pricing_and_contact_scenario() {
    let (_, service) = memory_service();
    service.train(&pricing_contact_schema()).unwrap();

    let cost = service.predict("what is the cost");
    assert_eq!(cost.category, "pricing");
    assert!(
        matches!(cost.band, ConfidenceBand::Medium | ConfidenceBand::High),
        "{cost:?}"
    );

    let noise = service.predict("xyz completely unrelated gibberish");
    assert!(
        matches!(noise.band, ConfidenceBand::Low | ConfidenceBand::VeryLow),
        "{noise:?}"
    );

    let status = service.status();
    assert!(status.is_trained);
    assert_eq!(status.categories, vec!["contact", "pricing"]);
    let metrics = status.metrics.unwrap();
    assert!((0.0..=1.0).contains(&metrics.accuracy));
    assert!(metrics.sample_count > 0);
}

#[test]
fn saved_model_predicts_the_same_after_reload() {
    let dir = tempdir().unwrap();
    let expected: Vec<_> = {
        let service = open_service(Arc::new(FsStore::new(dir.path())));
        service.train(&pricing_contact_schema()).unwrap();
        let predictions = UTTERANCES.iter().map(|utterance| service.predict(utterance)).collect();
        service.shutdown().unwrap();
        predictions
    };

    let reloaded = open_service(Arc::new(FsStore::new(dir.path())));
    assert!(reloaded.status().is_trained);
    for (utterance, before) in UTTERANCES.iter().zip(expected) {
        let after = reloaded.predict(utterance);
        assert_eq!(after.category, before.category, "{utterance}");
        assert!((after.confidence - before.confidence).abs() < 1e-6, "{utterance}");
        assert_eq!(after.band, before.band, "{utterance}");
    }
}

#[test]
fn eleventh_feedback_retrains_once() {
    let (_, service) = memory_service();
    let samples = [
        ("how much does delivery cost", "pricing"),
        ("can I email the team", "contact"),
    ];
    for idx in 0..10 {
        let (text, category) = samples[idx % 2];
        let outcome = service.submit_feedback(text, category, Some(0.5)).unwrap();
        assert!(outcome.recorded);
        assert!(!outcome.retrained);
        assert_eq!(outcome.pending_count, idx + 1);
    }
    assert_eq!(service.status().pending_feedback_count, 10);
    assert!(!service.status().is_trained);

    let outcome = service
        .submit_feedback("what are your prices", "pricing", None)
        .unwrap();
    assert!(outcome.retrained);
    assert!(outcome.retrain_result.is_some());
    assert_eq!(outcome.pending_count, 0);

    let status = service.status();
    assert!(status.is_trained);
    assert_eq!(status.pending_feedback_count, 0);
    assert_eq!(status.training_example_count, 11);

    let next = service.submit_feedback("phone me", "contact", None).unwrap();
    assert!(!next.retrained);
    assert_eq!(next.pending_count, 1);
}

#[test]
fn feedback_retrain_keeps_schema_categories() {
    let (_, service) = memory_service();
    service.train(&pricing_contact_schema()).unwrap();
    for _ in 0..11 {
        service
            .submit_feedback("when are you open", "hours", None)
            .unwrap();
    }
    assert_eq!(
        service.status().categories,
        vec!["contact", "hours", "pricing"]
    );
}

#[test]
fn invalid_feedback_is_rejected() {
    let (_, service) = memory_service();
    assert!(matches!(
        service.submit_feedback("  ", "pricing", None),
        Err(IntentError::InvalidFeedback(_))
    ));
    assert!(matches!(
        service.submit_feedback("hello", "pricing", Some(1.5)),
        Err(IntentError::InvalidFeedback(_))
    ));
    assert_eq!(service.status().training_example_count, 0);
}

#[test]
fn predictions_continue_during_retrain() {
    let (_, service) = memory_service();
    let schema = pricing_contact_schema();
    service.train(&schema).unwrap();

    std::thread::scope(|scope| {
        let reader = scope.spawn(|| {
            let mut seen = 0usize;
            for _ in 0..200 {
                let prediction = service.predict("what is the cost");
                assert_ne!(prediction.category, "unknown");
                assert!((0.0..=1.0).contains(&prediction.confidence));
                seen += 1;
            }
            seen
        });
        for _ in 0..3 {
            service.train(&schema).unwrap();
        }
        assert_eq!(reader.join().unwrap(), 200);
    });
}

#[test]
fn failed_save_keeps_new_model_live() {
    let store = Arc::new(MemoryStore::new());
    store.set_reject_writes(true);
    let service = open_service(store.clone());
    service.train(&pricing_contact_schema()).unwrap();
    assert!(service.status().is_trained);
    assert_eq!(service.predict("what is the cost").category, "pricing");
    assert!(!store.keys().iter().any(|key| key == ARTIFACT_KEY));
    assert!(service.shutdown().is_err());
}
