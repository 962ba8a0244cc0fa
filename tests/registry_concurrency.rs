// tests/registry_concurrency.rs
//
// Readers predict in parallel while a writer keeps publishing new models.
// Every prediction must come from one fully built model: the vector length always matches
// the class statistics it is scored against.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use fake_news_detector::{
    config::DetectorConfig,
    corpus::{demo_corpus, LabeledDocument},
    model::TrainedModel,
    Detector, Label, ModelRegistry, PredictionMode,
};

fn extended_corpus(extra: usize) -> Vec<LabeledDocument> {
    let mut c = demo_corpus();
    for i in 0..extra {
        c.push(LabeledDocument::new(format!("rumor{i} miracle"), Label::Fake));
        c.push(LabeledDocument::new(format!("report{i} policy"), Label::Real));
    }
    c
}

#[test]
fn readers_always_see_a_complete_model() {
    let cfg = DetectorConfig::default();
    let registry = ModelRegistry::with_model(
        TrainedModel::train(&demo_corpus(), &cfg.features, &cfg.classifier).unwrap(),
    );
    let detector = Arc::new(Detector::new(&cfg, registry.clone()));
    let stop = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let detector = detector.clone();
            let registry = registry.clone();
            let stop = stop.clone();
            thread::spawn(move || {
                let mut n = 0usize;
                while !stop.load(Ordering::Relaxed) || n < 50 {
                    let model = registry.current().expect("model stays published");
                    let v = model.vectorize("Miracle cure found for rumor3");
                    assert_eq!(v.len(), model.statistics().dimension());
                    assert_eq!(v.len(), model.vocabulary_len());

                    let r = detector.predict("Miracle cure found", "").unwrap();
                    assert_eq!(r.mode, PredictionMode::Model);
                    assert_eq!(r.label, Label::Fake);
                    assert!((0.0..=1.0).contains(&r.confidence));
                    n += 1;
                }
                n
            })
        })
        .collect();

    for extra in 1..=20 {
        let model =
            TrainedModel::train(&extended_corpus(extra), &cfg.features, &cfg.classifier).unwrap();
        registry.publish(model);
    }
    stop.store(true, Ordering::Relaxed);

    for r in readers {
        assert!(r.join().expect("reader panicked") >= 50);
    }
    // demo (17) + 2 new tokens per extra document pair
    assert_eq!(registry.current().unwrap().vocabulary_len(), 17 + 2 * 20);
}
