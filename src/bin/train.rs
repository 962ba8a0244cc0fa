//! Offline trainer: reads the fake/real corpora, trains, and writes the model store.
//!
//! ```text
//! fake-news-train --fake data/fake.jsonl --real data/real.jsonl --out model
//! fake-news-train --demo --out model
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use fake_news_detector::{
    config::DetectorConfig,
    corpus,
    model::{ModelStore, TrainedModel},
    Label,
};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "fake-news-train", about = "Train the fake news classifier")]
struct Args {
    /// JSON Lines file of fake records (defaults to model.fake_corpus from config).
    #[arg(long)]
    fake: Option<PathBuf>,

    /// JSON Lines file of real records (defaults to model.real_corpus from config).
    #[arg(long)]
    real: Option<PathBuf>,

    /// Train on the built-in four-document demo corpus.
    #[arg(long, conflicts_with_all = ["fake", "real"])]
    demo: bool,

    /// Model store directory (defaults to model.store_dir from config).
    #[arg(long, env = "DETECTOR_MODEL_DIR")]
    out: Option<PathBuf>,

    /// Weight features by inverse document frequency.
    #[arg(long)]
    idf: bool,

    /// Minimum corpus frequency for a token to enter the vocabulary.
    #[arg(long)]
    min_token_freq: Option<usize>,

    /// Laplace smoothing constant.
    #[arg(long)]
    smoothing: Option<f64>,

    /// Texts to classify with the freshly trained model.
    #[arg(long = "check")]
    check: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fake_news_detector=info,fake_news_train=info".into()),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let mut cfg = DetectorConfig::from_env()?;
    if args.idf {
        cfg.features.use_idf = true;
    }
    if let Some(n) = args.min_token_freq {
        cfg.features.min_token_freq = n.max(1);
    }
    if let Some(a) = args.smoothing {
        cfg.classifier.smoothing = a;
    }
    cfg.validate()?;

    let docs = if args.demo {
        corpus::demo_corpus()
    } else {
        let fake = args
            .fake
            .or(cfg.model.fake_corpus.clone())
            .context("no fake corpus: pass --fake or set model.fake_corpus")?;
        let real = args
            .real
            .or(cfg.model.real_corpus.clone())
            .context("no real corpus: pass --real or set model.real_corpus")?;
        corpus::load_pair(&fake, &real)?
    };
    let n_fake = docs.iter().filter(|d| d.label == Label::Fake).count();
    info!(documents = docs.len(), fake = n_fake, real = docs.len() - n_fake, "corpus loaded");

    let model = TrainedModel::train(&docs, &cfg.features, &cfg.classifier)
        .context("training aborted; nothing written")?;

    let store = ModelStore::new(args.out.unwrap_or(cfg.model.store_dir));
    store.save(&model)?;

    for text in &args.check {
        let p = model.predict(text);
        println!("{:>4} {:>6.2}%  {}", p.label.to_string(), p.confidence * 100.0, text);
    }
    println!(
        "model written to {} (vocabulary {})",
        store.dir().display(),
        model.vocabulary_len()
    );
    Ok(())
}
