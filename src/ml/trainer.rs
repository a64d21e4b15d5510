// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Full train + validation loop using Burn's DataLoader and Adam.
//
//   - Training runs on an autodiff backend (Autodiff<Wgpu> from
//     the CLI, Autodiff<NdArray> in tests)
//   - model.valid() returns the model on the inner backend with
//     dropout off, so the validation batcher uses that backend too
//   - Training feeds the decoder via RatioForcing, validation
//     always feeds the true previous token
//   - Gradients are clipped by global norm before every update
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{Context, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::DialogueBatcher, dataset::DialogueDataset};
use crate::domain::vocabulary::Vocabulary;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::{
    model::Seq2Seq,
    teacher_forcing::{AlwaysForce, RatioForcing},
};

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

pub fn run_training(
    cfg:           &TrainConfig,
    vocab:         &Vocabulary,
    train_dataset: DialogueDataset,
    val_dataset:   DialogueDataset,
    ckpt_manager:  &CheckpointManager,
) -> Result<Vec<EpochMetrics>> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop::<MyBackend>(cfg, vocab, train_dataset, val_dataset, ckpt_manager, device)
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    vocab:         &Vocabulary,
    train_dataset: DialogueDataset,
    val_dataset:   DialogueDataset,
    ckpt_manager:  &CheckpointManager,
    device:        B::Device,
) -> Result<Vec<EpochMetrics>> {
    B::seed(cfg.seed);

    let pad_id = vocab.pad_id().context("training vocabulary has no <pad> token")?;
    let sos_id = vocab.sos_id();
    let eos_id = vocab.eos_id();

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: Seq2Seq<B> = cfg.model_config(vocab.len()).init(&device);
    tracing::info!(
        "Model ready: vocab={}, hidden={}, layers={}, attention={:?}",
        vocab.len(), cfg.hidden_size, cfg.num_layers, cfg.attention,
    );

    // ── Adam optimiser with gradient-norm clipping ────────────────────────────
    let optim_cfg = AdamConfig::new()
        .with_epsilon(1e-8)
        .with_grad_clipping(Some(GradientClippingConfig::Norm(cfg.clip as f32)));
    let mut optim = optim_cfg.init();

    // ── Training data loader (autodiff backend) ───────────────────────────────
    let train_batcher = DialogueBatcher::<B>::new(device.clone(), pad_id, eos_id);
    let train_loader  = DataLoaderBuilder::new(train_batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train_dataset);

    // ── Validation data loader (inner backend, no autodiff overhead) ──────────
    let val_batcher = DialogueBatcher::<B::InnerBackend>::new(device.clone(), pad_id, eos_id);
    let val_loader  = DataLoaderBuilder::new(val_batcher)
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(val_dataset);

    let metrics_logger = MetricsLogger::new(ckpt_manager.dir())?;
    let mut forcing = RatioForcing::new(cfg.teacher_forcing_ratio, cfg.seed);
    let mut history = Vec::with_capacity(cfg.epochs);
    let mut best_val_loss = f64::INFINITY;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for batch in train_loader.iter() {
            let output = model.forward_loss(&batch, sos_id, &mut forcing);

            let loss_val: f64 = output.loss.clone().into_scalar().elem::<f64>();
            train_loss_sum += loss_val;
            train_batches  += 1;

            let grads = output.loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }

        let avg_train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else { f64::NAN };

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();

        let mut val_loss_sum   = 0.0f64;
        let mut val_batches    = 0usize;
        let mut correct_tokens = 0usize;
        let mut total_tokens   = 0usize;

        for batch in val_loader.iter() {
            let output = model_valid.forward_loss(&batch, sos_id, &mut AlwaysForce);

            val_loss_sum += output.loss.into_scalar().elem::<f64>();
            val_batches  += 1;

            let correct: i64 = (output.predictions.equal(batch.targets.clone()).int()
                * batch.target_mask.clone())
                .sum().into_scalar().elem::<i64>();
            let total: i64 = batch.target_mask.sum().into_scalar().elem::<i64>();

            correct_tokens += correct as usize;
            total_tokens   += total as usize;
        }

        let avg_val_loss = if val_batches  > 0 { val_loss_sum / val_batches as f64 } else { f64::NAN };
        let accuracy     = if total_tokens > 0 { correct_tokens as f64 / total_tokens as f64 } else { 0.0 };

        let metrics = EpochMetrics::new(epoch, avg_train_loss, avg_val_loss, accuracy);
        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | val_acc={:.1}% | ppl={:.2}",
            epoch, cfg.epochs, avg_train_loss, avg_val_loss,
            accuracy * 100.0, metrics.perplexity(),
        );
        metrics_logger.log(&metrics)?;

        if metrics.is_improvement(best_val_loss) {
            best_val_loss = metrics.val_loss;
            tracing::info!("New best val_loss {:.4} at epoch {}", best_val_loss, epoch);
        }

        ckpt_manager.save_model(&model, epoch)?;
        tracing::info!("Checkpoint saved for epoch {}", epoch);
        history.push(metrics);
    }

    tracing::info!("Training complete!");
    Ok(history)
}
