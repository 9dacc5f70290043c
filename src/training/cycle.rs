//! Active-Learning Loop
//!
//! The orchestrator: for each trial, seed a fresh labeled/unlabeled split,
//! then run cycles of train -> evaluate -> score pool -> select -> promote.
//! The loop owns the pool and the model pair for its whole lifetime; every
//! collaborator communicates through return values only.

use std::collections::HashSet;
use std::path::PathBuf;

use burn::data::dataset::Dataset;
use burn::module::AutodiffModule;
use burn::tensor::backend::AutodiffBackend;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dataset::augmentation::augment_items;
use crate::dataset::cifar::{CifarDataset, CifarItem, DatasetKind};
use crate::dataset::pool::SamplePool;
use crate::model::{sgd_pair, BackboneConfig, ModelPair, SgdSettings};
use crate::training::epoch::{EpochSettings, EpochTrainer};
use crate::training::evaluate::Evaluator;
use crate::training::scheduler::LrSchedule;
use crate::training::scoring::{ScoreVariant, UncertaintyRecord, UncertaintyScorer};
use crate::training::selection::SelectionPolicy;
use crate::utils::{ExperimentError, RecordSink, Result, SelectionDump};

/// Everything one active-learning run needs, resolved before the first cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Which dataset to run on
    pub dataset: DatasetKind,
    /// Directory holding the unpacked CIFAR binaries
    pub data_dir: PathBuf,
    /// Directory for accuracy records and selection dumps
    pub output_dir: PathBuf,

    /// Independent repetitions with fresh random splits
    pub trials: usize,
    /// Label-acquisition rounds per trial
    pub cycles: usize,
    /// Training epochs per cycle
    pub epochs: usize,

    /// Seed labeled-set size at trial start
    pub initial_labeled: usize,
    /// Samples labeled per cycle
    pub budget: usize,
    /// Per-class minimum per cycle; `None` selects plain top-budget
    pub per_class_min: Option<usize>,

    /// Mini-batch size, must be even for the pairwise ranking loss
    pub batch_size: usize,
    pub lr: f64,
    pub momentum: f64,
    pub weight_decay: f64,
    /// Epochs at which the learning rate decays by `gamma`
    pub milestones: Vec<usize>,
    pub gamma: f64,

    pub ranking_margin: f32,
    pub ranking_weight: f32,
    /// After this epoch the ranking gradient stops reaching the backbone
    pub detach_after_epoch: usize,

    /// Width of the backbone's first stage
    pub base_filters: usize,
    /// Projection width inside the loss net
    pub interm_dim: usize,

    /// Carry model parameters across cycles instead of retraining from
    /// scratch each cycle
    pub warm_start: bool,
    /// Also score the pool with the true loss each cycle and dump the
    /// proxy-vs-oracle comparison
    pub oracle_dumps: bool,

    pub seed: u64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetKind::Cifar10,
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("results"),
            trials: 3,
            cycles: 10,
            epochs: 200,
            initial_labeled: 1000,
            budget: 1000,
            per_class_min: None,
            batch_size: 128,
            lr: 0.1,
            momentum: 0.9,
            weight_decay: 5e-4,
            milestones: vec![160],
            gamma: 0.1,
            ranking_margin: 1.0,
            ranking_weight: 1.0,
            detach_after_epoch: 120,
            base_filters: 32,
            interm_dim: 128,
            warm_start: false,
            oracle_dumps: false,
            seed: 42,
        }
    }
}

impl ExperimentConfig {
    /// Fail fast on malformed parameters, before any data is loaded.
    pub fn validate(&self) -> Result<()> {
        if self.trials == 0 || self.cycles == 0 || self.epochs == 0 {
            return Err(ExperimentError::Config(
                "trials, cycles and epochs must all be positive".into(),
            ));
        }
        if self.initial_labeled == 0 {
            return Err(ExperimentError::Config(
                "initial labeled set must not be empty".into(),
            ));
        }
        if self.batch_size < 2 || self.batch_size % 2 != 0 {
            return Err(ExperimentError::Config(format!(
                "batch size must be even and at least 2, got {}",
                self.batch_size
            )));
        }
        self.policy().validate()
    }

    /// The selection policy this config describes.
    pub fn policy(&self) -> SelectionPolicy {
        match self.per_class_min {
            Some(per_class_min) => SelectionPolicy::ClassFloor {
                budget: self.budget,
                per_class_min,
                num_classes: self.dataset.num_classes(),
            },
            None => SelectionPolicy::TopB {
                budget: self.budget,
            },
        }
    }

    fn schedule(&self) -> LrSchedule {
        LrSchedule::MultiStep {
            initial_lr: self.lr,
            gamma: self.gamma,
            milestones: self.milestones.clone(),
        }
    }

    fn epoch_settings(&self) -> EpochSettings {
        EpochSettings {
            batch_size: self.batch_size,
            ranking_margin: self.ranking_margin,
            ranking_weight: self.ranking_weight,
            detach_after_epoch: self.detach_after_epoch,
        }
    }
}

/// Accuracy trajectory of one trial
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    pub trial: usize,
    /// Test accuracy (percent) after each cycle's training
    pub accuracies: Vec<f32>,
    /// Labeled-set size at trial end
    pub final_labeled: usize,
}

/// Runs the full trials x cycles experiment.
pub struct ActiveLearningLoop<B: AutodiffBackend> {
    config: ExperimentConfig,
    train_set: CifarDataset,
    test_items: Vec<CifarItem>,
    trainer: EpochTrainer,
    evaluator: Evaluator,
    scorer: UncertaintyScorer,
    policy: SelectionPolicy,
    schedule: LrSchedule,
    sink: RecordSink,
    device: B::Device,
}

impl<B: AutodiffBackend> ActiveLearningLoop<B> {
    pub fn new(
        config: ExperimentConfig,
        train_set: CifarDataset,
        test_set: CifarDataset,
        device: B::Device,
    ) -> Result<Self> {
        config.validate()?;
        if train_set.kind() != config.dataset || test_set.kind() != config.dataset {
            return Err(ExperimentError::Config(format!(
                "loop configured for {} but given {} / {} splits",
                config.dataset,
                train_set.kind(),
                test_set.kind()
            )));
        }

        let test_items: Vec<CifarItem> = (0..test_set.len())
            .filter_map(|i| test_set.get(i))
            .collect();

        let sink = RecordSink::new(&config.output_dir);
        let trainer = EpochTrainer::new(config.epoch_settings());
        let evaluator = Evaluator::new(config.batch_size);
        let scorer = UncertaintyScorer::new(config.batch_size);
        let policy = config.policy();
        let schedule = config.schedule();

        Ok(Self {
            config,
            train_set,
            test_items,
            trainer,
            evaluator,
            scorer,
            policy,
            schedule,
            sink,
            device,
        })
    }

    /// Run every trial to completion, returning one accuracy trajectory each.
    pub fn run(&self) -> Result<Vec<TrialResult>> {
        let mut results = Vec::with_capacity(self.config.trials);
        for trial in 0..self.config.trials {
            results.push(self.run_trial(trial)?);
        }
        self.sink
            .write_summary(results.iter().map(|r| r.accuracies.clone()).collect())?;
        Ok(results)
    }

    fn run_trial(&self, trial: usize) -> Result<TrialResult> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed.wrapping_add(trial as u64));
        let mut pool = SamplePool::split(
            self.train_set.len(),
            self.config.initial_labeled,
            &mut rng,
        )?;
        self.sink.start_trial(trial)?;

        info!(
            trial = trial + 1,
            trials = self.config.trials,
            labeled = pool.labeled().len(),
            pool = pool.unlabeled().len(),
            "trial started"
        );

        let backbone_config = BackboneConfig::new(self.config.dataset.num_classes())
            .with_base_filters(self.config.base_filters);
        let sgd = SgdSettings {
            momentum: self.config.momentum,
            weight_decay: self.config.weight_decay,
        };

        let mut pair = ModelPair::<B>::new(&backbone_config, self.config.interm_dim, &self.device);
        let mut accuracies = Vec::with_capacity(self.config.cycles);

        for cycle in 0..self.config.cycles {
            if cycle > 0 && !self.config.warm_start {
                pair = ModelPair::new(&backbone_config, self.config.interm_dim, &self.device);
            }
            let mut optimizers = sgd_pair::<B>(&sgd);

            for epoch in 0..self.config.epochs {
                let lr = self.schedule.lr_at(epoch);
                let mut items = self.labeled_items(&pool)?;
                items.shuffle(&mut rng);
                augment_items(&mut items, &mut rng);

                let (trained, stats) = self.trainer.train_epoch(
                    pair,
                    &mut optimizers,
                    &items,
                    epoch,
                    lr,
                    &self.device,
                )?;
                pair = trained;

                debug!(
                    cycle = cycle + 1,
                    epoch = epoch + 1,
                    lr,
                    loss = stats.total_loss,
                    "epoch done"
                );
            }

            let accuracy =
                self.evaluator
                    .accuracy(&pair.backbone.valid(), &self.test_items, &self.device)?;
            accuracies.push(accuracy);
            self.sink.append_accuracy(trial, accuracy as f64)?;

            info!(
                trial = trial + 1,
                cycle = cycle + 1,
                cycles = self.config.cycles,
                labeled = pool.labeled().len(),
                accuracy,
                "cycle finished"
            );

            if pool.unlabeled().is_empty() {
                info!(trial = trial + 1, "unlabeled pool exhausted, ending trial");
                break;
            }

            let records = self.scorer.score(
                &pair.backbone.valid(),
                &pair.loss_net.valid(),
                &self.train_set,
                pool.unlabeled(),
                ScoreVariant::PredictedLoss,
                &self.device,
            )?;
            let selected = self.policy.select(&records)?;

            if self.config.oracle_dumps {
                self.dump_selection(&pair, &pool, &records, &selected, cycle)?;
            }

            pool.promote(&selected)?;
        }

        Ok(TrialResult {
            trial,
            accuracies,
            final_labeled: pool.labeled().len(),
        })
    }

    fn labeled_items(&self, pool: &SamplePool) -> Result<Vec<CifarItem>> {
        pool.labeled()
            .iter()
            .map(|&index| {
                self.train_set.get(index).ok_or_else(|| {
                    ExperimentError::Pool(format!(
                        "labeled index {index} is outside the training set"
                    ))
                })
            })
            .collect()
    }

    /// Score the same pool with the true loss and dump both rankings for
    /// offline bias analysis. The oracle ranking never influences selection.
    fn dump_selection(
        &self,
        pair: &ModelPair<B>,
        pool: &SamplePool,
        records: &[UncertaintyRecord],
        selected: &[usize],
        cycle: usize,
    ) -> Result<()> {
        let real_records = self.scorer.score(
            &pair.backbone.valid(),
            &pair.loss_net.valid(),
            &self.train_set,
            pool.unlabeled(),
            ScoreVariant::TrueLoss,
            &self.device,
        )?;
        let oracle_policy = SelectionPolicy::TopB {
            budget: self.config.budget,
        };
        let real_samples = oracle_policy.select(&real_records)?;

        let num_classes = self.config.dataset.num_classes();
        let dump = SelectionDump {
            cycle,
            samples: selected.to_vec(),
            label_cnt: class_histogram(records, selected, num_classes),
            real_samples: Some(real_samples.clone()),
            real_label_cnt: Some(class_histogram(&real_records, &real_samples, num_classes)),
        };
        self.sink.write_selection(&dump)
    }
}

fn class_histogram(
    records: &[UncertaintyRecord],
    selected: &[usize],
    num_classes: usize,
) -> Vec<usize> {
    let selected: HashSet<usize> = selected.iter().copied().collect();
    let mut counts = vec![0usize; num_classes];
    for record in records {
        if selected.contains(&record.index) {
            counts[record.label] += 1;
        }
    }
    counts
}
