//! Learning-Rate Schedules
//!
//! The optimizers take the learning rate as a plain argument on every step, so
//! scheduling is just a function from epoch to rate. The milestone schedule
//! drives the active-learning trainer; the plateau schedule drives the
//! representation-learning pretraining, where progress is measured by loss
//! rather than epoch count.

/// Epoch-indexed learning-rate schedule
#[derive(Debug, Clone, PartialEq)]
pub enum LrSchedule {
    /// The same rate for every epoch
    Constant { lr: f64 },
    /// Multiply by `gamma` at each milestone epoch
    MultiStep {
        initial_lr: f64,
        gamma: f64,
        milestones: Vec<usize>,
    },
}

impl LrSchedule {
    /// Learning rate in effect for a zero-indexed epoch.
    pub fn lr_at(&self, epoch: usize) -> f64 {
        match self {
            Self::Constant { lr } => *lr,
            Self::MultiStep {
                initial_lr,
                gamma,
                milestones,
            } => {
                let decays = milestones.iter().filter(|&&m| epoch >= m).count();
                initial_lr * gamma.powi(decays as i32)
            }
        }
    }
}

/// Loss-driven schedule: shrink the rate by `factor` after `patience` epochs
/// without improvement, then hold still for `cooldown` epochs.
#[derive(Debug, Clone)]
pub struct PlateauSchedule {
    lr: f64,
    factor: f64,
    patience: usize,
    cooldown: usize,
    best: Option<f64>,
    bad_epochs: usize,
    cooldown_remaining: usize,
}

impl PlateauSchedule {
    pub fn new(initial_lr: f64, factor: f64, patience: usize, cooldown: usize) -> Self {
        Self {
            lr: initial_lr,
            factor,
            patience,
            cooldown,
            best: None,
            bad_epochs: 0,
            cooldown_remaining: 0,
        }
    }

    /// Record one epoch's loss and return the rate to use next epoch.
    pub fn observe(&mut self, loss: f64) -> f64 {
        match self.best {
            Some(best) if loss < best => {
                self.best = Some(loss);
                self.bad_epochs = 0;
            }
            Some(_) => {
                if self.cooldown_remaining > 0 {
                    self.cooldown_remaining -= 1;
                    self.bad_epochs = 0;
                } else {
                    self.bad_epochs += 1;
                    if self.bad_epochs > self.patience {
                        self.lr *= self.factor;
                        self.bad_epochs = 0;
                        self.cooldown_remaining = self.cooldown;
                    }
                }
            }
            None => self.best = Some(loss),
        }
        self.lr
    }

    pub fn lr(&self) -> f64 {
        self.lr
    }
}
