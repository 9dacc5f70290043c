//! Selection Policies
//!
//! Decides which scored pool samples get labeled each cycle. Plain top-B takes
//! the highest-scoring samples outright; the class-floor variant reserves part
//! of the budget to guarantee every class a minimum number of new labels, then
//! backfills with the next-highest scores so the full budget is always spent.

use tracing::warn;

use crate::training::scoring::UncertaintyRecord;
use crate::utils::{ExperimentError, Result};

/// How selected samples are picked from the scored pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// The `budget` highest-scoring samples, nothing else considered
    TopB { budget: usize },
    /// Top-B with a per-class minimum: every class gets at least
    /// `per_class_min` new labels per cycle while that many remain in the pool
    ClassFloor {
        budget: usize,
        per_class_min: usize,
        num_classes: usize,
    },
}

impl SelectionPolicy {
    /// Samples moved to the labeled set per cycle
    pub fn budget(&self) -> usize {
        match self {
            Self::TopB { budget } => *budget,
            Self::ClassFloor { budget, .. } => *budget,
        }
    }

    /// Fail fast on malformed budget parameters, before any cycle starts.
    pub fn validate(&self) -> Result<()> {
        if self.budget() == 0 {
            return Err(ExperimentError::Config(
                "selection budget must be positive".into(),
            ));
        }
        if let Self::ClassFloor {
            budget,
            per_class_min,
            num_classes,
        } = self
        {
            if per_class_min * num_classes > *budget {
                return Err(ExperimentError::Config(format!(
                    "per-class minimum {} x {} classes exceeds budget {}",
                    per_class_min, num_classes, budget
                )));
            }
        }
        Ok(())
    }

    /// Pick the sample indices to label this cycle.
    ///
    /// Pure with respect to pool state: the caller promotes the returned
    /// indices afterwards. A pool smaller than the budget is taken whole,
    /// with a warning.
    pub fn select(&self, records: &[UncertaintyRecord]) -> Result<Vec<usize>> {
        self.validate()?;

        let budget = self.budget().min(records.len());
        if budget < self.budget() {
            warn!(
                budget = self.budget(),
                pool = records.len(),
                "pool smaller than budget, labeling the remainder"
            );
        }

        // Ascending stable sort, consumed back to front, so score ties
        // resolve the same way every run.
        let mut order: Vec<usize> = (0..records.len()).collect();
        order.sort_by(|&a, &b| records[a].score.total_cmp(&records[b].score));
        let descending: Vec<&UncertaintyRecord> =
            order.iter().rev().map(|&i| &records[i]).collect();

        match self {
            Self::TopB { .. } => Ok(descending
                .iter()
                .take(budget)
                .map(|record| record.index)
                .collect()),
            Self::ClassFloor {
                per_class_min,
                num_classes,
                ..
            } => Ok(Self::select_with_floor(
                &descending,
                budget,
                *per_class_min,
                *num_classes,
            )),
        }
    }

    /// Three passes over the descending-score order: a head of
    /// `budget - per_class_min * num_classes` unconditional picks, a floor
    /// walk that tops every class up to `per_class_min` admissions, and a
    /// backfill of next-highest scores until the budget is spent. Head picks
    /// count toward a class's floor, so a head that already covers a class
    /// costs the floor walk nothing.
    fn select_with_floor(
        descending: &[&UncertaintyRecord],
        budget: usize,
        per_class_min: usize,
        num_classes: usize,
    ) -> Vec<usize> {
        let head_size = budget.saturating_sub(per_class_min * num_classes);

        let mut taken = vec![false; descending.len()];
        let mut class_counts = vec![0usize; num_classes];
        let mut selected = Vec::with_capacity(budget);

        for (pos, record) in descending.iter().enumerate().take(head_size) {
            taken[pos] = true;
            class_counts[record.label] += 1;
            selected.push(record.index);
        }

        for (pos, record) in descending.iter().enumerate().skip(head_size) {
            if selected.len() == budget {
                break;
            }
            if class_counts[record.label] < per_class_min {
                taken[pos] = true;
                class_counts[record.label] += 1;
                selected.push(record.index);
            }
        }

        for (pos, record) in descending.iter().enumerate() {
            if selected.len() == budget {
                break;
            }
            if !taken[pos] {
                taken[pos] = true;
                selected.push(record.index);
            }
        }

        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(index: usize, score: f32, label: usize) -> UncertaintyRecord {
        UncertaintyRecord {
            index,
            score,
            label,
        }
    }

    fn records_from_scores(scores: &[f32]) -> Vec<UncertaintyRecord> {
        scores
            .iter()
            .enumerate()
            .map(|(i, &score)| record(i, score, 0))
            .collect()
    }

    #[test]
    fn test_top_b_picks_three_highest() {
        let records =
            records_from_scores(&[0.1, 0.9, 0.3, 0.8, 0.2, 0.7, 0.05, 0.6, 0.4, 0.5]);
        let policy = SelectionPolicy::TopB { budget: 3 };

        let mut selected = policy.select(&records).unwrap();
        selected.sort_unstable();
        assert_eq!(selected, vec![1, 3, 5]);
    }

    #[test]
    fn test_top_b_order_independent() {
        let mut records =
            records_from_scores(&[0.1, 0.9, 0.3, 0.8, 0.2, 0.7, 0.05, 0.6, 0.4, 0.5]);
        records.reverse();
        let policy = SelectionPolicy::TopB { budget: 3 };

        let mut selected = policy.select(&records).unwrap();
        selected.sort_unstable();
        assert_eq!(selected, vec![1, 3, 5]);
    }

    #[test]
    fn test_zero_budget_rejected() {
        let policy = SelectionPolicy::TopB { budget: 0 };
        assert!(matches!(
            policy.select(&records_from_scores(&[0.5])),
            Err(ExperimentError::Config(_))
        ));
    }

    #[test]
    fn test_floor_exceeding_budget_rejected() {
        let policy = SelectionPolicy::ClassFloor {
            budget: 8,
            per_class_min: 1,
            num_classes: 10,
        };
        assert!(matches!(policy.validate(), Err(ExperimentError::Config(_))));
    }

    #[test]
    fn test_small_pool_taken_whole() {
        let records = records_from_scores(&[0.3, 0.1]);
        let policy = SelectionPolicy::TopB { budget: 5 };

        let mut selected = policy.select(&records).unwrap();
        selected.sort_unstable();
        assert_eq!(selected, vec![0, 1]);
    }

    #[test]
    fn test_floor_noop_when_head_covers_all_classes() {
        // Descending scores alternate through all four classes, so the head
        // already satisfies the floor and the result matches plain top-8.
        let records: Vec<UncertaintyRecord> = (0..10)
            .map(|i| record(i, 1.0 - i as f32 * 0.1, i % 4))
            .collect();

        let floor = SelectionPolicy::ClassFloor {
            budget: 8,
            per_class_min: 1,
            num_classes: 4,
        };
        let top = SelectionPolicy::TopB { budget: 8 };

        let mut with_floor = floor.select(&records).unwrap();
        let mut plain = top.select(&records).unwrap();
        with_floor.sort_unstable();
        plain.sort_unstable();
        assert_eq!(with_floor, plain);
    }

    #[test]
    fn test_floor_pulls_missing_classes_from_tail() {
        // Classes 0 and 1 dominate the high scores; classes 2 and 3 sit at
        // the bottom and must be pulled in by the floor.
        let records = vec![
            record(0, 1.00, 0),
            record(1, 0.95, 0),
            record(2, 0.90, 0),
            record(3, 0.85, 0),
            record(4, 0.80, 1),
            record(5, 0.75, 1),
            record(6, 0.70, 1),
            record(7, 0.65, 1),
            record(8, 0.30, 2),
            record(9, 0.20, 3),
            record(10, 0.10, 2),
        ];
        let policy = SelectionPolicy::ClassFloor {
            budget: 8,
            per_class_min: 1,
            num_classes: 4,
        };

        let selected = policy.select(&records).unwrap();
        assert_eq!(selected.len(), 8);

        let classes: Vec<usize> = selected
            .iter()
            .map(|&index| records.iter().find(|r| r.index == index).unwrap().label)
            .collect();
        for class in 0..4 {
            assert!(classes.contains(&class), "class {class} missing");
        }
        // Backfill spends the remaining slot on the best leftover score.
        assert!(selected.contains(&5));
    }

    #[test]
    fn test_floor_ignores_classes_absent_from_pool() {
        // Class 3 has no pool samples left; the budget is still spent.
        let records = vec![
            record(0, 0.9, 0),
            record(1, 0.8, 1),
            record(2, 0.7, 2),
            record(3, 0.6, 0),
            record(4, 0.5, 1),
        ];
        let policy = SelectionPolicy::ClassFloor {
            budget: 4,
            per_class_min: 1,
            num_classes: 4,
        };

        let selected = policy.select(&records).unwrap();
        assert_eq!(selected.len(), 4);
    }

    #[test]
    fn test_selected_indices_unique() {
        let records: Vec<UncertaintyRecord> = (0..20)
            .map(|i| record(i, (i as f32 * 7.3) % 1.0, i % 4))
            .collect();
        let policy = SelectionPolicy::ClassFloor {
            budget: 12,
            per_class_min: 2,
            num_classes: 4,
        };

        let mut selected = policy.select(&records).unwrap();
        assert_eq!(selected.len(), 12);
        selected.sort_unstable();
        selected.dedup();
        assert_eq!(selected.len(), 12);
    }
}
