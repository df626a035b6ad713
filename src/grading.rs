use std::collections::BTreeMap;

use crate::error::GradeError;
use crate::models::{
    AggregateStats, ClassAverage, ClassStats, GradeRecord, LearnerAverage, ScoreEntry, ScoreType,
};

/// Learners strictly above this weighted average pass in the global stats.
pub const GLOBAL_THRESHOLD: f64 = 50.0;
/// Learners strictly above this weighted average pass in the per-class stats.
pub const CLASS_THRESHOLD: f64 = 70.0;

const CATEGORIES: [ScoreType; 3] = [ScoreType::Exam, ScoreType::Quiz, ScoreType::Homework];

/// Stratified weighted mean of a set of score entries.
///
/// Entries are partitioned by category and each non-empty partition is
/// averaged. A category without entries contributes nothing, so a learner
/// with only exams can reach at most half marks. Returns `None` when there
/// are no entries at all.
pub fn weighted_average<'a, I>(scores: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a ScoreEntry>,
{
    let mut totals = [(0.0_f64, 0usize); 3];

    for entry in scores {
        let slot = match entry.score_type {
            ScoreType::Exam => 0,
            ScoreType::Quiz => 1,
            ScoreType::Homework => 2,
        };
        totals[slot].0 += entry.score;
        totals[slot].1 += 1;
    }

    if totals.iter().all(|(_, count)| *count == 0) {
        return None;
    }

    let mut weighted = 0.0;
    for (category, (sum, count)) in CATEGORIES.iter().zip(totals) {
        if count > 0 {
            weighted += category.weight() * (sum / count as f64);
        }
    }

    Some(weighted)
}

/// Flattens the scores of `records` into groups keyed by `key` and averages
/// each group. Groups without any scores are left out. Output is ordered by key.
fn averages_by<'a, I, K, F>(records: I, key: F) -> Vec<(K, f64)>
where
    I: IntoIterator<Item = &'a GradeRecord>,
    K: Ord,
    F: Fn(&GradeRecord) -> K,
{
    let mut groups: BTreeMap<K, Vec<&ScoreEntry>> = BTreeMap::new();

    for record in records {
        groups.entry(key(record)).or_default().extend(record.scores.iter());
    }

    groups
        .into_iter()
        .filter_map(|(group, scores)| weighted_average(scores).map(|avg| (group, avg)))
        .collect()
}

/// Per-class weighted averages for one learner. An unknown learner yields an
/// empty list rather than an error.
pub fn learner_class_averages(records: &[GradeRecord], learner_id: i32) -> Vec<ClassAverage> {
    let scoped = records
        .iter()
        .filter(|record| record.learner_id == learner_id);

    averages_by(scoped, |record| record.class_id)
        .into_iter()
        .map(|(class_id, avg)| ClassAverage { class_id, avg })
        .collect()
}

/// Weighted average of every learner across all of their classes.
pub fn learner_averages<'a, I>(records: I) -> Vec<LearnerAverage>
where
    I: IntoIterator<Item = &'a GradeRecord>,
{
    averages_by(records, |record| record.learner_id)
        .into_iter()
        .map(|(learner_id, weighted_average)| LearnerAverage {
            learner_id,
            weighted_average,
        })
        .collect()
}

/// Counts the averages strictly above `threshold`. `None` when there is
/// nothing to count.
pub fn summarize(averages: &[LearnerAverage], threshold: f64) -> Option<AggregateStats> {
    if averages.is_empty() {
        return None;
    }

    let total_learners = averages.len();
    let learners_above_threshold = averages
        .iter()
        .filter(|learner| learner.weighted_average > threshold)
        .count();

    Some(AggregateStats {
        total_learners,
        learners_above_threshold,
        percentage_above_threshold: learners_above_threshold as f64 / total_learners as f64
            * 100.0,
    })
}

pub fn global_stats(records: &[GradeRecord]) -> Result<AggregateStats, GradeError> {
    summarize(&learner_averages(records), GLOBAL_THRESHOLD)
        .ok_or_else(|| GradeError::NotFound("no learners with scores".to_string()))
}

pub fn class_stats(records: &[GradeRecord], class_id: i32) -> Result<ClassStats, GradeError> {
    let scoped = records.iter().filter(|record| record.class_id == class_id);

    summarize(&learner_averages(scoped), CLASS_THRESHOLD)
        .map(|stats| ClassStats::new(class_id, stats))
        .ok_or_else(|| {
            GradeError::NotFound(format!("no learners with scores in class {class_id}"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(score_type: ScoreType, score: f64) -> ScoreEntry {
        ScoreEntry { score_type, score }
    }

    fn record(learner_id: i32, class_id: i32, exam: f64, quiz: f64, homework: f64) -> GradeRecord {
        GradeRecord {
            learner_id,
            class_id,
            scores: vec![
                entry(ScoreType::Exam, exam),
                entry(ScoreType::Quiz, quiz),
                entry(ScoreType::Homework, homework),
            ],
        }
    }

    fn uniform(learner_id: i32, class_id: i32, score: f64) -> GradeRecord {
        record(learner_id, class_id, score, score, score)
    }

    fn exam_only(learner_id: i32, class_id: i32, exam: f64) -> GradeRecord {
        GradeRecord {
            learner_id,
            class_id,
            scores: vec![entry(ScoreType::Exam, exam)],
        }
    }

    #[test]
    fn weights_follow_category_shares() {
        let scores = vec![
            entry(ScoreType::Exam, 80.0),
            entry(ScoreType::Quiz, 90.0),
            entry(ScoreType::Homework, 100.0),
        ];
        let avg = weighted_average(&scores).unwrap();
        assert!((avg - 87.0).abs() < 1e-9);
    }

    #[test]
    fn categories_are_averaged_before_weighting() {
        let scores = vec![
            entry(ScoreType::Exam, 70.0),
            entry(ScoreType::Exam, 90.0),
            entry(ScoreType::Quiz, 50.0),
            entry(ScoreType::Homework, 100.0),
            entry(ScoreType::Homework, 60.0),
        ];
        let expected = 0.5 * 80.0 + 0.3 * 50.0 + 0.2 * 80.0;
        assert!((weighted_average(&scores).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn empty_scores_have_no_average() {
        assert_eq!(weighted_average(&Vec::<ScoreEntry>::new()), None);
    }

    #[test]
    fn missing_category_contributes_zero() {
        let exams = vec![entry(ScoreType::Exam, 80.0)];
        assert!((weighted_average(&exams).unwrap() - 40.0).abs() < 1e-9);

        let scores = vec![entry(ScoreType::Exam, 80.0), entry(ScoreType::Quiz, 60.0)];
        let expected = 0.5 * 80.0 + 0.3 * 60.0;
        assert!((weighted_average(&scores).unwrap() - expected).abs() < 1e-9);

        let homework = vec![entry(ScoreType::Homework, 45.0)];
        assert!((weighted_average(&homework).unwrap() - 9.0).abs() < 1e-9);
    }

    #[test]
    fn missing_category_can_drop_learner_below_threshold() {
        let records = vec![exam_only(1, 10, 90.0), uniform(2, 10, 60.0)];

        let stats = global_stats(&records).unwrap();
        assert_eq!(stats.total_learners, 2);
        assert_eq!(stats.learners_above_threshold, 1);

        let averages = learner_averages(&records);
        assert!((averages[0].weighted_average - 45.0).abs() < 1e-9);
    }

    #[test]
    fn averages_per_class_for_one_learner() {
        let records = vec![
            record(1, 10, 80.0, 90.0, 100.0),
            record(1, 20, 60.0, 70.0, 50.0),
            record(2, 10, 0.0, 0.0, 0.0),
        ];

        let averages = learner_class_averages(&records, 1);
        assert_eq!(averages.len(), 2);
        assert_eq!(averages[0].class_id, 10);
        assert!((averages[0].avg - 87.0).abs() < 1e-9);
        assert_eq!(averages[1].class_id, 20);
        assert!((averages[1].avg - 61.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_learner_gets_empty_list() {
        let records = vec![record(1, 10, 80.0, 90.0, 100.0)];
        assert!(learner_class_averages(&records, 99).is_empty());
    }

    #[test]
    fn classes_without_scores_are_skipped() {
        let records = vec![
            record(1, 10, 80.0, 90.0, 100.0),
            GradeRecord {
                learner_id: 1,
                class_id: 20,
                scores: Vec::new(),
            },
        ];
        let averages = learner_class_averages(&records, 1);
        assert_eq!(averages.len(), 1);
        assert_eq!(averages[0].class_id, 10);
    }

    #[test]
    fn global_stats_count_learners_above_fifty() {
        let records = vec![
            uniform(1, 10, 40.0),
            uniform(2, 10, 60.0),
            uniform(3, 20, 80.0),
        ];

        let stats = global_stats(&records).unwrap();
        assert_eq!(stats.total_learners, 3);
        assert_eq!(stats.learners_above_threshold, 2);
        assert!((stats.percentage_above_threshold - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn global_stats_merge_classes_per_learner() {
        let records = vec![uniform(1, 10, 30.0), uniform(1, 20, 90.0)];
        let stats = global_stats(&records).unwrap();
        assert_eq!(stats.total_learners, 1);
        assert_eq!(stats.learners_above_threshold, 1);
    }

    #[test]
    fn threshold_is_strict() {
        let records = vec![uniform(1, 10, 50.0), uniform(2, 10, 70.0)];
        let global = global_stats(&records).unwrap();
        assert_eq!(global.learners_above_threshold, 1);

        let class = class_stats(&records, 10).unwrap();
        assert_eq!(class.learners_above70, 0);
    }

    #[test]
    fn class_stats_use_seventy_not_fifty() {
        let records = vec![
            uniform(1, 10, 60.0),
            uniform(2, 10, 75.0),
            uniform(3, 10, 90.0),
            uniform(4, 20, 10.0),
        ];

        let class = class_stats(&records, 10).unwrap();
        assert_eq!(class.class_id, 10);
        assert_eq!(class.total_learners, 3);
        assert_eq!(class.learners_above70, 2);

        let global = global_stats(&records).unwrap();
        assert_eq!(global.total_learners, 4);
        assert_eq!(global.learners_above_threshold, 3);
    }

    #[test]
    fn empty_scopes_are_not_found() {
        assert!(matches!(global_stats(&[]), Err(GradeError::NotFound(_))));

        let records = vec![uniform(1, 10, 60.0)];
        assert!(matches!(
            class_stats(&records, 30),
            Err(GradeError::NotFound(_))
        ));

        let no_scores = vec![GradeRecord {
            learner_id: 1,
            class_id: 10,
            scores: Vec::new(),
        }];
        assert!(matches!(global_stats(&no_scores), Err(GradeError::NotFound(_))));
    }

    #[test]
    fn repeated_queries_are_identical() {
        let records = vec![
            record(3, 10, 71.5, 64.25, 88.0),
            record(1, 20, 55.0, 92.0, 13.0),
            record(2, 10, 99.0, 47.0, 66.6),
        ];

        let first = global_stats(&records).unwrap();
        let second = global_stats(&records).unwrap();
        assert_eq!(
            first.percentage_above_threshold.to_bits(),
            second.percentage_above_threshold.to_bits()
        );
        assert_eq!(learner_averages(&records), learner_averages(&records));
        assert_eq!(class_stats(&records, 10).unwrap(), class_stats(&records, 10).unwrap());
    }
}
