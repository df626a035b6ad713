use std::collections::BTreeSet;
use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::grading::{self, CLASS_THRESHOLD, GLOBAL_THRESHOLD};
use crate::models::{ClassStats, GradeRecord, LearnerAverage};

/// Stats for every class that has at least one scored learner, by class id.
pub fn stats_by_class(records: &[GradeRecord]) -> Vec<ClassStats> {
    let class_ids: BTreeSet<i32> = records.iter().map(|record| record.class_id).collect();

    class_ids
        .into_iter()
        .filter_map(|class_id| grading::class_stats(records, class_id).ok())
        .collect()
}

/// Learners with the lowest weighted averages first.
pub fn lowest_averages(records: &[GradeRecord], limit: usize) -> Vec<LearnerAverage> {
    let mut averages = grading::learner_averages(records);
    averages.sort_by(|a, b| {
        a.weighted_average
            .total_cmp(&b.weighted_average)
            .then(a.learner_id.cmp(&b.learner_id))
    });
    averages.truncate(limit);
    averages
}

pub fn build_report(generated_at: DateTime<Utc>, records: &[GradeRecord]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Learner Grade Report");
    let _ = writeln!(
        output,
        "Generated {} from {} grade records",
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        records.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overall");

    match grading::global_stats(records) {
        Ok(stats) => {
            let _ = writeln!(
                output,
                "- {} of {} learners above {} ({:.1}%)",
                stats.learners_above_threshold,
                stats.total_learners,
                GLOBAL_THRESHOLD,
                stats.percentage_above_threshold
            );
        }
        Err(_) => {
            let _ = writeln!(output, "No scored learners recorded.");
        }
    }

    let classes = stats_by_class(records);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Classes (pass mark {})", CLASS_THRESHOLD);

    if classes.is_empty() {
        let _ = writeln!(output, "No classes with scores.");
    } else {
        for class in classes.iter() {
            let _ = writeln!(
                output,
                "- Class {}: {} of {} learners above {} ({:.1}%)",
                class.class_id,
                class.learners_above70,
                class.total_learners,
                CLASS_THRESHOLD,
                class.percentage_above70
            );
        }
    }

    let lowest = lowest_averages(records, 5);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Lowest Weighted Averages");

    if lowest.is_empty() {
        let _ = writeln!(output, "No scored learners recorded.");
    } else {
        for learner in lowest.iter() {
            let _ = writeln!(
                output,
                "- Learner {}: {:.2}",
                learner.learner_id, learner.weighted_average
            );
        }
    }

    output
}
