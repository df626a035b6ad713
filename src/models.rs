use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreType {
    Quiz,
    Exam,
    Homework,
}

impl ScoreType {
    /// Share of the weighted average carried by this category.
    pub fn weight(self) -> f64 {
        match self {
            ScoreType::Exam => 0.5,
            ScoreType::Quiz => 0.3,
            ScoreType::Homework => 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    #[serde(rename = "type")]
    pub score_type: ScoreType,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradeRecord {
    pub learner_id: i32,
    pub class_id: i32,
    pub scores: Vec<ScoreEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LearnerAverage {
    pub learner_id: i32,
    pub weighted_average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassAverage {
    pub class_id: i32,
    pub avg: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateStats {
    pub total_learners: usize,
    pub learners_above_threshold: usize,
    pub percentage_above_threshold: f64,
}

/// Wire shape of the global stats query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    pub total_learners: usize,
    pub learners_above50: usize,
    pub percentage_above50: f64,
}

/// Wire shape of the per-class stats query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassStats {
    pub class_id: i32,
    #[serde(rename = "totalLearners")]
    pub total_learners: usize,
    #[serde(rename = "learnersAbove70")]
    pub learners_above70: usize,
    #[serde(rename = "percentageAbove70")]
    pub percentage_above70: f64,
}

impl From<AggregateStats> for GlobalStats {
    fn from(stats: AggregateStats) -> Self {
        Self {
            total_learners: stats.total_learners,
            learners_above50: stats.learners_above_threshold,
            percentage_above50: stats.percentage_above_threshold,
        }
    }
}

impl ClassStats {
    pub fn new(class_id: i32, stats: AggregateStats) -> Self {
        Self {
            class_id,
            total_learners: stats.total_learners,
            learners_above70: stats.learners_above_threshold,
            percentage_above70: stats.percentage_above_threshold,
        }
    }
}
