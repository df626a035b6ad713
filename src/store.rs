use async_trait::async_trait;

use crate::error::GradeError;
use crate::models::GradeRecord;

/// Read access to grade records, keyed by learner and class.
#[async_trait]
pub trait GradeStore: Send + Sync {
    async fn records_for_learner(&self, learner_id: i32) -> Result<Vec<GradeRecord>, GradeError>;

    async fn records_for_class(&self, class_id: i32) -> Result<Vec<GradeRecord>, GradeError>;

    async fn all_records(&self) -> Result<Vec<GradeRecord>, GradeError>;
}

/// Grade records held in memory.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryGradeStore {
    records: Vec<GradeRecord>,
}

#[cfg(test)]
impl MemoryGradeStore {
    pub fn new(records: Vec<GradeRecord>) -> Self {
        Self { records }
    }

    fn matching(&self, predicate: impl Fn(&GradeRecord) -> bool) -> Vec<GradeRecord> {
        self.records
            .iter()
            .filter(|record| predicate(record))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[async_trait]
impl GradeStore for MemoryGradeStore {
    async fn records_for_learner(&self, learner_id: i32) -> Result<Vec<GradeRecord>, GradeError> {
        Ok(self.matching(|record| record.learner_id == learner_id))
    }

    async fn records_for_class(&self, class_id: i32) -> Result<Vec<GradeRecord>, GradeError> {
        Ok(self.matching(|record| record.class_id == class_id))
    }

    async fn all_records(&self) -> Result<Vec<GradeRecord>, GradeError> {
        Ok(self.records.clone())
    }
}
