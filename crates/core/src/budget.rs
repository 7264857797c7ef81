use crate::error::IngestError;
use crate::models::ExpansionBudget;

#[derive(Debug, Clone, Default)]
pub struct ExpansionMeter {
    budget: ExpansionBudget,
    files: usize,
    bytes: u64,
}

impl ExpansionMeter {
    pub fn new(budget: ExpansionBudget) -> Self {
        Self {
            budget,
            files: 0,
            bytes: 0,
        }
    }

    pub fn budget(&self) -> &ExpansionBudget {
        &self.budget
    }

    pub fn files(&self) -> usize {
        self.files
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn check_depth(&self, depth: usize) -> Result<(), IngestError> {
        if depth > self.budget.max_depth {
            return Err(IngestError::BudgetExceeded(format!(
                "archive nesting depth {depth} exceeds {}",
                self.budget.max_depth
            )));
        }
        Ok(())
    }

    pub fn admit_file(&mut self) -> Result<(), IngestError> {
        if self.files >= self.budget.max_extracted_files {
            return Err(IngestError::BudgetExceeded(format!(
                "more than {} extracted files",
                self.budget.max_extracted_files
            )));
        }
        self.files += 1;
        Ok(())
    }

    pub fn entry_read_limit(&self) -> u64 {
        let remaining = self.budget.max_extracted_bytes.saturating_sub(self.bytes);
        remaining.min(self.budget.max_entry_bytes)
    }

    pub fn charge_bytes(&mut self, len: u64) -> Result<(), IngestError> {
        let total = self.bytes.saturating_add(len);
        if total > self.budget.max_extracted_bytes {
            return Err(IngestError::BudgetExceeded(format!(
                "more than {} extracted bytes",
                self.budget.max_extracted_bytes
            )));
        }
        self.bytes = total;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_budget() -> ExpansionBudget {
        ExpansionBudget {
            max_depth: 2,
            max_extracted_files: 2,
            max_extracted_bytes: 100,
            max_entry_bytes: 60,
        }
    }

    #[test]
    fn depth_limit_is_inclusive() {
        let meter = ExpansionMeter::new(small_budget());
        assert!(meter.check_depth(2).is_ok());
        assert!(matches!(
            meter.check_depth(3),
            Err(IngestError::BudgetExceeded(_))
        ));
    }

    #[test]
    fn file_count_is_enforced() {
        let mut meter = ExpansionMeter::new(small_budget());
        assert!(meter.admit_file().is_ok());
        assert!(meter.admit_file().is_ok());
        assert!(meter.admit_file().is_err());
        assert_eq!(meter.files(), 2);
    }

    #[test]
    fn read_limit_shrinks_with_usage() -> Result<(), IngestError> {
        let mut meter = ExpansionMeter::new(small_budget());
        assert_eq!(meter.entry_read_limit(), 60);

        meter.charge_bytes(70)?;
        assert_eq!(meter.entry_read_limit(), 30);
        assert!(meter.charge_bytes(31).is_err());
        assert_eq!(meter.bytes(), 70);
        Ok(())
    }
}
