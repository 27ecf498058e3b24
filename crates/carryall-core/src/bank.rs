use serde::{Deserialize, Serialize};

/// Running currency balance credited by stations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyBank {
    balance: i64,
}

impl MoneyBank {
    pub fn new(balance: i64) -> Self {
        Self { balance }
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    /// Add `amount` (may be negative) and return the new balance.
    pub fn add(&mut self, amount: i64) -> i64 {
        self.balance = self.balance.saturating_add(amount);
        self.balance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_accumulates() {
        let mut bank = MoneyBank::default();
        assert_eq!(bank.add(10), 10);
        assert_eq!(bank.add(-3), 7);
        assert_eq!(bank.balance(), 7);
    }

    #[test]
    fn add_saturates() {
        let mut bank = MoneyBank::new(i64::MAX - 1);
        assert_eq!(bank.add(10), i64::MAX);
    }
}
