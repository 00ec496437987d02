//! Domain model for a single billing-period debt record.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Due {
    pub id: String,
    pub account_id: String,
    pub apartment_id: String,
    /// Originally accrued amount in USD
    pub amount_usd: f64,
    /// Unpaid remainder; invariant 0 <= remaining <= amount
    pub remaining_debt_usd: f64,
    pub month: u32,
    pub year: i32,
    pub accrual_date: DateTime<Utc>,
    /// USD -> display rate at accrual time
    pub rate: f64,
    pub is_paid: bool,
    pub paid_amount_usd: f64,
    pub payment_date: Option<DateTime<Utc>>,
    pub payment_rate: Option<f64>,
    pub payment_amount_display: Option<f64>,
}

/// Human-readable billing period, e.g. "March 2026".
pub fn period_label(month: u32, year: i32) -> String {
    const MONTHS: [&str; 12] = [
        "January", "February", "March", "April", "May", "June", "July", "August", "September",
        "October", "November", "December",
    ];
    let name = MONTHS
        .get(month.saturating_sub(1) as usize)
        .copied()
        .unwrap_or("Unknown");
    format!("{} {}", name, year)
}

/// Payment metadata stamped onto a due when it is settled.
#[derive(Debug, Clone, PartialEq)]
pub struct DuePayment {
    pub amount_usd: f64,
    pub amount_display: f64,
    pub date: DateTime<Utc>,
    pub rate: f64,
}

impl Due {
    pub fn generate_id() -> String {
        format!("due-{}", uuid::Uuid::new_v4())
    }

    /// A due counts as outstanding only while it still carries a balance.
    pub fn is_outstanding(&self) -> bool {
        !self.is_paid && self.remaining_debt_usd > 0.0
    }

    /// Human-readable billing period, e.g. "March 2026".
    pub fn period_label(&self) -> String {
        period_label(self.month, self.year)
    }

    pub fn to_dto(&self) -> shared::Due {
        shared::Due {
            id: self.id.clone(),
            apartment_id: self.apartment_id.clone(),
            amount_usd: self.amount_usd,
            remaining_debt_usd: self.remaining_debt_usd,
            month: self.month,
            year: self.year,
            accrual_date: self.accrual_date.to_rfc3339(),
            rate: self.rate,
            is_paid: self.is_paid,
            paid_amount_usd: self.paid_amount_usd,
            payment_date: self.payment_date.map(|d| d.to_rfc3339()),
            payment_rate: self.payment_rate,
            payment_amount_display: self.payment_amount_display,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_due() -> Due {
        Due {
            id: Due::generate_id(),
            account_id: "acct".to_string(),
            apartment_id: "apt-1".to_string(),
            amount_usd: 31.25,
            remaining_debt_usd: 31.25,
            month: 3,
            year: 2026,
            accrual_date: Utc::now(),
            rate: 32.0,
            is_paid: false,
            paid_amount_usd: 0.0,
            payment_date: None,
            payment_rate: None,
            payment_amount_display: None,
        }
    }

    #[test]
    fn outstanding_until_settled() {
        let mut due = sample_due();
        assert!(due.is_outstanding());

        due.remaining_debt_usd = 0.0;
        due.is_paid = true;
        assert!(!due.is_outstanding());
    }

    #[test]
    fn settled_but_unflagged_due_with_zero_balance_is_not_outstanding() {
        let mut due = sample_due();
        due.remaining_debt_usd = 0.0;
        assert!(!due.is_outstanding());
    }

    #[test]
    fn period_label_formats_month_name() {
        let due = sample_due();
        assert_eq!(due.period_label(), "March 2026");
    }
}
