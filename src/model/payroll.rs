use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Lifecycle of a payroll line. `Paid` is terminal; there is no transition
/// back to `Pending`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PayStatus {
    Pending,
    Paid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pay_status_round_trips_through_strings() {
        assert_eq!(PayStatus::Pending.to_string(), "pending");
        assert_eq!(PayStatus::Paid.to_string(), "paid");
        assert_eq!("paid".parse::<PayStatus>().unwrap(), PayStatus::Paid);
        assert!("settled".parse::<PayStatus>().is_err());
    }
}
