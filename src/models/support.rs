use crate::models::claim::lenient_f64;
use serde::{Deserialize, Serialize};

/// One of our supports from `support_list`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SupportItem {
    pub claim_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: Option<f64>,
    #[serde(default)]
    pub is_spent: bool,
    #[serde(default)]
    pub txid: Option<String>,
}

impl SupportItem {
    pub fn amount(&self) -> f64 {
        self.amount.unwrap_or(0.0)
    }

    pub fn is_channel(&self) -> bool {
        self.name.starts_with('@')
    }
}

/// Wallet transaction returned by `support_create` and `support_abandon`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Transaction {
    #[serde(default)]
    pub txid: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_input: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_output: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_fee: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transaction_string_amounts() {
        let tx: Transaction = serde_json::from_value(json!({
            "txid": "beef",
            "total_input": "1.5",
            "total_output": "1.4",
            "total_fee": "0.0001"
        }))
        .unwrap();

        assert_eq!(tx.total_input, Some(1.5));
        assert_eq!(tx.total_fee, Some(0.0001));
    }

    #[test]
    fn test_support_kind() {
        let s: SupportItem =
            serde_json::from_value(json!({"claim_id": "c", "name": "@chan", "amount": "2.0"}))
                .unwrap();
        assert!(s.is_channel());
        assert_eq!(s.amount(), 2.0);
    }
}
