use serde_json::Value;

use crate::domain::models::TestConfig;

/// Locates the numeric balance inside a probe response
///
/// A JSON pointer, when set, is authoritative. Otherwise the field names are
/// tried in order at the top level. Numbers and numeric strings are accepted.
///
/// # Example
/// ```
/// use raceprobe::infrastructure::http::BalanceExtractor;
/// use serde_json::json;
///
/// let by_field = BalanceExtractor::from_fields(["balance"]);
/// assert_eq!(by_field.extract(&json!({"balance": "1000.50"})), Some(1000.5));
///
/// let by_pointer = BalanceExtractor::from_pointer("/account/available");
/// assert_eq!(by_pointer.extract(&json!({"account": {"available": 7}})), Some(7.0));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceExtractor {
    pointer: Option<String>,
    fields: Vec<String>,
}

impl BalanceExtractor {
    pub fn from_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pointer: None,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_pointer(pointer: impl Into<String>) -> Self {
        Self {
            pointer: Some(pointer.into()),
            fields: Vec::new(),
        }
    }

    pub fn from_config(config: &TestConfig) -> Self {
        Self {
            pointer: config.balance_pointer.clone(),
            fields: config.balance_fields.clone(),
        }
    }

    pub fn extract(&self, body: &Value) -> Option<f64> {
        if let Some(pointer) = &self.pointer {
            return body.pointer(pointer).and_then(as_number);
        }

        self.fields
            .iter()
            .find_map(|field| body.get(field).and_then(as_number))
    }

    /// Human readable description of where the value is looked up
    pub fn describe(&self) -> String {
        self.pointer.as_ref().map_or_else(
            || format!("fields [{}]", self.fields.join(", ")),
            |pointer| format!("pointer {pointer}"),
        )
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_fields_in_order() {
        let extractor = BalanceExtractor::from_config(&TestConfig::default());
        assert_eq!(extractor.extract(&json!({"balance": 1000.0})), Some(1000.0));
        assert_eq!(
            extractor.extract(&json!({"available_balance": 5, "current_balance": 9})),
            Some(5.0)
        );
        assert_eq!(
            extractor.extract(&json!({"amount": 1, "balance": 2})),
            Some(2.0),
            "earlier field names win"
        );
    }

    #[test]
    fn test_skips_non_numeric_fields() {
        let extractor = BalanceExtractor::from_fields(["balance", "amount"]);
        assert_eq!(
            extractor.extract(&json!({"balance": "n/a", "amount": 12.5})),
            Some(12.5)
        );
        assert_eq!(extractor.extract(&json!({"balance": null})), None);
        assert_eq!(extractor.extract(&json!({"balance": "NaN"})), None);
    }

    #[test]
    fn test_pointer_wins_over_fields() {
        let extractor = BalanceExtractor {
            pointer: Some("/data/balance".to_string()),
            fields: vec!["balance".to_string()],
        };
        assert_eq!(
            extractor.extract(&json!({"balance": 1, "data": {"balance": 2}})),
            Some(2.0)
        );
        assert_eq!(extractor.extract(&json!({"balance": 1})), None);
    }

    #[test]
    fn test_non_object_body() {
        let extractor = BalanceExtractor::from_fields(["balance"]);
        assert_eq!(extractor.extract(&json!([1, 2, 3])), None);
        assert_eq!(extractor.extract(&json!(42)), None);
    }
}
