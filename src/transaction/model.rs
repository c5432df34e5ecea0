//! Transaction record as exchanged with the cache and the commit webhook.

use serde::{Deserialize, Deserializer, Serialize};

use super::taxonomy::Category;
use crate::error::TriageError;

/// A string-or-number field, kept exactly as the source sent it.
///
/// Bank and UPI references, amounts and even dates arrive as either JSON
/// type depending on the upstream parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(serde_json::Number),
    Text(String),
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value)
            .map(Self::Number)
            .unwrap_or_else(|| Self::Text(value.to_string()))
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl PartialEq<&str> for Scalar {
    fn eq(&self, other: &&str) -> bool {
        match self {
            Self::Text(s) => s == other,
            Self::Number(n) => n.to_string() == *other,
        }
    }
}

/// Accept a string or a number as a `String` key.
fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Scalar::deserialize(deserializer).map(|s| match s {
        Scalar::Text(text) => text,
        Scalar::Number(n) => n.to_string(),
    })
}

/// A pending transaction.
///
/// Categorization fields are private: they can only be filled through
/// [`Transaction::categorize`], which sets category and subcategory together
/// and remarks only alongside them. Fields the source sends that this type
/// does not model are kept in `extra` so rewriting the cache loses nothing.
/// A numeric `uuid` is read as its decimal string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(deserialize_with = "scalar_string")]
    pub uuid: String,
    pub reference: Scalar,
    pub date: Scalar,
    pub time: Scalar,
    pub amount: Scalar,
    pub recipient: Scalar,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subcategory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    remarks: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Transaction {
    /// Create an uncategorized transaction.
    pub fn new(
        uuid: impl Into<String>,
        reference: impl Into<Scalar>,
        date: impl Into<Scalar>,
        time: impl Into<Scalar>,
        amount: impl Into<Scalar>,
        recipient: impl Into<Scalar>,
    ) -> Self {
        Self {
            uuid: uuid.into(),
            reference: reference.into(),
            date: date.into(),
            time: time.into(),
            amount: amount.into(),
            recipient: recipient.into(),
            category: None,
            subcategory: None,
            remarks: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }

    pub fn subcategory(&self) -> Option<&str> {
        self.subcategory.as_deref()
    }

    pub fn remarks(&self) -> Option<&str> {
        self.remarks.as_deref()
    }

    /// Whether category and subcategory are both set.
    pub fn is_committable(&self) -> bool {
        self.category.is_some() && self.subcategory.is_some()
    }

    /// Fill in the categorization in one step.
    ///
    /// `subcategory` must belong to `category`; `remarks`, when given, must
    /// contain something other than whitespace.
    pub fn categorize(
        &mut self,
        category: Category,
        subcategory: &str,
        remarks: Option<String>,
    ) -> Result<(), TriageError> {
        let subcategory =
            category
                .subcategory(subcategory)
                .ok_or_else(|| TriageError::UnknownSubcategory {
                    category: category.to_string(),
                    subcategory: subcategory.to_string(),
                })?;

        if remarks.as_deref().is_some_and(|r| r.trim().is_empty()) {
            return Err(TriageError::EmptyRemark);
        }

        self.category = Some(category);
        self.subcategory = Some(subcategory.to_string());
        self.remarks = remarks;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transaction {
        Transaction::new("u-1", "REF001", "2024-05-01", "12:30", 250.0, "Cafe")
    }

    #[test]
    fn uncategorized_serializes_without_categorization_keys() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("category").is_none());
        assert!(json.get("subcategory").is_none());
        assert!(json.get("remarks").is_none());
        assert_eq!(json["reference"], "REF001");
    }

    #[test]
    fn categorize_sets_fields_together() {
        let mut txn = sample();
        assert!(!txn.is_committable());
        txn.categorize(Category::Food, "Lunch", None).unwrap();
        assert!(txn.is_committable());

        let json = serde_json::to_value(&txn).unwrap();
        assert_eq!(json["category"], "Food");
        assert_eq!(json["subcategory"], "Lunch");
        assert!(json.get("remarks").is_none());
    }

    #[test]
    fn categorize_rejects_foreign_subcategory() {
        let mut txn = sample();
        let err = txn.categorize(Category::Food, "Gadgets", None).unwrap_err();
        assert!(matches!(err, TriageError::UnknownSubcategory { .. }));
        assert_eq!(txn.category(), None);
        assert_eq!(txn.subcategory(), None);
    }

    #[test]
    fn categorize_rejects_blank_remarks() {
        let mut txn = sample();
        let err = txn
            .categorize(Category::Shopping, "Gadgets", Some("  ".into()))
            .unwrap_err();
        assert_eq!(err, TriageError::EmptyRemark);
        assert_eq!(txn.category(), None);
    }

    #[test]
    fn unknown_source_fields_survive_roundtrip() {
        let raw = serde_json::json!({
            "uuid": "u-2",
            "reference": "REF002",
            "date": "2024-05-02",
            "time": "09:00",
            "amount": "99.50",
            "recipient": "Metro",
            "account": "savings",
        });
        let txn: Transaction = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(txn.amount, Scalar::Text("99.50".into()));
        assert_eq!(txn.extra["account"], "savings");
        assert_eq!(serde_json::to_value(&txn).unwrap(), raw);
    }

    #[test]
    fn numeric_amount_renders_verbatim() {
        let txn: Transaction = serde_json::from_value(serde_json::json!({
            "uuid": "u-3",
            "reference": "R",
            "date": "d",
            "time": "t",
            "amount": 120,
            "recipient": "x",
        }))
        .unwrap();
        assert_eq!(txn.amount.to_string(), "120");
    }

    #[test]
    fn numeric_reference_and_uuid_are_accepted() {
        let raw = serde_json::json!({
            "uuid": 9001,
            "reference": 412345678901u64,
            "date": "2024-06-01",
            "time": "13:05",
            "amount": 240,
            "recipient": "Dosa Corner",
        });
        let txn: Transaction = serde_json::from_value(raw).unwrap();
        assert_eq!(txn.uuid, "9001");
        assert_eq!(txn.reference.to_string(), "412345678901");

        // The reference is written back as the number it came in as.
        let json = serde_json::to_value(&txn).unwrap();
        assert_eq!(json["reference"], 412345678901u64);
    }

    #[test]
    fn non_scalar_reference_is_rejected() {
        let raw = serde_json::json!({
            "uuid": "u-4",
            "reference": {"id": 1},
            "date": "d",
            "time": "t",
            "amount": 1,
            "recipient": "x",
        });
        assert!(serde_json::from_value::<Transaction>(raw).is_err());
    }
}
