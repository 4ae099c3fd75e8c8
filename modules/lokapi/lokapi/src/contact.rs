use serde::Serialize;
use serde_json::Value;

/// Odoo partner as returned by `/partner/<id>` or the login prefetch.
///
/// `raw` keeps the full payload; backends read their own entries from it
/// (Cyclos uses `monujo_backends`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contact {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub raw: Value,
}

impl Contact {
    #[must_use]
    pub fn from_partner(raw: Value) -> Self {
        Self {
            id: raw.get("id").and_then(Value::as_i64),
            name: raw.get("name").and_then(Value::as_str).map(str::to_owned),
            raw,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fields_are_lifted_from_payload() {
        let c = Contact::from_partner(json!({"id": 7, "name": "Alice", "email": "a@x.org"}));
        assert_eq!(c.id, Some(7));
        assert_eq!(c.name.as_deref(), Some("Alice"));
        assert_eq!(c.raw["email"], "a@x.org");
    }

    #[test]
    fn missing_fields_are_tolerated() {
        let c = Contact::from_partner(json!({}));
        assert!(c.id.is_none());
        assert!(c.name.is_none());
    }
}
