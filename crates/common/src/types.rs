use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a transparent UUID newtype with the standard conversions.
macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id! {
    /// The stable unique key of a party.
    ///
    /// Two `Party` values are the same participant exactly when their keys
    /// are equal; display names carry no identity.
    PartyKey
}

uuid_id! {
    /// Unique identifier for a ledger record (loan or item).
    RecordId
}

uuid_id! {
    /// Identifier assigned by the notary when a transaction commits.
    TransactionId
}

uuid_id! {
    /// Identifier for a single issuance flow instance.
    FlowId
}

uuid_id! {
    /// Identifier for a notary service.
    NotaryId
}

/// A participant in the ledger.
///
/// Equality and hashing go through the key only: two `Party` values with the
/// same key are the same participant even if their display names differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Party {
    key: PartyKey,
    name: String,
}

impl Party {
    /// Creates a party with a fresh key.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            key: PartyKey::new(),
            name: name.into(),
        }
    }

    /// Creates a party with an existing key.
    pub fn with_key(key: PartyKey, name: impl Into<String>) -> Self {
        Self {
            key,
            name: name.into(),
        }
    }

    /// Returns the party's stable unique key.
    pub fn key(&self) -> PartyKey {
        self.key
    }

    /// Returns the party's display name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Party {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Party {}

impl std::hash::Hash for Party {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl std::fmt::Display for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn party_keys_are_unique() {
        let a = Party::new("PartyA");
        let b = Party::new("PartyB");
        assert_ne!(a.key(), b.key());
        assert_ne!(a, b);
    }

    #[test]
    fn party_equality_is_by_key_not_name() {
        let key = PartyKey::new();
        let a = Party::with_key(key, "Alice");
        let b = Party::with_key(key, "Alice (renamed)");
        assert_eq!(a, b);

        let c = Party::new("Alice");
        assert_ne!(a, c);
    }

    #[test]
    fn party_key_from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        let key = PartyKey::from_uuid(uuid);
        assert_eq!(key.as_uuid(), uuid);
    }

    #[test]
    fn party_serialization_roundtrip() {
        let party = Party::new("Bank of Narnia");
        let json = serde_json::to_string(&party).unwrap();
        let deserialized: Party = serde_json::from_str(&json).unwrap();
        assert_eq!(party, deserialized);
        assert_eq!(party.name(), deserialized.name());
    }

    #[test]
    fn transaction_ids_are_unique() {
        assert_ne!(TransactionId::new(), TransactionId::new());
        assert_ne!(RecordId::new(), RecordId::new());
        assert_ne!(FlowId::new(), FlowId::new());
    }
}
