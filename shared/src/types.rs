//! Common identity types

use serde::{Deserialize, Serialize};

/// Role of an authenticated user, as carried in the `X-User-Type` header.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Buyer,
    Seller,
    Admin,
    SuperAdmin,
}

impl UserType {
    /// Whether this role carries marketplace-wide administrative authority.
    pub fn is_admin(&self) -> bool {
        matches!(self, UserType::Admin | UserType::SuperAdmin)
    }

    /// Wire form used in headers and storage keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Buyer => "buyer",
            UserType::Seller => "seller",
            UserType::Admin => "admin",
            UserType::SuperAdmin => "super_admin",
        }
    }

    /// Parse the wire form. Unknown values are rejected.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "buyer" => Some(UserType::Buyer),
            "seller" => Some(UserType::Seller),
            "admin" => Some(UserType::Admin),
            "super_admin" => Some(UserType::SuperAdmin),
            _ => None,
        }
    }
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user reference: id plus role.
///
/// Notifications are keyed by the pair, not the id alone, because buyer
/// and seller id spaces are independent in the source system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct UserRef {
    pub user_id: String,
    pub user_type: UserType,
}

impl UserRef {
    pub fn new(user_id: impl Into<String>, user_type: UserType) -> Self {
        Self {
            user_id: user_id.into(),
            user_type,
        }
    }

    /// Composite storage key, e.g. `buyer:b-123`.
    pub fn storage_key(&self) -> String {
        format!("{}:{}", self.user_type.as_str(), self.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_roundtrip() {
        for t in [
            UserType::Buyer,
            UserType::Seller,
            UserType::Admin,
            UserType::SuperAdmin,
        ] {
            assert_eq!(UserType::parse(t.as_str()), Some(t));
        }
        assert_eq!(UserType::parse("root"), None);
    }

    #[test]
    fn admin_roles() {
        assert!(UserType::Admin.is_admin());
        assert!(UserType::SuperAdmin.is_admin());
        assert!(!UserType::Seller.is_admin());
        assert!(!UserType::Buyer.is_admin());
    }
}
