//! Operator identity and role-based authorization.
//!
//! Every mutating operation takes an explicit [`OperatorContext`] supplied by
//! the identity collaborator; nothing reads the acting operator from ambient
//! state. Authorization is binary per operation class: order and chat
//! mutations require admin or staff, user-management mutations admin only.

use common::OperatorId;
use serde::{Deserialize, Serialize};

/// Role assigned to a user by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
    Customer,
}

impl Role {
    /// True for roles allowed to advance/cancel orders and operate the
    /// admin side of conversations.
    pub fn can_manage_orders(&self) -> bool {
        matches!(self, Role::Admin | Role::Staff)
    }

    /// True for roles allowed to change user roles or delete users.
    pub fn can_manage_users(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Returns the wire-form role name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Customer => "customer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "staff" => Ok(Role::Staff),
            "customer" => Ok(Role::Customer),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// The acting operator, passed explicitly into every orchestrator call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorContext {
    pub operator_id: OperatorId,
    pub role: Role,
}

impl OperatorContext {
    /// Creates an operator context.
    pub fn new(operator_id: OperatorId, role: Role) -> Self {
        Self { operator_id, role }
    }
}
