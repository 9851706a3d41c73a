//! User model and related types.
//!
//! This module defines the User struct and Role enum for representing
//! employees of the company. Users are provisioned by the identity provider;
//! this crate only reads them, apart from seeding.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Represents the access role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Company administrator.
    Admin,
    /// Project or department manager; approves expenses.
    Manager,
    /// Regular employee.
    Employee,
}

impl Role {
    /// Returns the stored representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::Employee => "EMPLOYEE",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "MANAGER" => Ok(Role::Manager),
            "EMPLOYEE" => Ok(Role::Employee),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Represents an employee of the company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier for the user.
    pub id: Uuid,
    /// Corporate email address.
    pub email: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Access role.
    pub role: Role,
    /// Job title, if known.
    pub position: Option<String>,
    /// Department, if known.
    pub department: Option<String>,
    /// Employee id in the accounting system.
    ///
    /// Required before payroll or expense approval can reach the
    /// accounting connector.
    #[serde(rename = "qbEmployeeId")]
    pub accounting_employee_ref: Option<String>,
}

impl User {
    /// Returns the external employee reference if the user is linked.
    ///
    /// Blank references are treated as unlinked.
    ///
    /// # Examples
    ///
    /// ```
    /// use backoffice_engine::models::{Role, User};
    /// use uuid::Uuid;
    ///
    /// let user = User {
    ///     id: Uuid::new_v4(),
    ///     email: "employee1@company.com".to_string(),
    ///     first_name: "Employee".to_string(),
    ///     last_name: "1".to_string(),
    ///     role: Role::Employee,
    ///     position: None,
    ///     department: None,
    ///     accounting_employee_ref: Some("QB-EMP-003".to_string()),
    /// };
    /// assert_eq!(user.linked_employee_ref(), Some("QB-EMP-003"));
    /// ```
    pub fn linked_employee_ref(&self) -> Option<&str> {
        self.accounting_employee_ref
            .as_deref()
            .filter(|reference| !reference.trim().is_empty())
    }

    /// Returns the summary embedded in expense and payroll responses.
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
        }
    }
}

/// The subset of user fields included alongside other records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    /// Unique identifier for the user.
    pub id: Uuid,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Corporate email address.
    pub email: String,
}
