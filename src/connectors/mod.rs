//! Connectors to the external services the back office depends on.
//!
//! Connectors are synchronous: they are called from blocking tasks, inside
//! store transactions, so a failed call can roll back local writes.

pub mod accounting;
pub mod groupware;

pub use accounting::{
    AccountingConnector, AccountingExpenseEntry, AccountingTokens, HttpAccountingConnector,
    RealmCredentials, SandboxAccountingConnector,
};
pub use groupware::{DisabledGroupwareConnector, GraphGroupwareConnector, GroupwareConnector};
