//! Sea-ORM entities for keyfold-auth

pub mod accounts;
pub mod credentials;

pub use accounts::Entity as Accounts;
pub use credentials::Entity as Credentials;
