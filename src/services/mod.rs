pub mod accounts;
pub mod github;
pub mod merkle;
pub mod session;
pub mod signature;
