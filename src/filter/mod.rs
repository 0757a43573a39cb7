pub mod classify;
pub mod registry;
pub mod validator;
