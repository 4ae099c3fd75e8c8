pub mod backend;
pub mod user_account;

pub use backend::{CyclosBackend, KIND};
pub use user_account::{AUTH_HEADER, CyclosUserAccount, token_key};
