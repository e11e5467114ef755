pub mod config;
pub mod keystone;
pub mod logs;
pub mod types;

pub use keystone::{get_token, TokenError};
pub use types::token::Token;
