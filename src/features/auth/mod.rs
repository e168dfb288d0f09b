mod validator;

pub mod guards;
pub mod model;

pub use validator::JwtValidator;

#[cfg(test)]
pub(crate) use validator::test_tokens;
