pub mod constants;
pub mod domain;
pub mod test_helpers;
pub mod types;
pub mod validation;
