use std::fmt::Debug;

use derive_more::{AsRef, Display, From};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

#[derive(Debug, TypedBuilder, Serialize, Deserialize)]
pub struct Credentials {
    pub username: Username,
    pub password: Password,
}

#[derive(Clone, Debug, From, AsRef, Display, Serialize, Deserialize)]
#[as_ref(forward)]
pub struct Username(String);

#[derive(Clone, From, AsRef, Serialize, Deserialize)]
#[as_ref(forward)]
pub struct Password(String);

// Keep the password out of logs.
impl Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(..)")
    }
}
