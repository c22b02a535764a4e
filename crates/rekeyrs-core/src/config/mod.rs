// Rekeyrs Config API
// Key expressions and TOML profiles

pub mod key_expr;
pub mod parser;

pub use key_expr::{KeyExprError, KeyExpression, ModifierKey};
pub use parser::{default_profile_content, Config, ConfigError, ConfigToml};
