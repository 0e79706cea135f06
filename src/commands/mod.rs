/*!
Command handlers for the CLI

One module per subcommand:

- `target`         -- set or show the active identity provider
- `context`        -- show the active auth context
- `info`           -- show `/info`
- `implicit_token` -- obtain a token through the implicit grant
- `token_keys`     -- show signing keys
- `userinfo`       -- show `/userinfo` for the active context

Handlers receive the loaded [`Config`](crate::config::Config) explicitly and
print JSON documents on stdout; status lines go through `colored`.
*/

use serde::Serialize;

use crate::error::{Result, UaaError};

pub mod context;
pub mod implicit_token;
pub mod info;
pub mod target;
pub mod token_keys;
pub mod userinfo;

/// Serialize a value into pretty JSON.
fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| UaaError::Serialization(e).into())
}

/// Print a value as pretty JSON on stdout.
fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", to_pretty_json(value)?);
    Ok(())
}
