//! In-page JavaScript.

use serde_json::Value;
use tracing::trace;

use crate::error::{Error, Result};
use crate::protocol::{Command, ScriptCommand};

use super::Tab;

impl Tab {
    /// Runs `body` as a function body in the page and returns what it
    /// `return`s, or `Null`.
    ///
    /// # Errors
    ///
    /// An exception thrown by the script becomes [`Error::ScriptError`].
    pub async fn execute_script(&self, body: &str) -> Result<Value> {
        trace!(tab_id = %self.id, len = body.len(), "script.evaluate");

        let reply = self
            .send_command(Command::Script(ScriptCommand::Evaluate {
                script: body.to_owned(),
                args: Vec::new(),
            }))
            .await?
            .into_result();

        match reply {
            Ok(mut result) => Ok(result
                .get_mut("value")
                .map(Value::take)
                .unwrap_or(Value::Null)),
            Err(Error::Protocol { message }) => Err(Error::script_error(message)),
            Err(e) => Err(e),
        }
    }
}

/// `s` as a JavaScript string literal.
pub(crate) fn js_literal(s: &str) -> String {
    Value::from(s).to_string()
}
