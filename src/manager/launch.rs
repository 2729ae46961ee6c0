//! Launch command building for new agent slots
//!
//! Exactly one composed command line is typed into a freshly split pane: a
//! validated environment prefix, the two correlation variables, and either
//! the caller's override verbatim or the normal agent-CLI launch. The
//! bootstrap instruction travels through a file and `"$(cat '…')"` rather
//! than inline text, which sidesteps a whole class of shell-escaping
//! hazards.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{AgentError, Result};
use crate::types::{Agent, CreateAgentParams, SessionId};

use super::{ENV_AGENT_ID, ENV_SESSION_ID};

/// Agent CLI launched when no override is given
const DEFAULT_EXECUTABLE: &str = "claude";

/// Quote a string for safe interpolation into a POSIX shell command line.
///
/// Wraps in single quotes and escapes any embedded single quotes.
pub(crate) fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Reject environment maps containing keys that are not plain identifiers
///
/// Checked before any backend call so a bad key can never reach a shell.
///
/// # Errors
/// Returns [`AgentError::InvalidEnvKey`] for the first offending key.
pub(crate) fn validate_env_keys(env: &HashMap<String, String>) -> Result<()> {
    for key in env.keys() {
        let mut chars = key.chars();
        let head_ok = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if !head_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(AgentError::InvalidEnvKey(key.clone()));
        }
    }
    Ok(())
}

/// The bootstrap instruction handed to an auto-launched agent
///
/// Describes the poll/emit protocol: loop on `wait_for_command` with the
/// caller-held cursor, execute each command, report back to master with
/// `send_message`, and retry on timeout with the same cursor.
pub(crate) fn inception_prompt(agent: &Agent, poll_timeout_ms: u64) -> String {
    let id = agent.id.as_str();
    format!(
        "You are a specialized sub-agent with ID \"{id}\" and Role \"{role}\".\n\
         Your goal is to autonomously process tasks from the orchestrator.\n\
         \n\
         PROTOCOL:\n\
         1. Initialize a variable 'current_cursor' to 0.\n\
         2. Loop indefinitely. CRITICAL: Never exit the loop. Never stop polling.\n\
         3. Inside the loop, call the tool 'wait_for_command' with agent_id=\"{id}\", \
         cursor=current_cursor, timeout_ms={poll_timeout_ms}.\n   \
         NOTE: 'agent_id' here is always YOUR agent ID (\"{id}\"). Do not change it.\n\
         4. If 'wait_for_command' returns a command (status=\"command\"):\n   \
         a. Update your 'current_cursor' to the 'next_cursor' value returned.\n   \
         b. Execute the task described in the command using your capabilities.\n   \
         c. After execution, call the tool 'send_message' with:\n        \
         agent_id=\"{id}\"  (always your own ID — this identifies the sender)\n        \
         message={{ type: \"task_completed\", result: <your result> }}\n        \
         target=\"master\"\n      \
         to report back to the orchestrator.\n\
         5. If it times out (status=\"timeout\"), retry the loop with the same \
         'current_cursor'. CRITICAL: Always keep looping — never terminate.\n\
         \n\
         Start your loop now.",
        role = agent.role,
    )
}

/// Builder for the single command line sent to a new pane
pub(crate) struct LaunchCommand<'a> {
    agent: &'a Agent,
    params: &'a CreateAgentParams,
    session: &'a SessionId,
    inception_path: &'a Path,
}

impl<'a> LaunchCommand<'a> {
    /// Create a new launch command builder
    pub(crate) fn new(
        agent: &'a Agent,
        params: &'a CreateAgentParams,
        session: &'a SessionId,
        inception_path: &'a Path,
    ) -> Self {
        Self {
            agent,
            params,
            session,
            inception_path,
        }
    }

    /// Compose the full command line
    ///
    /// # Errors
    /// Returns [`AgentError::InvalidEnvKey`] if the env map was not
    /// validated upstream and contains a bad key.
    pub(crate) fn build(&self) -> Result<String> {
        let mut prefix = String::new();
        if let Some(env) = &self.params.env {
            validate_env_keys(env)?;
            for (key, value) in env {
                prefix.push_str(key);
                prefix.push('=');
                prefix.push_str(&shell_quote(value));
                prefix.push(' ');
            }
        }

        let cmd = match &self.params.executable_override {
            // Override (tests, demo supervisor): run as given, no model,
            // args, or bootstrap appended.
            Some(exe) => exe.clone(),
            None => self.launch_cli(),
        };

        Ok(format!(
            "{prefix}{ENV_AGENT_ID}={id} {ENV_SESSION_ID}={session} {cmd}",
            id = self.agent.id.as_str(),
            session = self.session.as_str(),
        ))
    }

    /// The normal agent-CLI invocation with the bootstrap file injected
    fn launch_cli(&self) -> String {
        let mut cmd = shell_quote(DEFAULT_EXECUTABLE);

        if let Some(model) = &self.params.model {
            cmd.push_str(" --model ");
            cmd.push_str(&shell_quote(model));
        }

        for arg in &self.params.args {
            cmd.push(' ');
            cmd.push_str(&shell_quote(arg));
        }

        // Pass the bootstrap instruction as an argument via cat, keeping
        // the prompt text itself out of the command line.
        let safe_path = self.inception_path.to_string_lossy().replace('\'', "'\\''");
        cmd.push_str(&format!(" \"$(cat '{safe_path}')\""));
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AgentId, AgentStatus};

    fn sample_agent() -> Agent {
        Agent {
            id: AgentId::generate(),
            name: "w1".to_string(),
            role: "worker".to_string(),
            pane_ref: "$1:@1:%2".to_string(),
            status: AgentStatus::Created,
            created_at: 0,
            metadata: serde_json::Map::new(),
        }
    }

    #[test]
    fn shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
    }

    #[test]
    fn env_keys_must_be_identifiers() {
        let mut env = HashMap::new();
        env.insert("GOOD_KEY1".to_string(), "v".to_string());
        env.insert("_also_fine".to_string(), "v".to_string());
        assert!(validate_env_keys(&env).is_ok());

        env.insert("BAD-KEY".to_string(), "v".to_string());
        assert!(matches!(
            validate_env_keys(&env),
            Err(AgentError::InvalidEnvKey(k)) if k == "BAD-KEY"
        ));
    }

    #[test]
    fn env_keys_may_not_start_with_digit() {
        let mut env = HashMap::new();
        env.insert("1ONE".to_string(), "v".to_string());
        assert!(validate_env_keys(&env).is_err());
    }

    #[test]
    fn override_command_is_used_verbatim() {
        let agent = sample_agent();
        let session = SessionId::new("s-1");
        let params = CreateAgentParams {
            name: "w1".to_string(),
            role: "worker".to_string(),
            executable_override: Some("echo hello".to_string()),
            ..Default::default()
        };
        let cmd = LaunchCommand::new(&agent, &params, &session, Path::new("/tmp/x"))
            .build()
            .unwrap();
        assert!(cmd.ends_with("echo hello"));
        assert!(cmd.contains(&format!("{ENV_AGENT_ID}={}", agent.id)));
        assert!(cmd.contains(&format!("{ENV_SESSION_ID}=s-1")));
        assert!(!cmd.contains("cat"));
    }

    #[test]
    fn normal_launch_injects_inception_file() {
        let agent = sample_agent();
        let session = SessionId::new("s-1");
        let params = CreateAgentParams {
            name: "w1".to_string(),
            role: "worker".to_string(),
            model: Some("opus".to_string()),
            args: vec!["--verbose".to_string()],
            ..Default::default()
        };
        let cmd = LaunchCommand::new(&agent, &params, &session, Path::new("/ws/inception.txt"))
            .build()
            .unwrap();
        assert!(cmd.contains("'claude' --model 'opus' '--verbose'"));
        assert!(cmd.contains("\"$(cat '/ws/inception.txt')\""));
    }

    #[test]
    fn env_prefix_precedes_correlation_vars() {
        let agent = sample_agent();
        let session = SessionId::new("s-1");
        let mut env = HashMap::new();
        env.insert("FOO".to_string(), "a b".to_string());
        let params = CreateAgentParams {
            name: "w1".to_string(),
            role: "worker".to_string(),
            env: Some(env),
            executable_override: Some("true".to_string()),
            ..Default::default()
        };
        let cmd = LaunchCommand::new(&agent, &params, &session, Path::new("/tmp/x"))
            .build()
            .unwrap();
        assert!(cmd.starts_with("FOO='a b' "));
    }
}
