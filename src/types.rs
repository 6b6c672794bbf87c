use std::collections::BTreeMap;
use std::fmt;

/// Variables reported by a plugin through `setenv` messages.
pub type ResultVariables = BTreeMap<String, String>;

/// Lifecycle operation delegated to a provider plugin.
///
/// - `Up`: the plugin creates (or attaches to) the external resource.
/// - `Down`: the plugin removes it.
///
/// The plugin sees the command word (`up` / `down`) as a positional argument;
/// progress messages and errors use the action word (`create` / `remove`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Up,
    Down,
}

impl Operation {
    /// Positional command passed to the plugin.
    pub fn command(self) -> &'static str {
        match self {
            Operation::Up => "up",
            Operation::Down => "down",
        }
    }

    /// Verb used in user-facing failure messages.
    pub fn action(self) -> &'static str {
        match self {
            Operation::Up => "create",
            Operation::Down => "remove",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_and_action_words() {
        assert_eq!(Operation::Up.command(), "up");
        assert_eq!(Operation::Up.action(), "create");
        assert_eq!(Operation::Down.command(), "down");
        assert_eq!(Operation::Down.action(), "remove");
    }
}
