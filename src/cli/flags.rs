//! Flag values read from parsed command-line matches
//!
//! Precedence is command line, then the first present input environment
//! variable, then the declared default.

use crate::config::types::Flag;
use crate::runner::bind::FlagSource;
use clap::parser::ValueSource;
use clap::ArgMatches;
use tracing::warn;

/// [`FlagSource`] over the matches of one task sub-command
pub struct MatchesFlags<'a> {
    matches: &'a ArgMatches,
    flags: &'a [Flag],
}

impl<'a> MatchesFlags<'a> {
    pub fn new(matches: &'a ArgMatches, flags: &'a [Flag]) -> Self {
        MatchesFlags { matches, flags }
    }

    fn from_command_line(&self, name: &str) -> bool {
        self.matches.value_source(name) == Some(ValueSource::CommandLine)
    }

    fn env_value(&self, name: &str) -> Option<String> {
        self.flags
            .iter()
            .find(|flag| flag.name == name)?
            .input_envs
            .iter()
            .find_map(|key| std::env::var(key).ok())
    }

    fn matched_string(&self, name: &str) -> Option<String> {
        self.matches
            .try_get_one::<String>(name)
            .ok()
            .flatten()
            .cloned()
    }
}

impl FlagSource for MatchesFlags<'_> {
    fn is_set(&self, name: &str) -> bool {
        self.from_command_line(name) || self.env_value(name).is_some()
    }

    fn bool_value(&self, name: &str) -> bool {
        if self.from_command_line(name) {
            return self
                .matches
                .try_get_one::<bool>(name)
                .ok()
                .flatten()
                .copied()
                .unwrap_or(false);
        }
        match self.env_value(name) {
            Some(value) => parse_bool(&value).unwrap_or_else(|| {
                warn!(flag = name, value = %value, "ignoring a non-boolean environment value");
                false
            }),
            None => false,
        }
    }

    fn string_value(&self, name: &str) -> String {
        if self.from_command_line(name) {
            return self.matched_string(name).unwrap_or_default();
        }
        self.env_value(name)
            .or_else(|| self.matched_string(name))
            .unwrap_or_default()
    }
}

/// Boolean spellings accepted from environment variables
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{Arg, ArgAction, Command};

    fn flags() -> Vec<Flag> {
        vec![
            Flag {
                name: "force".to_string(),
                flag_type: "bool".to_string(),
                input_envs: vec!["CMDX_FLAGS_TEST_FORCE".to_string()],
                ..Flag::default()
            },
            Flag {
                name: "env".to_string(),
                default: "staging".to_string(),
                input_envs: vec!["CMDX_FLAGS_TEST_ENV".to_string()],
                ..Flag::default()
            },
        ]
    }

    fn matches(args: &[&str]) -> ArgMatches {
        Command::new("task")
            .arg(Arg::new("force").long("force").action(ArgAction::SetTrue))
            .arg(Arg::new("env").long("env").default_value("staging"))
            .get_matches_from(std::iter::once("task").chain(args.iter().copied()))
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("F"), Some(false));
        assert_eq!(parse_bool("yes"), None);
    }

    #[test]
    fn test_command_line_values() {
        let flags = flags();
        let m = matches(&["--force", "--env", "prod"]);
        let source = MatchesFlags::new(&m, &flags);
        assert!(source.is_set("force"));
        assert!(source.bool_value("force"));
        assert!(source.is_set("env"));
        assert_eq!(source.string_value("env"), "prod");
    }

    #[test]
    fn test_defaults_are_not_set() {
        let mut flags = flags();
        for flag in &mut flags {
            flag.input_envs.clear();
        }
        let m = matches(&[]);
        let source = MatchesFlags::new(&m, &flags);
        assert!(!source.is_set("force"));
        assert!(!source.bool_value("force"));
        assert!(!source.is_set("env"));
        assert_eq!(source.string_value("env"), "staging");
    }

    #[test]
    fn test_input_env_fallback() {
        std::env::set_var("CMDX_FLAGS_TEST_ENV", "from-env");
        std::env::set_var("CMDX_FLAGS_TEST_FORCE", "true");

        let flags = flags();
        let m = matches(&[]);
        let source = MatchesFlags::new(&m, &flags);
        assert!(source.is_set("env"));
        assert_eq!(source.string_value("env"), "from-env");
        assert!(source.bool_value("force"));

        let m = matches(&["--env", "cli"]);
        let source = MatchesFlags::new(&m, &flags);
        assert_eq!(source.string_value("env"), "cli");

        std::env::remove_var("CMDX_FLAGS_TEST_ENV");
        std::env::remove_var("CMDX_FLAGS_TEST_FORCE");
    }
}
