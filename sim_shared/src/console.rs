//! Console variables.
//!
//! A small typed cvar store with a line-based exec front end. Application
//! commands (spawn, status, quit, ...) live in the binaries; the console
//! itself only handles cvar queries/sets plus `echo` and `cvarlist`.

use std::collections::HashMap;

use anyhow::bail;

/// Console variable value.
#[derive(Debug, Clone, PartialEq)]
pub enum CvarValue {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
}

impl CvarValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            CvarValue::Int(v) => Some(*v),
            CvarValue::Float(v) => Some(*v as i64),
            CvarValue::Bool(v) => Some(if *v { 1 } else { 0 }),
            CvarValue::String(s) => s.parse().ok(),
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            CvarValue::Float(v) => Some(*v),
            CvarValue::Int(v) => Some(*v as f64),
            CvarValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            CvarValue::Bool(v) => *v,
            CvarValue::Int(v) => *v != 0,
            CvarValue::Float(v) => *v != 0.0,
            CvarValue::String(s) => !s.is_empty() && s != "0" && s.to_lowercase() != "false",
        }
    }

    /// Parses the loosest matching typed value from user input.
    fn parse(s: &str) -> Self {
        if let Ok(v) = s.parse::<i64>() {
            CvarValue::Int(v)
        } else if let Ok(v) = s.parse::<f64>() {
            CvarValue::Float(v)
        } else if s == "true" {
            CvarValue::Bool(true)
        } else if s == "false" {
            CvarValue::Bool(false)
        } else {
            CvarValue::String(s.trim_matches('"').to_string())
        }
    }
}

impl std::fmt::Display for CvarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CvarValue::Int(v) => write!(f, "{}", v),
            CvarValue::Float(v) => write!(f, "{}", v),
            CvarValue::String(v) => write!(f, "\"{}\"", v),
            CvarValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

bitflags::bitflags! {
    /// Cvar flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CvarFlags: u32 {
        const NONE = 0;
        const ARCHIVE = 1 << 0;      // Saved to config
        const REPLICATED = 1 << 1;   // Server -> client
        const SERVER_ONLY = 1 << 2;  // Server-side only
    }
}

impl Default for CvarFlags {
    fn default() -> Self {
        Self::NONE
    }
}

/// Console variable metadata.
#[derive(Debug, Clone)]
pub struct Cvar {
    pub name: String,
    pub value: CvarValue,
    pub default: CvarValue,
    pub description: String,
    pub flags: CvarFlags,
}

/// The cvar console.
#[derive(Default)]
pub struct Console {
    cvars: HashMap<String, Cvar>,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a console variable.
    pub fn register_cvar(
        &mut self,
        name: &str,
        default: CvarValue,
        description: &str,
        flags: CvarFlags,
    ) {
        self.cvars.insert(
            name.to_string(),
            Cvar {
                name: name.to_string(),
                value: default.clone(),
                default,
                description: description.to_string(),
                flags,
            },
        );
    }

    pub fn get_cvar(&self, name: &str) -> Option<CvarValue> {
        self.cvars.get(name).map(|c| c.value.clone())
    }

    pub fn set_cvar(&mut self, name: &str, value: CvarValue) -> anyhow::Result<()> {
        match self.cvars.get_mut(name) {
            Some(cvar) => {
                cvar.value = value;
                Ok(())
            }
            None => bail!("unknown cvar: {}", name),
        }
    }

    /// Executes a console line. Returns output lines for display.
    pub fn exec(&mut self, line: &str) -> anyhow::Result<Vec<String>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            return Ok(Vec::new());
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens[0] {
            "echo" => Ok(vec![tokens[1..].join(" ")]),
            "cvarlist" => {
                let mut names: Vec<&String> = self.cvars.keys().collect();
                names.sort();
                Ok(names
                    .into_iter()
                    .map(|n| {
                        let c = &self.cvars[n];
                        format!("  {} = {} (default: {}) - {}", c.name, c.value, c.default, c.description)
                    })
                    .collect())
            }
            "set" => {
                if tokens.len() < 3 {
                    bail!("usage: set <cvar> <value>");
                }
                let value = CvarValue::parse(&tokens[2..].join(" "));
                self.set_cvar(tokens[1], value.clone())?;
                Ok(vec![format!("{} = {}", tokens[1], value)])
            }
            name => {
                // Bare cvar name: query; with an argument: set.
                let Some(cvar) = self.cvars.get(name) else {
                    return Ok(vec![format!("Unknown command: {}", name)]);
                };
                if tokens.len() == 1 {
                    Ok(vec![format!(
                        "{} = {} (default: {})",
                        cvar.name, cvar.value, cvar.default
                    )])
                } else {
                    let value = CvarValue::parse(&tokens[1..].join(" "));
                    self.set_cvar(name, value.clone())?;
                    Ok(vec![format!("{} = {}", name, value)])
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_cvar_roundtrip() {
        let mut console = Console::new();
        console.register_cvar(
            "sv_replicate_hz",
            CvarValue::Float(1.0),
            "Snapshot broadcast frequency",
            CvarFlags::REPLICATED,
        );

        assert_eq!(
            console.get_cvar("sv_replicate_hz"),
            Some(CvarValue::Float(1.0))
        );

        console.exec("set sv_replicate_hz 5").unwrap();
        assert_eq!(
            console.get_cvar("sv_replicate_hz").unwrap().as_float(),
            Some(5.0)
        );
    }

    #[test]
    fn bare_name_queries_and_sets() {
        let mut console = Console::new();
        console.register_cvar(
            "cl_smoothing",
            CvarValue::Bool(false),
            "Smooth remote objects",
            CvarFlags::NONE,
        );

        let out = console.exec("cl_smoothing").unwrap();
        assert!(out[0].contains("false"));

        console.exec("cl_smoothing true").unwrap();
        assert!(console.get_cvar("cl_smoothing").unwrap().as_bool());
    }

    #[test]
    fn unknown_cvar_set_fails() {
        let mut console = Console::new();
        assert!(console.exec("set nope 1").is_err());
    }
}
