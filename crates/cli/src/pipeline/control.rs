//! `--control` script: lifecycle commands scheduled on the sample clock.
//!
//! Format: comma-separated `action@offset`, offset in seconds since the first
//! fix (`30`, `30s`, `1.5m`). Offsets must not decrease.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use crate::error::{CliError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Pause,
    Resume,
    Stop,
}

impl fmt::Display for ControlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ControlAction::Pause => "pause",
            ControlAction::Resume => "resume",
            ControlAction::Stop => "stop",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ControlStep {
    action: ControlAction,
    at_s: f64,
}

/// Pending control steps in firing order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlScript {
    steps: VecDeque<ControlStep>,
}

impl ControlScript {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Pop the next step whose offset has been reached
    pub fn next_due(&mut self, elapsed_s: f64) -> Option<ControlAction> {
        if self.steps.front()?.at_s <= elapsed_s {
            self.steps.pop_front().map(|step| step.action)
        } else {
            None
        }
    }
}

impl FromStr for ControlScript {
    type Err = CliError;

    fn from_str(script: &str) -> Result<Self> {
        let mut steps = VecDeque::new();
        let mut last_at = 0.0;

        for part in script.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (action, offset) = part
                .split_once('@')
                .ok_or_else(|| CliError::invalid_control(script, format!("'{part}' is missing '@'")))?;

            let action = match action.trim().to_ascii_lowercase().as_str() {
                "pause" => ControlAction::Pause,
                "resume" => ControlAction::Resume,
                "stop" => ControlAction::Stop,
                other => {
                    return Err(CliError::invalid_control(
                        script,
                        format!("unknown action '{other}'"),
                    ))
                }
            };

            let at_s = parse_offset(offset.trim())
                .ok_or_else(|| CliError::invalid_control(script, format!("bad offset '{offset}'")))?;
            if at_s < last_at {
                return Err(CliError::invalid_control(
                    script,
                    format!("'{part}' is earlier than the previous step"),
                ));
            }
            last_at = at_s;
            steps.push_back(ControlStep { action, at_s });
        }

        Ok(Self { steps })
    }
}

fn parse_offset(s: &str) -> Option<f64> {
    let (number, scale) = if let Some(n) = s.strip_suffix('m') {
        (n, 60.0)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1.0)
    } else {
        (s, 1.0)
    };

    let value: f64 = number.trim().parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value * scale)
}
