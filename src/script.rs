//! Scripted key input for dry runs
//!
//! One step per line; `#` starts a comment.
//!
//! ```text
//! press 0      # key 0 goes down
//! wait 300     # milliseconds
//! release 0
//! tap 2        # press and release
//! ```

use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::event::MatrixScanner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStep {
    Press(usize),
    Release(usize),
    Tap(usize),
    Wait(Duration),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("line {line}: unknown command \"{command}\"")]
    UnknownCommand { line: usize, command: String },

    #[error("line {line}: \"{command}\" needs a number")]
    MissingArgument { line: usize, command: String },

    #[error("line {line}: invalid number \"{value}\"")]
    InvalidNumber { line: usize, value: String },
}

/// Parse a whole script
pub fn parse_script(source: &str) -> Result<Vec<ScriptStep>, ScriptError> {
    let mut steps = Vec::new();
    for (i, raw) in source.lines().enumerate() {
        let line = i + 1;
        let text = raw.split('#').next().unwrap_or_default().trim();
        if text.is_empty() {
            continue;
        }
        let mut words = text.split_whitespace();
        let command = words.next().unwrap_or_default().to_ascii_lowercase();
        let value = words.next().ok_or_else(|| ScriptError::MissingArgument {
            line,
            command: command.clone(),
        })?;
        let number: u64 = value.parse().map_err(|_| ScriptError::InvalidNumber {
            line,
            value: value.to_string(),
        })?;
        let step = match command.as_str() {
            "press" => ScriptStep::Press(number as usize),
            "release" => ScriptStep::Release(number as usize),
            "tap" => ScriptStep::Tap(number as usize),
            "wait" => ScriptStep::Wait(Duration::from_millis(number)),
            _ => return Err(ScriptError::UnknownCommand { line, command }),
        };
        steps.push(step);
    }
    Ok(steps)
}

/// Feed `steps` through `scanner` as if the keys were really pressed.
///
/// Keys past the scanner's width are ignored by it.
pub async fn play(steps: &[ScriptStep], scanner: &mut MatrixScanner, key_count: usize) {
    let pressed_level = scanner.pressed_level();
    let mut levels = vec![!pressed_level; key_count];
    let set = |levels: &mut Vec<bool>, key: usize, down: bool| {
        if let Some(level) = levels.get_mut(key) {
            *level = if down { pressed_level } else { !pressed_level };
        }
    };

    for step in steps {
        debug!("script: {:?}", step);
        match *step {
            ScriptStep::Press(key) => {
                set(&mut levels, key, true);
                scanner.scan(&levels);
            }
            ScriptStep::Release(key) => {
                set(&mut levels, key, false);
                scanner.scan(&levels);
            }
            ScriptStep::Tap(key) => {
                set(&mut levels, key, true);
                scanner.scan(&levels);
                set(&mut levels, key, false);
                scanner.scan(&levels);
            }
            ScriptStep::Wait(duration) => tokio::time::sleep(duration).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{channel, EventSource, KeyEvent};

    #[test]
    fn parses_commands_and_comments() {
        let steps = parse_script("# warm up\npress 1\n  wait 250 # hold\nRELEASE 1\n\ntap 0\n").unwrap();
        assert_eq!(
            steps,
            vec![
                ScriptStep::Press(1),
                ScriptStep::Wait(Duration::from_millis(250)),
                ScriptStep::Release(1),
                ScriptStep::Tap(0),
            ]
        );
    }

    #[test]
    fn reports_bad_lines() {
        assert_eq!(
            parse_script("press 1\njump 2"),
            Err(ScriptError::UnknownCommand { line: 2, command: "jump".into() })
        );
        assert_eq!(
            parse_script("wait"),
            Err(ScriptError::MissingArgument { line: 1, command: "wait".into() })
        );
        assert_eq!(
            parse_script("tap x"),
            Err(ScriptError::InvalidNumber { line: 1, value: "x".into() })
        );
    }

    #[tokio::test]
    async fn play_goes_through_the_scanner() {
        let (tx, mut source) = channel(16);
        let mut scanner = MatrixScanner::new(tx, 3, false);
        let steps = parse_script("tap 2\npress 0\npress 7\nrelease 0").unwrap();
        play(&steps, &mut scanner, 3).await;
        let events: Vec<_> = std::iter::from_fn(|| source.try_next()).collect();
        assert_eq!(
            events,
            vec![
                KeyEvent::press(2),
                KeyEvent::release(2),
                KeyEvent::press(0),
                KeyEvent::release(0),
            ]
        );
    }
}
