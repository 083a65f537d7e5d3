//! Line commands read from stdin

use laundry_api::{MachineType, UnknownMachine};
use laundry_util::AlertId;
use std::str::FromStr;
use thiserror::Error;

pub const HELP: &str = "\
Commands:
  status                       show both machines
  claim <machine> [minutes]    reserve the washer or dryer
  release <machine>            give a machine back
  extend <machine> <minutes>   start another cycle on your finished machine
  alerts                       list active alerts
  dismiss <id>                 dismiss an alert
  help                         show this help
  quit                         exit";

/// A parsed client command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status,
    /// `None` minutes means the configured default cycle
    Claim {
        machine: MachineType,
        minutes: Option<u64>,
    },
    Release {
        machine: MachineType,
    },
    Extend {
        machine: MachineType,
        minutes: u64,
    },
    Alerts,
    Dismiss {
        id: AlertId,
    },
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command '{0}', type 'help' for a list")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("{0}")]
    Machine(#[from] UnknownMachine),

    #[error("'{0}' is not a whole number of minutes")]
    Minutes(String),

    #[error("'{0}' is not an alert id")]
    AlertId(String),
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(CommandError::Usage("help"));
        };
        let args: Vec<&str> = words.collect();

        match (verb.to_lowercase().as_str(), args.as_slice()) {
            ("status" | "s", []) => Ok(Command::Status),
            ("claim", [machine]) => Ok(Command::Claim {
                machine: machine.parse()?,
                minutes: None,
            }),
            ("claim", [machine, minutes]) => Ok(Command::Claim {
                machine: machine.parse()?,
                minutes: Some(parse_minutes(minutes)?),
            }),
            ("claim", _) => Err(CommandError::Usage("claim <machine> [minutes]")),
            ("release", [machine]) => Ok(Command::Release {
                machine: machine.parse()?,
            }),
            ("release", _) => Err(CommandError::Usage("release <machine>")),
            ("extend", [machine, minutes]) => Ok(Command::Extend {
                machine: machine.parse()?,
                minutes: parse_minutes(minutes)?,
            }),
            ("extend", _) => Err(CommandError::Usage("extend <machine> <minutes>")),
            ("alerts", []) => Ok(Command::Alerts),
            ("dismiss", [id]) => id
                .parse::<u64>()
                .map(|raw| Command::Dismiss {
                    id: AlertId::from_raw(raw),
                })
                .map_err(|_| CommandError::AlertId(id.to_string())),
            ("dismiss", _) => Err(CommandError::Usage("dismiss <id>")),
            ("help" | "?", _) => Ok(Command::Help),
            ("quit" | "exit" | "q", []) => Ok(Command::Quit),
            _ => Err(CommandError::Unknown(verb.to_string())),
        }
    }
}

fn parse_minutes(value: &str) -> Result<u64, CommandError> {
    value
        .parse()
        .map_err(|_| CommandError::Minutes(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_claim() {
        assert_eq!(
            "claim washer".parse::<Command>().unwrap(),
            Command::Claim {
                machine: MachineType::Washer,
                minutes: None,
            }
        );
        assert_eq!(
            "  CLAIM Dryer 45 ".parse::<Command>().unwrap(),
            Command::Claim {
                machine: MachineType::Dryer,
                minutes: Some(45),
            }
        );
    }

    #[test]
    fn test_parse_extend_needs_minutes() {
        assert_eq!(
            "extend dryer".parse::<Command>(),
            Err(CommandError::Usage("extend <machine> <minutes>"))
        );
        assert_eq!(
            "extend dryer 20".parse::<Command>().unwrap(),
            Command::Extend {
                machine: MachineType::Dryer,
                minutes: 20,
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "claim mangle".parse::<Command>(),
            Err(CommandError::Machine(_))
        ));
        assert_eq!(
            "claim washer soon".parse::<Command>(),
            Err(CommandError::Minutes("soon".into()))
        );
        assert_eq!(
            "dismiss x".parse::<Command>(),
            Err(CommandError::AlertId("x".into()))
        );
        assert_eq!(
            "spin".parse::<Command>(),
            Err(CommandError::Unknown("spin".into()))
        );
        assert!("".parse::<Command>().is_err());
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!("status".parse::<Command>().unwrap(), Command::Status);
        assert_eq!("alerts".parse::<Command>().unwrap(), Command::Alerts);
        assert_eq!("help".parse::<Command>().unwrap(), Command::Help);
        assert_eq!("quit".parse::<Command>().unwrap(), Command::Quit);
        assert_eq!(
            "dismiss 7".parse::<Command>().unwrap(),
            Command::Dismiss {
                id: AlertId::from_raw(7)
            }
        );
    }
}
