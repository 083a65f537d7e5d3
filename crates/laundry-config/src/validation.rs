//! Configuration validation

use crate::schema::{RawConfig, RawMachine};
use crate::settings::{DEFAULT_AUTO_RELEASE_WINDOW_SECS, default_max_minutes};
use laundry_api::MachineType;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Machine '{machine}': {message}")]
    MachineError {
        machine: MachineType,
        message: String,
    },

    #[error("'{field}' must be greater than zero")]
    ZeroInterval { field: &'static str },

    #[error("'{field}' threshold {seconds}s: {message}")]
    InvalidThreshold {
        field: &'static str,
        seconds: u64,
        message: String,
    },

    #[error("Global config error: {0}")]
    GlobalError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    errors.extend(validate_machine(MachineType::Washer, config.machines.washer.as_ref()));
    errors.extend(validate_machine(MachineType::Dryer, config.machines.dryer.as_ref()));

    let positive = [
        (
            "reservations.auto_release_window_seconds",
            config.reservations.auto_release_window_seconds,
        ),
        (
            "reservations.write_coalesce_seconds",
            config.reservations.write_coalesce_seconds,
        ),
        ("client.feed_poll_millis", config.client.feed_poll_millis),
        (
            "notifications.alert_dismiss_seconds",
            config.notifications.alert_dismiss_seconds,
        ),
        ("reaper.interval_seconds", config.reaper.interval_seconds),
    ];
    for (field, value) in positive {
        if value == Some(0) {
            errors.push(ValidationError::ZeroInterval { field });
        }
    }

    if config.notifications.alert_capacity == Some(0) {
        errors.push(ValidationError::GlobalError(
            "notifications.alert_capacity must be at least 1".into(),
        ));
    }

    if let Some(warnings) = &config.notifications.cycle_warning_seconds {
        for &seconds in warnings {
            if seconds == 0 {
                errors.push(ValidationError::InvalidThreshold {
                    field: "notifications.cycle_warning_seconds",
                    seconds,
                    message: "cycle completion already raises its own alert".into(),
                });
            }
        }
    }

    let window = config
        .reservations
        .auto_release_window_seconds
        .unwrap_or(DEFAULT_AUTO_RELEASE_WINDOW_SECS);
    if let Some(warnings) = &config.notifications.auto_release_warning_seconds {
        for &seconds in warnings {
            if seconds == 0 || seconds >= window {
                errors.push(ValidationError::InvalidThreshold {
                    field: "notifications.auto_release_warning_seconds",
                    seconds,
                    message: format!("must be between 1 and {}s (the pickup window)", window.saturating_sub(1)),
                });
            }
        }
    }

    errors
}

fn validate_machine(machine: MachineType, raw: Option<&RawMachine>) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let Some(raw) = raw else {
        return errors;
    };

    let max = raw
        .max_cycle_minutes
        .unwrap_or_else(|| default_max_minutes(machine));
    if max == 0 {
        errors.push(ValidationError::MachineError {
            machine,
            message: "max_cycle_minutes must be greater than zero".into(),
        });
    }

    if let Some(default) = raw.default_cycle_minutes {
        if default == 0 {
            errors.push(ValidationError::MachineError {
                machine,
                message: "default_cycle_minutes must be greater than zero".into(),
            });
        } else if default > max {
            errors.push(ValidationError::MachineError {
                machine,
                message: format!(
                    "default_cycle_minutes {} exceeds max_cycle_minutes {}",
                    default, max
                ),
            });
        }
    }

    if let Some(label) = &raw.label
        && label.trim().is_empty()
    {
        errors.push(ValidationError::MachineError {
            machine,
            message: "label cannot be empty".into(),
        });
    }

    errors
}
