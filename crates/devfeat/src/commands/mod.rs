//! Command implementations
//!
//! This module contains implementations for all CLI subcommands.

pub mod live;
pub mod publish;
pub mod test;

use devfeat_core::lifecycle::{DevcontainerCli, StepTimeouts};
use devfeat_core::settings::Settings;

/// Lifecycle tool client configured from settings
pub(crate) fn devcontainer_cli(settings: &Settings) -> DevcontainerCli {
    DevcontainerCli::new(settings.devcontainer_path.clone()).with_timeouts(StepTimeouts {
        up: settings.up_timeout(),
        exec: settings.exec_timeout(),
        down: settings.down_timeout(),
        ..StepTimeouts::default()
    })
}
