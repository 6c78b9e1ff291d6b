//! Device identity command.

use clap::Args;
use mood_journal_core::DeviceIdentity;

use moodjournal::config::Config;

/// Show this device's id
#[derive(Args)]
pub struct DeviceCommand {}

impl DeviceCommand {
    pub fn run(&self, config: &Config) {
        let identity = DeviceIdentity::new(config.data_dir.value.clone());
        let device_id = identity.current_device_id();

        println!("Device");
        println!("======");
        println!();
        println!("ID:   {}", device_id);
        println!("File: {}", identity.path().display());
        println!();
        println!("Entries are stored on the server under this id.");
    }
}
