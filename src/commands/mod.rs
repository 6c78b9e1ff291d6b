mod config_cmd;
mod device;
mod entry;
mod sync_cmd;

pub use config_cmd::ConfigCommand;
pub use device::DeviceCommand;
pub use entry::{AddArgs, DateArgs, EditArgs, ListArgs};
pub use sync_cmd::SyncCommand;
