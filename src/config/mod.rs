//! Static configuration: app registry, prompts and console labels.

mod apps;
mod i18n;
mod prompts;

pub use apps::{AppEntry, AppRegistry, RegistryError, BUILTIN_APPS};
pub use i18n::{get_messages, Messages};
pub use prompts::system_prompt;
