pub mod telegram_client;
pub mod vfs_client;
