pub mod list_networks;
pub mod send;
