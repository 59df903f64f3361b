pub mod assistant_socket;
pub mod protocol;
