mod client_auth;
mod server_auth;

pub mod client {
    pub use super::client_auth::*;
}

pub mod server {
    pub use super::server_auth::*;
}
