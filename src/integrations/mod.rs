//! External service integrations.

pub mod graph_client {
    pub use crate::graph_client::*;
}

pub mod facebook_models {
    pub use crate::facebook_models::*;
}
