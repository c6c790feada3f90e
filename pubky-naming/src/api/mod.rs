//! Operations exposed by a naming node.

mod bootstrap;
mod publish;

pub use bootstrap::{BootstrapConfig, BootstrapPeers, ResetError, ResetOptions};
pub use publish::{NamePublisher, PublishError, PublishOptions, PublishResult};
