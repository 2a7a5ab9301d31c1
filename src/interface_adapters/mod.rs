// Interface adapters: wire protocol, network handling, outbound clients.

pub mod clients;
pub mod net;
pub mod protocol;
pub mod state;
pub mod utils;
