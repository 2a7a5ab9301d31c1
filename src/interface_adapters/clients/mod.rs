// Outbound HTTP clients for sibling services.

pub mod persistence;
