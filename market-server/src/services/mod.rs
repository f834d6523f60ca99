//! Cross-service clients

pub mod publish;

pub use publish::MarketplacePublisher;
