pub mod relay;
pub mod settlement;
pub mod subscriptions;
pub mod tokenization;
pub mod wallets;
