// Adapters layer: concrete implementations of the domain ports (upstream GraphQL APIs, local storage).

pub mod graphql;
pub mod storage;

pub use graphql::{GraphQlClient, GraphQlRequest, PartnerClient, RankingClient};
pub use storage::LocalStorage;
