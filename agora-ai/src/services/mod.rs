//! External service clients

pub mod vote_client;

pub use vote_client::{HttpVoteClient, VoteApi, VoteCreateRequest, VoteOptionRequest, VoteRuleRequest};
