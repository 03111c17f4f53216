//! Bitbucket Cloud adapter: repository issues (no advisory support).

mod client;
mod convert;
mod types;

pub use client::{BitbucketClient, MAX_PAGE_SIZE};
pub use convert::{issue_to_provider_issue, map_state};
pub use types::{
    BitbucketContent, BitbucketHref, BitbucketIssue, BitbucketLinks, BitbucketNamed,
    BitbucketPage, BitbucketRepository, BitbucketUser,
};
