pub mod github_source;

pub use github_source::{
    GitHubSource, GitHubSourceConditionSet, GitHubSourceConditionType,
    GitHubSourceSpec, GitHubSourceStatus, github_source_condition_set,
};
