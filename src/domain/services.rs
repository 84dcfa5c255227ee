//! Domain services
//!
//! Pure business logic over domain types: candidate sampling, the eligibility policy
//! and the stratified balancer. Randomness is always injected by the caller.

pub mod balancer;
pub mod eligibility;
pub mod sampler;

pub use balancer::{BalanceMode, BalancedSample, balance};
pub use eligibility::{EligibilityPolicy, Rejection};
pub use sampler::{sample_ids, sample_without_replacement};
