pub mod doi;
pub mod membership;

pub use doi::{CategorizedDois, MembershipDiff, categorize_dois, datasource_of, diff_membership};
pub use membership::{DoiUpdate, MembershipService};
