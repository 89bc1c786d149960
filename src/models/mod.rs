pub mod candidate;
pub mod profile;
pub mod registration;

pub use candidate::{
    Explanation, ProgramCandidate, ProgramDetails, RecommendationSource, Urgency,
};
pub use profile::{parse_month, ProfileUpdate, UserProfile};
pub use registration::Registration;
