pub mod eligibility;
pub mod prompts;
pub mod store;
pub mod submission;

pub use eligibility::SurveyEligibilityTracker;
pub use prompts::SurveyPromptService;
pub use store::{InMemorySurveyStore, SupabaseSurveyStore, SurveyStore, SurveyStoreError};
pub use submission::SurveyService;
