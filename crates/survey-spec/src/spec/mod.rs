pub mod field;
pub mod section;
pub mod survey;

pub use field::{Constraint, FieldSpec, FieldType};
pub use section::SectionSpec;
pub use survey::{Presentation, SurveySpec};
