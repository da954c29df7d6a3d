// Data models matching the frontend TypeScript types

pub mod content;
pub mod request_log;

pub use content::{
    validate_content, Calculation, ContentValidationError, GeneratedContent, Question,
    QuestionOption, QuestionType, ResultType, Service, Source, Subservice, MIN_SERVICES,
    SUBSERVICES_PER_SERVICE,
};
pub use request_log::{RequestLogEntry, RequestStatus, RequestType};
