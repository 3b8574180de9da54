use std::fmt;

/**
 * Represents the type of error that can occur within the application.
 */
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorType {
    Initialization,
    JwtAuthorization,
    Forbidden,
    Validation,
    NotFound,
    InvalidOperation,
    ConstraintViolation,
    DatabaseError,
    BlobStorage,
    Email,
    Application,
}

/**
 * Represents an error that occurs within the application.
 */
#[derive(Debug, Clone)]
pub struct ApplicationError {
    /**
     * Error type.
     */
    pub error_type: ErrorType,
    /**
     * Error message describing problem.
     */
    pub message: String,
}

impl ApplicationError {
    /**
     * Creates a new ApplicationError.
     *
     * #Arguments
     * `error_type`: The type of error.
     * `message`: A description of the error.
     */
    pub fn new(error_type: ErrorType, message: String) -> Self {
        ApplicationError { error_type, message }
    }

    /**
     * Shorthand for access violations against the city/club hierarchy.
     */
    pub fn forbidden() -> Self {
        ApplicationError::new(ErrorType::Forbidden, "Access denied".to_string())
    }

    /**
     * Shorthand for a lookup that found nothing.
     */
    pub fn not_found(entity: &str) -> Self {
        ApplicationError::new(ErrorType::NotFound, format!("{entity} not found"))
    }
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApplicationError {}
