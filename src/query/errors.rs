//! Query parse errors
//!
//! Every failure is detected at parse time and rejects the whole filter;
//! no partial ASTs are returned. Evaluation never errors.
//!
//! Error codes:
//! - DQ_QUERY_TOO_SHORT (REJECT)
//! - DQ_QUERY_UNBALANCED (REJECT)
//! - DQ_QUERY_TRUNCATED (REJECT)
//! - DQ_QUERY_EMPTY_GROUP (REJECT)
//! - DQ_QUERY_EMPTY_ATTRIBUTE (REJECT)
//! - DQ_QUERY_INVALID_COMPARATOR (REJECT)
//! - DQ_QUERY_UNKNOWN_MODIFIER (REJECT)
//! - DQ_QUERY_UNKNOWN_SYNTHETIC (REJECT)
//! - DQ_QUERY_NOT_INTEGER (REJECT)
//! - DQ_QUERY_INVALID_REGEX (REJECT)
//! - DQ_QUERY_INVALID_GLOB (REJECT)
//! - DQ_QUERY_UNKNOWN_METHOD (REJECT)
//! - DQ_QUERY_TRAILING_DATA (REJECT)

use std::fmt;

/// Severity levels for query errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Filter rejected
    Reject,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
        }
    }
}

/// Query error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorCode {
    /// Input shorter than the smallest valid filter
    TooShort,
    /// Missing opening or closing parenthesis
    Unbalanced,
    /// Unterminated escape, attribute name or value
    Truncated,
    /// `&` or `|` without subqueries
    EmptyGroup,
    /// Attribute name is empty
    EmptyAttribute,
    /// Malformed or disallowed comparator
    InvalidComparator,
    /// Unknown `:modifier:`
    UnknownModifier,
    /// Unknown `_`-prefixed attribute
    UnknownSynthetic,
    /// Value must be a base-10 integer
    NotInteger,
    /// Regular expression failed to compile
    InvalidRegex,
    /// Glob pattern failed to compile
    InvalidGlob,
    /// Unknown attack method name
    UnknownMethod,
    /// Input left over after a strict parse
    TrailingData,
}

impl QueryErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            QueryErrorCode::TooShort => "DQ_QUERY_TOO_SHORT",
            QueryErrorCode::Unbalanced => "DQ_QUERY_UNBALANCED",
            QueryErrorCode::Truncated => "DQ_QUERY_TRUNCATED",
            QueryErrorCode::EmptyGroup => "DQ_QUERY_EMPTY_GROUP",
            QueryErrorCode::EmptyAttribute => "DQ_QUERY_EMPTY_ATTRIBUTE",
            QueryErrorCode::InvalidComparator => "DQ_QUERY_INVALID_COMPARATOR",
            QueryErrorCode::UnknownModifier => "DQ_QUERY_UNKNOWN_MODIFIER",
            QueryErrorCode::UnknownSynthetic => "DQ_QUERY_UNKNOWN_SYNTHETIC",
            QueryErrorCode::NotInteger => "DQ_QUERY_NOT_INTEGER",
            QueryErrorCode::InvalidRegex => "DQ_QUERY_INVALID_REGEX",
            QueryErrorCode::InvalidGlob => "DQ_QUERY_INVALID_GLOB",
            QueryErrorCode::UnknownMethod => "DQ_QUERY_UNKNOWN_METHOD",
            QueryErrorCode::TrailingData => "DQ_QUERY_TRAILING_DATA",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Reject
    }
}

impl fmt::Display for QueryErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Query error with position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryError {
    code: QueryErrorCode,
    message: String,
    /// Byte offset into the filter text being parsed
    offset: usize,
}

impl QueryError {
    /// Creates an error with an explicit code
    pub fn new(code: QueryErrorCode, message: impl Into<String>, offset: usize) -> Self {
        Self {
            code,
            message: message.into(),
            offset,
        }
    }

    pub fn too_short(len: usize) -> Self {
        Self::new(
            QueryErrorCode::TooShort,
            format!("Query string too short ({} bytes, minimum 5)", len),
            0,
        )
    }

    pub fn unbalanced(reason: impl Into<String>, offset: usize) -> Self {
        Self::new(QueryErrorCode::Unbalanced, reason, offset)
    }

    pub fn truncated(reason: impl Into<String>, offset: usize) -> Self {
        Self::new(QueryErrorCode::Truncated, reason, offset)
    }

    pub fn empty_group(offset: usize) -> Self {
        Self::new(
            QueryErrorCode::EmptyGroup,
            "Group must contain at least one subquery",
            offset,
        )
    }

    pub fn empty_attribute(offset: usize) -> Self {
        Self::new(
            QueryErrorCode::EmptyAttribute,
            "Attribute name is empty",
            offset,
        )
    }

    pub fn invalid_comparator(reason: impl Into<String>, offset: usize) -> Self {
        Self::new(QueryErrorCode::InvalidComparator, reason, offset)
    }

    pub fn unknown_modifier(modifier: &str, offset: usize) -> Self {
        Self::new(
            QueryErrorCode::UnknownModifier,
            format!("Unknown modifier '{}'", modifier),
            offset,
        )
    }

    pub fn unknown_synthetic(name: &str, offset: usize) -> Self {
        Self::new(
            QueryErrorCode::UnknownSynthetic,
            format!("Unknown synthetic attribute '{}'", name),
            offset,
        )
    }

    pub fn not_integer(context: &str, value: &str, offset: usize) -> Self {
        Self::new(
            QueryErrorCode::NotInteger,
            format!("Could not convert '{}' to integer for {}", value, context),
            offset,
        )
    }

    pub fn invalid_regex(source: &regex::Error, offset: usize) -> Self {
        Self::new(
            QueryErrorCode::InvalidRegex,
            format!("Invalid regular expression: {}", source),
            offset,
        )
    }

    pub fn invalid_glob(source: &glob::PatternError, offset: usize) -> Self {
        Self::new(
            QueryErrorCode::InvalidGlob,
            format!("Invalid glob pattern: {}", source),
            offset,
        )
    }

    pub fn unknown_method(name: &str, offset: usize) -> Self {
        Self::new(
            QueryErrorCode::UnknownMethod,
            format!("Could not convert '{}' to an attack method", name),
            offset,
        )
    }

    pub fn trailing_data(rest: &str, offset: usize) -> Self {
        Self::new(
            QueryErrorCode::TrailingData,
            format!("Extra data after query: '{}'", rest),
            offset,
        )
    }

    /// Returns the error code
    pub fn code(&self) -> QueryErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the byte offset the error was detected at
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} (at offset {})",
            self.code.severity(),
            self.code.code(),
            self.message,
            self.offset
        )
    }
}

impl std::error::Error for QueryError {}

/// Result type for query parsing
pub type QueryResult<T> = Result<T, QueryError>;
