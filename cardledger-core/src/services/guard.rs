//! Boundary guard: turns a service result into an [`OperationResult`]

use crate::domain::result::{OperationResult, Result, GENERIC_FAILURE_MESSAGE};
use crate::services::logging::{LogEvent, LoggingService};

/// Convert a service result for the outside world.
///
/// Infrastructure failures reach the caller only as the generic message;
/// their cause is written to the log store. Business failures pass through
/// with their own message.
pub fn guarded<T>(logger: &LoggingService, operation: &str, result: Result<T>) -> OperationResult<T> {
    if let Err(e) = &result {
        if e.is_infrastructure() {
            let _ = logger.log(
                LogEvent::new("operation_failed")
                    .with_operation(operation)
                    .with_error(GENERIC_FAILURE_MESSAGE)
                    .with_error_details(e.to_string()),
            );
        }
    }
    result.into()
}
