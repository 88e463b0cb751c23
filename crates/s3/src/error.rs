//! Failure classification for SDK and HTTP errors
//!
//! No response at all is a reachability failure; any response with an error
//! status is a rejection carrying that status.

use aws_sdk_s3::error::SdkError;
use aws_smithy_runtime_api::client::orchestrator::HttpResponse;
use aws_smithy_types::error::display::DisplayErrorContext;
use rcprobe_core::Error;

/// Map an aws-sdk-s3 error from operation `op`
pub(crate) fn map_sdk_error<E>(op: &str, err: SdkError<E, HttpResponse>) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    let message = format!("{op}: {}", DisplayErrorContext(&err));
    match &err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => Error::Reachability(message),
        SdkError::ServiceError(service) => Error::rejected(service.raw().status().as_u16(), message),
        SdkError::ResponseError(response) => {
            Error::rejected(response.raw().status().as_u16(), message)
        }
        _ => Error::General(message),
    }
}

/// Map a reqwest error from operation `op`
pub(crate) fn map_reqwest_error(op: &str, err: reqwest::Error) -> Error {
    let message = format!("{op}: {err}");
    if let Some(status) = err.status() {
        Error::rejected(status.as_u16(), message)
    } else if err.is_builder() {
        Error::General(message)
    } else {
        Error::Reachability(message)
    }
}

/// Turn an error-status response into a rejection, reading the error code
/// from the body when there is one
pub(crate) async fn check_status(op: &str, response: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match error_code(&body) {
        Some(code) => format!("{op}: {code}"),
        None => format!("{op}: HTTP {status}"),
    };
    Err(Error::rejected(status.as_u16(), message))
}

/// `<Code>` element of an S3/OSS XML error body.
///
/// Only this one field is read, so a plain substring scan stands in for an
/// XML parser. Other elements such as `<Message>` are left alone.
fn error_code(body: &str) -> Option<&str> {
    let start = body.find("<Code>")? + "<Code>".len();
    let end = body[start..].find("</Code>")? + start;
    Some(body[start..end].trim()).filter(|c| !c.is_empty())
}
