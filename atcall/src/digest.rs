//! Classification of response lines into final result codes.
//!
//! A command response looks like (echo enabled, `'...'` meaning optional):
//!
//! ```text
//! AT<CMD>            <- echo, dropped
//! '<INFORMATION>'    <- zero or more intermediate lines
//! <RESULT CODE>      <- terminal line
//! ```
//!
//! where `<RESULT CODE>` is `OK`, `ERROR`, `+CME ERROR: <code>`,
//! `+CMS ERROR: <code>` or one of the V.250 call progress codes
//! `NO CARRIER`, `BUSY`, `NO ANSWER` and `NO DIALTONE`.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::space0,
    combinator::{all_consuming, map, rest, value},
    sequence::{pair, preceded},
    IResult,
};

use crate::error::{ErrorCode, ResultError};

/// Outcome of a terminal line.
pub(crate) type ResultCode = Result<(), ResultError>;

/// Returns the result code if `line` terminates a command response.
pub(crate) fn result_code(line: &str) -> Option<ResultCode> {
    final_result(line.trim()).ok().map(|(_, code)| code)
}

fn final_result(input: &str) -> IResult<&str, ResultCode> {
    alt((
        value(Ok(()), all_consuming(tag("OK"))),
        value(Err(ResultError::Error), all_consuming(tag("ERROR"))),
        map(cme_error, Err),
        map(cms_error, Err),
        value(Err(ResultError::NoCarrier), all_consuming(tag("NO CARRIER"))),
        value(Err(ResultError::Busy), all_consuming(tag("BUSY"))),
        value(Err(ResultError::NoAnswer), all_consuming(tag("NO ANSWER"))),
        value(Err(ResultError::NoDialtone), all_consuming(tag("NO DIALTONE"))),
    ))(input)
}

fn cme_error(input: &str) -> IResult<&str, ResultError> {
    map(preceded(pair(tag("+CME ERROR:"), space0), rest), |code| {
        ResultError::Cme(error_code(code))
    })(input)
}

fn cms_error(input: &str) -> IResult<&str, ResultError> {
    map(preceded(pair(tag("+CMS ERROR:"), space0), rest), |code| {
        ResultError::Cms(error_code(code))
    })(input)
}

fn error_code(code: &str) -> ErrorCode {
    let code = code.trim();
    code.parse()
        .map(ErrorCode::Numeric)
        .unwrap_or_else(|_| ErrorCode::Verbose(code.to_string()))
}
