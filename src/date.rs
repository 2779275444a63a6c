use jiff::civil::Date;

use crate::Error;

/// Format accepted on the command line.
pub const INPUT_FORMAT: &str = "%Y-%m-%d";
/// Format the provider expects in `date_req`.
pub const REQUEST_FORMAT: &str = "%d/%m/%Y";

/// Parse a `YYYY-MM-DD` calendar date.
///
/// Only the fixed-width form is accepted: four-digit year, two-digit month and day, no sign and
/// no surrounding whitespace.
pub fn parse_date(input: &str) -> Result<Date, Error> {
    let invalid = |source| Error::InvalidDateFormat {
        input: input.to_string(),
        source,
    };
    if !has_fixed_shape(input) {
        return Err(invalid(jiff::Error::from_args(format_args!(
            "expected exactly YYYY-MM-DD"
        ))));
    }
    Date::strptime(INPUT_FORMAT, input).map_err(invalid)
}

fn has_fixed_shape(input: &str) -> bool {
    let bytes = input.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

/// Re-render a `YYYY-MM-DD` date as `DD/MM/YYYY`.
pub fn format_request_date(input: &str) -> Result<String, Error> {
    Ok(parse_date(input)?.strftime(REQUEST_FORMAT).to_string())
}
