//! Line oriented numeric parameter files (transfer functions, illumination).

use std::path::Path;

use nom::{
    character::complete::{space0, space1},
    multi::separated_list0,
    number::complete::float,
    sequence::delimited,
    IResult,
};

use crate::{PtintError, Result};

fn floats(i: &str) -> IResult<&str, Vec<f32>> {
    delimited(space0, separated_list0(space1, float), space0)(i)
}

/// Collects the whitespace separated floats of every line, skipping `#`
/// comment lines. Fails on the first token that is not a number.
pub(crate) fn read_floats(path: &Path, text: &str) -> Result<Vec<f32>> {
    let mut values = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        if line.trim_start().starts_with('#') {
            continue;
        }
        let rest = match floats(line) {
            Ok((rest, parsed)) => {
                values.extend(parsed);
                rest
            }
            Err(_) => line,
        };
        if let Some(token) = rest.split_whitespace().next() {
            return Err(PtintError::parse(path, lineno + 1, format!("invalid number '{token}'")));
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Vec<f32>> {
        read_floats(Path::new("params.txt"), text)
    }

    #[test]
    fn test_read_floats_skips_comments() {
        let values = parse("# header\n1 2.5\t-3\n\n  4e-1  \n").unwrap();
        assert_eq!(values, vec![1.0, 2.5, -3.0, 0.4]);
    }

    #[test]
    fn test_read_floats_reports_line() {
        match parse("# header\n1 2\n3 x 4\n") {
            Err(PtintError::Parse { line, message, .. }) => {
                assert_eq!(line, 3);
                assert!(message.contains("'x'"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_read_floats_rejects_glued_tokens() {
        assert!(matches!(parse("1.0.5\n"), Err(PtintError::Parse { line: 1, .. })));
        assert!(matches!(parse("2 3abc\n"), Err(PtintError::Parse { line: 1, .. })));
    }
}
