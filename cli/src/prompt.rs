use std::io::{BufRead, Write};

/// Ask the operator to confirm deleting `count` resources.
///
/// Only `y` or `yes` (any case) confirms; anything else, including end of
/// input, declines.
pub fn confirm_deletion<R: BufRead, W: Write>(
    count: usize,
    input: &mut R,
    output: &mut W,
) -> std::io::Result<bool> {
    write!(output, "\nDelete all {count} resources? (y/N): ")?;
    output.flush()?;

    let mut answer = String::new();
    if input.read_line(&mut answer)? == 0 {
        return Ok(false);
    }

    let answer = answer.trim();
    Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
}
