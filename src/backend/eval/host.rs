//! Simulated C library primitives the generated code is linked against.

use log::trace;

use super::{EvaluationError, Interrupt, Machine, value::Value};
use crate::middle::lowering::runtime;

impl Machine<'_> {
    /// Runs the host primitive `name`, or returns `None` when no primitive of
    /// that name exists
    pub(super) fn call_host(
        &mut self,
        name: &str,
        arguments: &[Value],
    ) -> Option<Result<Option<Value>, Interrupt>> {
        let result = match name {
            runtime::PUTCHAR => self.putchar(arguments),
            runtime::PRINTF => self.printf(arguments),
            runtime::MALLOC => argument(arguments, 0)
                .and_then(Value::int)
                .map(|size| Some(Value::Pointer(self.memory.allocate(size.max(0) as usize)))),
            runtime::REALLOC => self.realloc(arguments),
            runtime::FREE => argument(arguments, 0)
                .and_then(Value::pointer)
                .and_then(|address| self.memory.free(address))
                .map(|_| None),
            runtime::EXIT => {
                return Some(match argument(arguments, 0).and_then(Value::int) {
                    Ok(code) => {
                        trace!("program called exit({code})");
                        Err(Interrupt::Exit(code as i32))
                    }
                    Err(error) => Err(error.into()),
                });
            }
            runtime::GETCHAR => {
                let next = self.stdin.get(self.stdin_position).copied();
                self.stdin_position += 1;

                Ok(Some(Value::Int(next.map_or(-1, |c| c as i64))))
            }
            _ => return None,
        };

        Some(result.map_err(Interrupt::from))
    }

    fn realloc(&mut self, arguments: &[Value]) -> Result<Option<Value>, EvaluationError> {
        let address = argument(arguments, 0)?.pointer()?;
        let size = argument(arguments, 1)?.int()?;

        let address = self.memory.reallocate(address, size.max(0) as usize)?;
        Ok(Some(Value::Pointer(address)))
    }

    fn putchar(&mut self, arguments: &[Value]) -> Result<Option<Value>, EvaluationError> {
        let character = argument(arguments, 0)?.int()?;
        self.stdout.push(character as u8);

        Ok(Some(Value::Int(character)))
    }

    /// Supports the conversions the generated code emits: `%d`, `%g`, `%s`
    /// and `%%`
    fn printf(&mut self, arguments: &[Value]) -> Result<Option<Value>, EvaluationError> {
        let format = self.memory.read_c_string(argument(arguments, 0)?.pointer()?)?;
        let mut rest = arguments.iter().skip(1);
        let mut next = || rest.next().ok_or(EvaluationError::MissingArgument);

        let mut output = Vec::new();
        let mut bytes = format.iter();

        while let Some(byte) = bytes.next() {
            if *byte != b'%' {
                output.push(*byte);
                continue;
            }

            match bytes.next() {
                Some(b'd') => output.extend(next()?.int()?.to_string().bytes()),
                Some(b'g') => output.extend(format_general(next()?.float()?).bytes()),
                Some(b's') => {
                    let address = next()?.pointer()?;
                    output.extend(self.memory.read_c_string(address)?);
                }
                Some(b'%') => output.push(b'%'),
                Some(other) => return Err(EvaluationError::UnsupportedFormat(*other as char)),
                None => output.push(b'%'),
            }
        }

        let written = output.len() as i64;
        self.stdout.extend(output);

        Ok(Some(Value::Int(written)))
    }
}

fn argument(arguments: &[Value], index: usize) -> Result<&Value, EvaluationError> {
    arguments.get(index).ok_or(EvaluationError::MissingArgument)
}

const GENERAL_PRECISION: i32 = 6;

/// Formats a float the way C's `%g` does: six significant digits, trailing
/// zeros removed, scientific notation for very large or small magnitudes
pub fn format_general(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_owned();
    }
    if value.is_infinite() {
        return if value < 0.0 { "-inf" } else { "inf" }.to_owned();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_owned();
    }

    let scientific = format!("{:.*e}", (GENERAL_PRECISION - 1) as usize, value);
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let exponent = exponent.parse::<i32>().unwrap_or(0);

    if exponent < -4 || exponent >= GENERAL_PRECISION {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{sign}{:02}",
            strip_trailing_zeros(mantissa),
            exponent.abs()
        )
    } else {
        let decimals = (GENERAL_PRECISION - 1 - exponent) as usize;
        strip_trailing_zeros(&format!("{value:.decimals$}")).to_owned()
    }
}

fn strip_trailing_zeros(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn general_format_matches_c() {
        assert_eq!(format_general(3.0), "3");
        assert_eq!(format_general(1.5), "1.5");
        assert_eq!(format_general(-0.25), "-0.25");
        assert_eq!(format_general(1.0 / 3.0), "0.333333");
        assert_eq!(format_general(123456.0), "123456");
        assert_eq!(format_general(1234567.0), "1.23457e+06");
        assert_eq!(format_general(0.0001), "0.0001");
        assert_eq!(format_general(0.00001), "1e-05");
        assert_eq!(format_general(0.0), "0");
    }
}
