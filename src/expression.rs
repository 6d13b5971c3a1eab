use crate::errors::{SimulationError, SimulationResult};
use crate::Complex;
use std::f64::consts::{E, PI};

/// Evaluate a calculator-style amplitude such as `"1/√2"`, `"0.5+0.5j"` or `"sqrt(3)/2 i"`.
///
/// Supported: decimal literals (with exponents), imaginary literals such as `2i` or `0.5j`,
/// the imaginary unit `i` or `j`, the constants `pi` (or `π`) and `e`, `sqrt(x)`, `√x` and
/// `√(x)`, the operators `+ - * /`, powers with `^` or `**`, parentheses, and implicit
/// multiplication of adjacent factors (`3√2`, `2(1+i)`, `2 i`).
///
/// An imaginary literal is a single number, so `1/2i` is `1/(2i) = -0.5i` while `1/2 i`
/// is `0.5i`.
///
/// # Example
/// ```
/// use stern_gerlach::parse_amplitude;
///
/// let a = parse_amplitude("1/√2").unwrap();
/// assert!((a.re - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
///
/// let b = parse_amplitude("0.5+0.5j").unwrap();
/// assert_eq!((b.re, b.im), (0.5, 0.5));
///
/// assert_eq!(parse_amplitude("1/2i").unwrap().im, -0.5);
///
/// assert!(parse_amplitude("import os").is_err());
/// ```
pub fn parse_amplitude(input: &str) -> SimulationResult<Complex<f64>> {
    let mut parser = Parser::new(input);
    let value = parser.parse_expression()?;
    parser.skip_whitespace();
    if let Some(c) = parser.peek() {
        return Err(parser.error(format!("unexpected {:?}", c)));
    }
    if !value.re.is_finite() || !value.im.is_finite() {
        return Err(parser.error("value is not finite".to_string()));
    }
    Ok(value)
}

struct Parser<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, reason: String) -> SimulationError {
        SimulationError::invalid_initial_state(format!(
            "cannot parse amplitude {:?}: {}",
            self.input, reason
        ))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).cloned()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).cloned()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().map_or(false, char::is_whitespace) {
            self.pos += 1;
        }
    }

    /// Consume `c` (after whitespace) if it is next.
    fn eat(&mut self, c: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_power(&mut self) -> bool {
        self.skip_whitespace();
        match (self.peek(), self.peek_at(1)) {
            (Some('^'), _) => {
                self.pos += 1;
                true
            }
            (Some('*'), Some('*')) => {
                self.pos += 2;
                true
            }
            _ => false,
        }
    }

    // expression := term (('+' | '-') term)*
    fn parse_expression(&mut self) -> SimulationResult<Complex<f64>> {
        let mut value = self.parse_term()?;
        loop {
            if self.eat('+') {
                value += self.parse_term()?;
            } else if self.eat('-') {
                value -= self.parse_term()?;
            } else {
                return Ok(value);
            }
        }
    }

    // term := unary (('*' | '/') unary | unary)*
    fn parse_term(&mut self) -> SimulationResult<Complex<f64>> {
        let mut value = self.parse_unary()?;
        loop {
            self.skip_whitespace();
            match (self.peek(), self.peek_at(1)) {
                (Some('*'), Some('*')) => return Ok(value),
                (Some('*'), _) | (Some('×'), _) => {
                    self.pos += 1;
                    value *= self.parse_unary()?;
                }
                (Some('/'), _) | (Some('÷'), _) => {
                    self.pos += 1;
                    value /= self.parse_unary()?;
                }
                (Some(c), _) if starts_factor(c) => {
                    value *= self.parse_power()?;
                }
                _ => return Ok(value),
            }
        }
    }

    // unary := ('-' | '+') unary | power
    fn parse_unary(&mut self) -> SimulationResult<Complex<f64>> {
        if self.eat('-') {
            // Subtract from zero so a negated real keeps a +0 imaginary part for sqrt.
            Ok(Complex::new(0.0, 0.0) - self.parse_unary()?)
        } else if self.eat('+') {
            self.parse_unary()
        } else {
            self.parse_power()
        }
    }

    // power := atom (('^' | '**') unary)?
    fn parse_power(&mut self) -> SimulationResult<Complex<f64>> {
        let base = self.parse_atom()?;
        if self.eat_power() {
            let exponent = self.parse_unary()?;
            Ok(power(base, exponent))
        } else {
            Ok(base)
        }
    }

    fn parse_atom(&mut self) -> SimulationResult<Complex<f64>> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(self.error("unexpected end of input".to_string())),
            Some('(') => {
                self.pos += 1;
                let value = self.parse_expression()?;
                if self.eat(')') {
                    Ok(value)
                } else {
                    Err(self.error("missing closing parenthesis".to_string()))
                }
            }
            Some('√') => {
                self.pos += 1;
                Ok(self.parse_atom()?.sqrt())
            }
            Some('π') => {
                self.pos += 1;
                Ok(Complex::new(PI, 0.0))
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.parse_number(),
            Some(c) if c.is_alphabetic() => self.parse_identifier(),
            Some(c) => Err(self.error(format!("unexpected {:?}", c))),
        }
    }

    fn parse_number(&mut self) -> SimulationResult<Complex<f64>> {
        let start = self.pos;
        while self
            .peek()
            .map_or(false, |c| c.is_ascii_digit() || c == '.')
        {
            self.pos += 1;
        }
        // An exponent needs digits after it, otherwise the `e` is Euler's number.
        if let Some('e') | Some('E') = self.peek() {
            let digits_at = match self.peek_at(1) {
                Some('+') | Some('-') => 2,
                _ => 1,
            };
            if self.peek_at(digits_at).map_or(false, |c| c.is_ascii_digit()) {
                self.pos += digits_at;
                while self.peek().map_or(false, |c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }
        let literal: String = self.chars[start..self.pos].iter().collect();
        let x = literal
            .parse::<f64>()
            .map_err(|_| self.error(format!("bad number {:?}", literal)))?;
        // A unit glued to the digits is part of the literal, so `1/2i` is `1/(2i)`.
        let imaginary = matches!(self.peek(), Some('i' | 'j' | 'I' | 'J'))
            && !self.peek_at(1).map_or(false, char::is_alphabetic);
        if imaginary {
            self.pos += 1;
            Ok(Complex::new(0.0, x))
        } else {
            Ok(Complex::new(x, 0.0))
        }
    }

    fn parse_identifier(&mut self) -> SimulationResult<Complex<f64>> {
        let start = self.pos;
        while self.peek().map_or(false, char::is_alphabetic) {
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        match name.as_str() {
            "i" | "j" | "I" | "J" => Ok(Complex::new(0.0, 1.0)),
            "pi" | "PI" | "Pi" => Ok(Complex::new(PI, 0.0)),
            "e" => Ok(Complex::new(E, 0.0)),
            "sqrt" => {
                if !self.eat('(') {
                    return Err(self.error("sqrt must be followed by '('".to_string()));
                }
                let value = self.parse_expression()?;
                if self.eat(')') {
                    Ok(value.sqrt())
                } else {
                    Err(self.error("missing closing parenthesis".to_string()))
                }
            }
            _ => Err(self.error(format!("unknown name {:?}", name))),
        }
    }
}

fn starts_factor(c: char) -> bool {
    c.is_ascii_digit() || c.is_alphabetic() || c == '(' || c == '.' || c == '√' || c == 'π'
}

fn power(base: Complex<f64>, exponent: Complex<f64>) -> Complex<f64> {
    if exponent.im == 0.0 {
        if base.im == 0.0 && base.re >= 0.0 {
            return Complex::new(base.re.powf(exponent.re), 0.0);
        }
        if exponent.re.fract() == 0.0 && exponent.re.abs() <= i32::MAX as f64 {
            return base.powi(exponent.re as i32);
        }
    }
    base.powc(exponent)
}

#[cfg(test)]
mod expression_tests {
    use super::*;
    use std::f64::consts::FRAC_1_SQRT_2;

    fn close(s: &str, re: f64, im: f64) {
        let c = parse_amplitude(s).unwrap();
        assert!(
            (c.re - re).abs() < 1e-12 && (c.im - im).abs() < 1e-12,
            "{} = {} (expected {}+{}i)",
            s,
            c,
            re,
            im
        );
    }

    #[test]
    fn test_literals() {
        close("1", 1.0, 0.0);
        close("  0.25 ", 0.25, 0.0);
        close(".5", 0.5, 0.0);
        close("2e-1", 0.2, 0.0);
        close("1j", 0.0, 1.0);
        close("-i", 0.0, -1.0);
    }

    #[test]
    fn test_roots() {
        close("1/√2", FRAC_1_SQRT_2, 0.0);
        close("1/√(2)", FRAC_1_SQRT_2, 0.0);
        close("sqrt(2)/2", FRAC_1_SQRT_2, 0.0);
        close("√5", 5.0f64.sqrt(), 0.0);
        close("3√2", 3.0 * 2.0f64.sqrt(), 0.0);
        close("√(-1)", 0.0, 1.0);
    }

    #[test]
    fn test_complex_arithmetic() {
        close("0.5+0.5j", 0.5, 0.5);
        close("(1+i)/√2", FRAC_1_SQRT_2, FRAC_1_SQRT_2);
        close("2(1-i)", 2.0, -2.0);
        close("i*i", -1.0, 0.0);
        close("1/2**0.5", FRAC_1_SQRT_2, 0.0);
        close("2^3", 8.0, 0.0);
        close("2^-1", 0.5, 0.0);
        close("-2^2", -4.0, 0.0);
        close("(-2)^2", 4.0, 0.0);
        close("1 - 2 - 3", -4.0, 0.0);
        close("8/2/2", 2.0, 0.0);
    }

    #[test]
    fn test_imaginary_literals() {
        close("2i", 0.0, 2.0);
        close("0.5j", 0.0, 0.5);
        close("1e-1j", 0.0, 0.1);
        close("1/2i", 0.0, -0.5);
        close("1/2j", 0.0, -0.5);
        close("1/2 i", 0.0, 0.5);
        close("(1/2)i", 0.0, 0.5);
        close("3-4j", 3.0, -4.0);
        close("2i^2", -4.0, 0.0);
        close("2pi", 2.0 * PI, 0.0);
    }

    #[test]
    fn test_constants() {
        close("pi", PI, 0.0);
        close("π/2", PI / 2.0, 0.0);
        close("e", E, 0.0);
        close("2e", 2.0 * E, 0.0);
    }

    #[test]
    fn test_rejects_garbage() {
        for s in ["", "1+", "(1", "foo", "1/0", "__import__('os')", "2 ++", "sqrt 2"] {
            assert!(
                matches!(
                    parse_amplitude(s),
                    Err(SimulationError::InvalidInitialState(_))
                ),
                "{:?} should not parse",
                s
            );
        }
    }
}
