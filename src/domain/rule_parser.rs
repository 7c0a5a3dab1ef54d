//! Rule text parser.
//!
//! Recursive descent over the infix grammar
//! `rule := operand comparator operand`, with comparators `above`, `below`,
//! `crosses_above`, `crosses_below`. Operands are price fields, numbers, or
//! indicator calls (`sma(20)`, `macd_line(12,26,9)`, `bb_upper(20,2.0)`).
//! Rule lists are separated by semicolons.

use std::fmt;

use crate::domain::indicator::IndicatorType;
use crate::domain::rule::{Comparator, IndicatorField, IndicatorRef, Operand, Rule};

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the failing position.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!("{input}\n{caret}\n{self}")
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at position {}", self.message, self.position)
    }
}

impl std::error::Error for ParseError {}

pub fn parse(input: &str) -> Result<Rule, ParseError> {
    let mut parser = Parser::new(input);
    let rule = parser.parse_rule()?;
    parser.skip_whitespace();
    if parser.peek().is_some() {
        return Err(ParseError {
            message: format!("unexpected trailing input '{}'", parser.peek_word()),
            position: parser.pos,
        });
    }
    Ok(rule)
}

/// Parse a semicolon-separated rule list; empty segments are rejected.
pub fn parse_list(input: &str) -> Result<Vec<Rule>, ParseError> {
    let mut rules = Vec::new();
    let mut offset = 0;
    for segment in input.split(';') {
        if segment.trim().is_empty() {
            return Err(ParseError {
                message: "empty rule in list".to_string(),
                position: offset,
            });
        }
        let rule = parse(segment).map_err(|e| ParseError {
            message: e.message,
            position: offset + e.position,
        })?;
        rules.push(rule);
        offset += segment.len() + 1;
    }
    Ok(rules)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(ParseError {
                message: format!("expected '{}', found '{}'", expected, ch),
                position: self.pos,
            }),
            None => Err(ParseError {
                message: format!("expected '{}', found end of input", expected),
                position: self.pos,
            }),
        }
    }

    fn peek_word(&self) -> String {
        let mut word = String::new();
        for ch in self.remaining().chars() {
            if ch.is_alphanumeric() || ch == '_' {
                word.push(ch);
            } else {
                break;
            }
        }
        if word.is_empty() {
            self.peek()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "end of input".to_string())
        } else {
            word
        }
    }

    fn take_word(&mut self) -> String {
        self.skip_whitespace();
        let word = self.peek_word();
        // peek_word falls back to the next punctuation char or "end of
        // input"; only genuine identifiers are consumed.
        if self.remaining().starts_with(&word)
            && word.chars().all(|c| c.is_alphanumeric() || c == '_')
        {
            self.pos += word.len();
        }
        word
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        if self.peek() == Some('-') {
            self.advance();
        }
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }
        if digits == 0 {
            return Err(ParseError {
                message: "expected number".to_string(),
                position: start,
            });
        }
        let num_str = &self.input[start..self.pos];
        num_str.parse::<f64>().map_err(|_| ParseError {
            message: format!("invalid number: {}", num_str),
            position: start,
        })
    }

    fn parse_integer(&mut self) -> Result<usize, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut digits = 0;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else {
                break;
            }
        }
        if digits == 0 {
            return Err(ParseError {
                message: "expected integer".to_string(),
                position: start,
            });
        }
        let num_str = &self.input[start..self.pos];
        num_str.parse::<usize>().map_err(|_| ParseError {
            message: format!("invalid integer: {}", num_str),
            position: start,
        })
    }

    fn parse_int_args<const N: usize>(&mut self) -> Result<[usize; N], ParseError> {
        self.expect_char('(')?;
        let mut args = [0usize; N];
        for (i, slot) in args.iter_mut().enumerate() {
            if i > 0 {
                self.expect_char(',')?;
            }
            *slot = self.parse_integer()?;
        }
        self.expect_char(')')?;
        Ok(args)
    }

    fn parse_bollinger(&mut self, field: IndicatorField) -> Result<Operand, ParseError> {
        self.expect_char('(')?;
        let period = self.parse_integer()?;
        self.expect_char(',')?;
        let mult = self.parse_number()?;
        self.expect_char(')')?;
        Ok(Operand::Indicator(IndicatorRef {
            indicator_type: IndicatorType::Bollinger {
                period,
                stddev_mult_x100: (mult * 100.0).round() as u32,
            },
            field,
        }))
    }

    fn parse_operand(&mut self) -> Result<Operand, ParseError> {
        self.skip_whitespace();

        if self
            .peek()
            .is_some_and(|ch| ch.is_ascii_digit() || ch == '-' || ch == '.')
        {
            return Ok(Operand::Constant(self.parse_number()?));
        }

        let word_start = self.pos;
        let word = self.take_word();
        match word.as_str() {
            "open" => return Ok(Operand::Open),
            "high" => return Ok(Operand::High),
            "low" => return Ok(Operand::Low),
            "close" => return Ok(Operand::Close),
            "volume" => return Ok(Operand::Volume),
            "obv" => {
                return Ok(Operand::Indicator(IndicatorRef::value(IndicatorType::Obv)));
            }
            _ => {}
        }

        let simple = |t: IndicatorType| Operand::Indicator(IndicatorRef::value(t));
        match word.as_str() {
            "sma" => {
                let [p] = self.parse_int_args()?;
                Ok(simple(IndicatorType::Sma(p)))
            }
            "ema" => {
                let [p] = self.parse_int_args()?;
                Ok(simple(IndicatorType::Ema(p)))
            }
            "wma" => {
                let [p] = self.parse_int_args()?;
                Ok(simple(IndicatorType::Wma(p)))
            }
            "rsi" => {
                let [p] = self.parse_int_args()?;
                Ok(simple(IndicatorType::Rsi(p)))
            }
            "roc" => {
                let [p] = self.parse_int_args()?;
                Ok(simple(IndicatorType::Roc(p)))
            }
            "atr" => {
                let [p] = self.parse_int_args()?;
                Ok(simple(IndicatorType::Atr(p)))
            }
            "mfi" => {
                let [p] = self.parse_int_args()?;
                Ok(simple(IndicatorType::Mfi(p)))
            }
            "macd_line" | "macd_signal" | "macd_histogram" => {
                let [fast, slow, signal] = self.parse_int_args()?;
                let field = match word.as_str() {
                    "macd_line" => IndicatorField::MacdLine,
                    "macd_signal" => IndicatorField::MacdSignal,
                    _ => IndicatorField::MacdHistogram,
                };
                Ok(Operand::Indicator(IndicatorRef {
                    indicator_type: IndicatorType::Macd { fast, slow, signal },
                    field,
                }))
            }
            "stoch_k" | "stoch_d" => {
                let [k_period, d_period] = self.parse_int_args()?;
                let field = if word == "stoch_k" {
                    IndicatorField::StochasticK
                } else {
                    IndicatorField::StochasticD
                };
                Ok(Operand::Indicator(IndicatorRef {
                    indicator_type: IndicatorType::Stochastic { k_period, d_period },
                    field,
                }))
            }
            "bb_upper" => self.parse_bollinger(IndicatorField::BollingerUpper),
            "bb_middle" => self.parse_bollinger(IndicatorField::BollingerMiddle),
            "bb_lower" => self.parse_bollinger(IndicatorField::BollingerLower),
            _ => Err(ParseError {
                message: format!("expected operand, found '{}'", word),
                position: word_start,
            }),
        }
    }

    fn parse_comparator(&mut self) -> Result<Comparator, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let word = self.take_word();
        match word.as_str() {
            "above" => Ok(Comparator::Above),
            "below" => Ok(Comparator::Below),
            "crosses_above" => Ok(Comparator::CrossesAbove),
            "crosses_below" => Ok(Comparator::CrossesBelow),
            _ => Err(ParseError {
                message: format!(
                    "expected comparator (above, below, crosses_above, crosses_below), found '{}'",
                    word
                ),
                position: start,
            }),
        }
    }

    fn parse_rule(&mut self) -> Result<Rule, ParseError> {
        let left = self.parse_operand()?;
        let comparator = self.parse_comparator()?;
        let right = self.parse_operand()?;
        Ok(Rule {
            left,
            comparator,
            right,
        })
    }
}
