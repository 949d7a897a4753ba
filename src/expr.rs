use crate::error::{CalcError, Result};
use tracing::trace;

#[derive(PartialEq, Eq, PartialOrd, Ord, Debug)]
enum Precedence {
    Lowest,
    Addition,
    Multiplication,
    UnaryNegation,
    Highest,
}

/// A number carries `'\0'` as its operator; everything else is an operator or a bracket.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Token {
    operator: char,
    operands: u8,
    value: f64,
}
impl Token {
    fn number(value: f64) -> Token {
        Token {
            operator: '\0',
            operands: 0,
            value,
        }
    }
    fn operator(operator: char, operands: u8) -> Token {
        Token {
            operator,
            operands,
            value: 0.0,
        }
    }
}

/// Evaluates an infix expression of numbers, `+ - * / %`, unary signs and parentheses.
pub fn evaluate(input: &str) -> Result<f64> {
    let tokens = tokenize(input)?;
    let result = evaluate_tokens(&tokens)?;
    if !result.is_finite() {
        return Err(CalcError::invalid("Result is not a finite number"));
    }
    Ok(result)
}

fn tokenize(input_str: &str) -> Result<Vec<Token>> {
    trace!("Tokenizing: {}", input_str);
    let input = input_str.as_bytes();
    let mut tokens: Vec<Token> = Vec::new();
    let mut index = 0;
    let mut paren_count = 0;

    while index < input.len() {
        if input[index].is_ascii_whitespace() {
            index += 1;
            continue;
        }

        let expect_operand = tokens
            .last()
            .map_or(true, |last| last.operator != '\0' && last.operator != ')');

        match input[index] {
            b'(' => {
                if !expect_operand {
                    return Err(CalcError::invalid("Expected operator!"));
                }
                tokens.push(Token::operator('(', 0));
                paren_count += 1;
                index += 1;
            }
            b')' => {
                if paren_count == 0 {
                    return Err(CalcError::invalid("Mismatched parentheses!"));
                }
                if expect_operand {
                    return Err(CalcError::invalid("Expected number or unary operator!"));
                }
                tokens.push(Token::operator(')', 0));
                paren_count -= 1;
                index += 1;
            }
            b'-' if expect_operand => {
                tokens.push(Token::operator('n', 1)); // 'n' for unary negation
                index += 1;
            }
            // Unary plus changes nothing
            b'+' if expect_operand => index += 1,
            op @ (b'+' | b'-' | b'*' | b'/' | b'%') => {
                if expect_operand {
                    return Err(CalcError::invalid("Expected number or unary operator!"));
                }
                tokens.push(Token::operator(op as char, 2));
                index += 1;
            }
            b'0'..=b'9' | b'.' => {
                if !expect_operand {
                    return Err(CalcError::invalid("Expected operator!"));
                }
                let (value, new_index) = parse_number(input, index)?;
                tokens.push(Token::number(value));
                index = new_index;
            }
            _ => return Err(CalcError::invalid("Invalid input!")),
        }
    }

    if paren_count != 0 {
        return Err(CalcError::invalid("Mismatched parentheses!"));
    }

    let Some(last_token) = tokens.last() else {
        return Err(CalcError::invalid("Empty expression"));
    };
    if last_token.operator != '\0' && last_token.operator != ')' && last_token.operands > 0 {
        return Err(CalcError::invalid("Incomplete expression!"));
    }

    trace!("Tokens: {:?}", tokens);
    Ok(tokens)
}

fn parse_number(input: &[u8], start: usize) -> Result<(f64, usize)> {
    let mut index = start;
    let mut decimals = 0;
    while index < input.len() && (input[index].is_ascii_digit() || input[index] == b'.') {
        if input[index] == b'.' {
            decimals += 1;
            if decimals > 1 {
                return Err(CalcError::invalid("Multiple decimals in number!"));
            }
        }
        index += 1;
    }
    // Only ASCII digits and dots were consumed
    let text = std::str::from_utf8(&input[start..index])
        .map_err(|_| CalcError::invalid("Invalid number!"))?;
    let value = text
        .parse::<f64>()
        .map_err(|_| CalcError::invalid("Invalid number!"))?;
    Ok((value, index))
}

fn evaluate_tokens(tokens: &[Token]) -> Result<f64> {
    let mut output_queue: Vec<f64> = Vec::new();
    let mut operator_stack: Vec<char> = Vec::new();

    for token in tokens {
        if token.operator == '\0' {
            output_queue.push(token.value);
        } else if token.operator == '(' {
            operator_stack.push('(');
        } else if token.operator == ')' {
            while let Some(op) = operator_stack.pop() {
                if op == '(' {
                    break;
                }
                apply_operator(&mut output_queue, op)?;
            }
        } else {
            while let Some(&top_op) = operator_stack.last() {
                if top_op == '(' {
                    break;
                }
                let pops = get_precedence(top_op) > get_precedence(token.operator)
                    || (get_precedence(top_op) == get_precedence(token.operator)
                        && token.operator != 'n');
                if !pops {
                    break;
                }
                operator_stack.pop();
                apply_operator(&mut output_queue, top_op)?;
            }
            operator_stack.push(token.operator);
        }
        trace!("Output queue: {:?}", output_queue);
        trace!("Operator stack: {:?}", operator_stack);
    }

    while let Some(op) = operator_stack.pop() {
        if op == '(' {
            return Err(CalcError::invalid("Mismatched parentheses!"));
        }
        apply_operator(&mut output_queue, op)?;
    }

    match output_queue.as_slice() {
        [result] => Ok(*result),
        _ => Err(CalcError::invalid("Invalid expression!")),
    }
}

fn apply_operator(output_queue: &mut Vec<f64>, op: char) -> Result<()> {
    trace!("Applying operator: {}", op);
    if op == 'n' {
        let operand = output_queue
            .pop()
            .ok_or_else(|| CalcError::invalid("Not enough operands for unary negation"))?;
        output_queue.push(-operand);
        return Ok(());
    }
    let (Some(b), Some(a)) = (output_queue.pop(), output_queue.pop()) else {
        return Err(CalcError::invalid("Not enough operands!"));
    };
    output_queue.push(binary(op, a, b)?);
    Ok(())
}

/// Applies a binary operator to `a op b`. Shared with the RPN evaluator, which adds `^`.
pub(crate) fn binary(op: char, a: f64, b: f64) -> Result<f64> {
    match op {
        '+' => Ok(a + b),
        '-' => Ok(a - b),
        '*' => Ok(a * b),
        '/' | '%' if b == 0.0 => Err(CalcError::DivisionByZero),
        '/' => Ok(a / b),
        '%' => Ok(a % b),
        '^' => Ok(a.powf(b)),
        _ => Err(CalcError::UnsupportedOperator(op.to_string())),
    }
}

fn get_precedence(op: char) -> Precedence {
    match op {
        '+' | '-' => Precedence::Addition,
        '*' | '/' | '%' => Precedence::Multiplication,
        'n' => Precedence::UnaryNegation,
        '(' | ')' => Precedence::Highest,
        _ => Precedence::Lowest,
    }
}

#[cfg(test)]
mod tests {
    use super::evaluate;
    use crate::error::CalcError;

    fn message(input: &str) -> String {
        match evaluate(input) {
            Err(CalcError::InvalidExpression(msg)) => msg,
            other => panic!("expected an invalid expression for {input:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_precedence() {
        assert_eq!(evaluate("1+2*3").unwrap(), 7.0);
        assert_eq!(evaluate("(1+2)*3").unwrap(), 9.0);
        assert_eq!(evaluate("1+2*(3+4)").unwrap(), 15.0);
        assert_eq!(evaluate("((1+2)*3)+4").unwrap(), 13.0);
        assert_eq!(evaluate("10-4-3").unwrap(), 3.0);
        assert_eq!(evaluate("100/10/5").unwrap(), 2.0);
        assert_eq!(evaluate("7%4*2").unwrap(), 6.0);
        assert_eq!(
            evaluate("1/(1+1/(1+1/(1+1/2)))").unwrap(),
            1.0 / (1.0 + 1.0 / (1.0 + 1.0 / 1.5))
        );
    }

    #[test]
    fn test_unary_signs() {
        assert_eq!(evaluate("-3").unwrap(), -3.0);
        assert_eq!(evaluate("--3").unwrap(), 3.0);
        assert_eq!(evaluate("---3").unwrap(), -3.0);
        assert_eq!(evaluate("1-3").unwrap(), -2.0);
        assert_eq!(evaluate("1--3").unwrap(), 4.0);
        assert_eq!(evaluate("1---3").unwrap(), -2.0);
        assert_eq!(evaluate("2*-3").unwrap(), -6.0);
        assert_eq!(evaluate("-2*3").unwrap(), -6.0);
        assert_eq!(evaluate("-(2+3)").unwrap(), -5.0);
        assert_eq!(evaluate("+4").unwrap(), 4.0);
    }

    #[test]
    fn test_remainder_keeps_dividend_sign() {
        assert_eq!(evaluate("7%3").unwrap(), 1.0);
        assert_eq!(evaluate("-7%3").unwrap(), -1.0);
        assert_eq!(evaluate("7.5%2").unwrap(), 1.5);
    }

    #[test]
    fn test_decimals_and_whitespace() {
        assert_eq!(evaluate(" 0.5 + .25 ").unwrap(), 0.75);
        assert_eq!(evaluate("3.").unwrap(), 3.0);
    }

    #[test]
    fn test_division_by_zero() {
        assert!(matches!(evaluate("1/0"), Err(CalcError::DivisionByZero)));
        assert!(matches!(evaluate("1 / (2-2)"), Err(CalcError::DivisionByZero)));
        assert!(matches!(evaluate("5%0"), Err(CalcError::DivisionByZero)));
    }

    #[test]
    fn test_malformed_input() {
        assert_eq!(message(""), "Empty expression");
        assert_eq!(message("(1+2"), "Mismatched parentheses!");
        assert_eq!(message("(1+2))"), "Mismatched parentheses!");
        assert_eq!(message("1*"), "Incomplete expression!");
        assert_eq!(message("-"), "Incomplete expression!");
        assert_eq!(message("*1"), "Expected number or unary operator!");
        assert_eq!(message("1+*2"), "Expected number or unary operator!");
        assert_eq!(message("()"), "Expected number or unary operator!");
        assert_eq!(message("2(3)"), "Expected operator!");
        assert_eq!(message("1 2"), "Expected operator!");
        assert_eq!(message("1.2.3"), "Multiple decimals in number!");
        assert_eq!(message("."), "Invalid number!");
        assert_eq!(message("2^3"), "Invalid input!");
        assert_eq!(message("abc"), "Invalid input!");
    }

    #[test]
    fn test_overflow_is_rejected() {
        let huge = format!("{}*10", f64::MAX);
        assert_eq!(message(&huge), "Result is not a finite number");
    }
}
