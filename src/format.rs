use colored::*;

type Rgb = (u8, u8, u8);

pub struct Palette {
    pub integer: Rgb,
    pub fraction: Rgb,
    pub exponent: Rgb,
    pub decimal: Rgb,
    pub sign: Rgb,
    pub tilde: Rgb,
    pub colon: Rgb,
    pub error: Rgb,
    pub message: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Palette {
            integer: (0xB4, 0xB4, 0xB4),  // Light gray
            fraction: (0x8C, 0x64, 0x8C), // Muted purple
            exponent: (0xDC, 0xF0, 0x32), // Bright yellow
            decimal: (0xFF, 0xFF, 0xFF),  // White
            sign: (0xFF, 0xFF, 0xFF),     // White
            tilde: (0x50, 0x8C, 0x78),    // Muted teal
            colon: (0x28, 0x50, 0x14),    // Dark green
            error: (0xDC, 0x64, 0x5A),    // Soft red
            message: (0x78, 0xB4, 0x78),  // Soft green
        }
    }
}

pub fn paint(text: &str, colour: Rgb) -> ColoredString {
    text.truecolor(colour.0, colour.1, colour.2)
}

/// Renders `value` with `digits` significant digits.
///
/// Digits are grouped in threes around the decimal point and a `~` marks a rounded
/// value. Magnitudes below 0.1 or with more integer digits than `digits` are shown
/// as a mantissa followed by ` :exponent`.
pub fn render_number(value: f64, digits: usize, palette: &Palette) -> Vec<ColoredString> {
    let mut result = Vec::new();
    if !value.is_finite() {
        result.push(paint("NaN", palette.error));
        return result;
    }

    if value.is_sign_negative() && value != 0.0 {
        result.push(paint("-", palette.sign));
    } else {
        result.push(" ".normal());
    }
    if value == 0.0 {
        result.push(paint("0", palette.integer));
        result.push(paint(".", palette.decimal));
        return result;
    }

    let digits = digits.clamp(1, 17);
    let scientific = format!("{:.*e}", digits - 1, value.abs());
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let decimal_place: isize = exponent.parse().unwrap_or(0);
    let tilde = scientific.parse::<f64>().map_or(true, |shown| shown != value.abs());
    let mantissa: String = mantissa.chars().filter(char::is_ascii_digit).collect();

    if decimal_place < -1 || decimal_place >= digits as isize {
        let (first, rest) = mantissa.split_at(1);
        result.push(paint(first, palette.integer));
        result.push(paint(".", palette.decimal));
        result.push(paint(&group_fraction(rest), palette.fraction));
        if tilde {
            result.push(paint("~", palette.tilde));
        }
        result.push(paint(" :", palette.colon));
        result.push(paint(&decimal_place.to_string(), palette.exponent));
        return result;
    }

    let split = (decimal_place + 1).max(0) as usize;
    let (integer_part, fractional_part) = mantissa.split_at(split);
    if integer_part.is_empty() {
        result.push(paint("0", palette.integer));
    } else {
        result.push(paint(&group_integer(integer_part), palette.integer));
    }
    result.push(paint(".", palette.decimal));
    result.push(paint(&group_fraction(fractional_part), palette.fraction));
    if tilde {
        result.push(paint("~", palette.tilde));
    }
    result
}

fn trim_zeros(number: &str) -> &str {
    number.trim_end_matches('0')
}

fn group_integer(digits: &str) -> String {
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }
    grouped
}

fn group_fraction(digits: &str) -> String {
    let mut grouped = String::new();
    for (i, c) in trim_zeros(digits).chars().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }
    grouped
}

pub fn plain(coloured_vec: &[ColoredString]) -> String {
    let mut result = String::new();
    for coloured_string in coloured_vec {
        result.push_str(coloured_string);
    }
    result.trim_end().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(value: f64) -> String {
        plain(&render_number(value, 12, &Palette::default()))
    }

    #[test]
    fn test_integers() {
        assert_eq!(render(0.0), " 0.");
        assert_eq!(render(9.0), " 9.");
        assert_eq!(render(-2.0), "-2.");
        assert_eq!(render(1024.0), " 1 024.");
        assert_eq!(render(12345.0), " 12 345.");
        assert_eq!(render(-123456789.0), "-123 456 789.");
    }

    #[test]
    fn test_fractions() {
        assert_eq!(render(0.25), " 0.25");
        assert_eq!(render(0.75), " 0.75");
        assert_eq!(render(-1234.5), "-1 234.5");
        assert_eq!(render(1.0 / 3.0), " 0.333 333 333 333~");
        assert_eq!(render(2.0 / 3.0), " 0.666 666 666 667~");
    }

    #[test]
    fn test_exponent_form() {
        assert_eq!(render(0.00001), " 1. :-5");
        assert_eq!(render(0.0625), " 6.25 :-2");
        assert_eq!(render(1e15), " 1. :15");
        assert_eq!(render(12_586_269_025.0), " 12 586 269 025.");
    }

    #[test]
    fn test_digit_setting() {
        let palette = Palette::default();
        assert_eq!(plain(&render_number(1.0 / 3.0, 3, &palette)), " 0.333~");
        assert_eq!(plain(&render_number(1234.0, 3, &palette)), " 1.23~ :3");
        assert_eq!(plain(&render_number(f64::NAN, 3, &palette)), "NaN");
    }
}
